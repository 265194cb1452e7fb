//! Immutable, hashable dice rolls.
//!
//! A [`DiceRoll`] is the unordered outcome of rolling indistinguishable fair
//! dice with a fixed number of sides, backed by a [`Multiset`] of 0-based
//! face indices. Rolls are value types: every derivation (`reroll`,
//! `add_one`, the `select_*` family) returns a new roll, and the hash is
//! computed once at construction so rolls can serve as map keys in the
//! solver's per-component tables.

use std::fmt;
use std::hash::{Hash, Hasher};

use rand::Rng;
use rustc_hash::FxHasher;

use crate::error::RangeError;
use crate::multiset::Multiset;

/// An unordered roll of zero or more dice with `sides` faces each.
#[derive(Debug, Clone)]
pub struct DiceRoll {
    dice: Multiset,
    sides: i32,
    hash: u64,
}

fn roll_hash(sides: i32, dice: &Multiset) -> u64 {
    let mut h = FxHasher::default();
    sides.hash(&mut h);
    for face0 in 0..sides {
        dice.count(face0).hash(&mut h);
    }
    h.finish()
}

impl DiceRoll {
    fn from_multiset(dice: Multiset, sides: i32) -> Self {
        let hash = roll_hash(sides, &dice);
        DiceRoll { dice, sides, hash }
    }

    /// Creates a roll showing the given 1-indexed pips.
    pub fn new(pips: &[i32], sides: i32) -> Result<Self, RangeError> {
        if sides < 1 {
            return Err(RangeError::Sides(sides));
        }
        let mut dice = Multiset::new(sides as usize)?;
        for &pip in pips {
            if pip < 1 || pip > sides {
                return Err(RangeError::Face { face: pip, sides });
            }
            dice.add(pip - 1)?;
        }
        Ok(Self::from_multiset(dice, sides))
    }

    /// Creates a uniformly random roll of `count` dice.
    pub fn roll<R: Rng + ?Sized>(count: u32, sides: i32, rng: &mut R) -> Result<Self, RangeError> {
        if sides < 1 {
            return Err(RangeError::Sides(sides));
        }
        let mut dice = Multiset::new(sides as usize)?;
        dice.add_random(count, rng);
        Ok(Self::from_multiset(dice, sides))
    }

    /// Decodes a string of digits, one die per digit, each in `1..=sides`.
    pub fn parse(text: &str, sides: i32) -> Result<Self, RangeError> {
        if sides < 1 {
            return Err(RangeError::Sides(sides));
        }
        let mut pips = Vec::with_capacity(text.len());
        for ch in text.chars() {
            let digit = ch.to_digit(10).ok_or_else(|| RangeError::RollDigit {
                digit: ch,
                text: text.to_string(),
                sides,
            })? as i32;
            if digit < 1 || digit > sides {
                return Err(RangeError::RollDigit {
                    digit: ch,
                    text: text.to_string(),
                    sides,
                });
            }
            pips.push(digit);
        }
        Self::new(&pips, sides)
    }

    /// Number of dice in this roll.
    pub fn size(&self) -> u32 {
        self.dice.size()
    }

    /// Number of faces on each die.
    pub fn sides(&self) -> i32 {
        self.sides
    }

    /// How many dice show the given face. 0 for out-of-range faces.
    pub fn count(&self, face: i32) -> u32 {
        self.dice.count(face - 1)
    }

    /// Sum of the pips showing. Faces are 1-indexed, so this is the
    /// multiset total plus one per die.
    pub fn total(&self) -> i32 {
        (self.dice.total() + self.dice.size()) as i32
    }

    /// Smallest face showing, or `sides + 1` when empty.
    pub fn min_face(&self) -> i32 {
        self.dice.min_value() + 1
    }

    /// Largest face showing, or 0 when empty.
    pub fn max_face(&self) -> i32 {
        self.dice.max_value() + 1
    }

    /// True iff some face appears at least `n` times.
    pub fn is_n_kind(&self, n: u32) -> bool {
        (1..=self.sides).any(|face| self.count(face) >= n)
    }

    /// A new roll with the same dice plus enough uniformly random dice to
    /// reach `target_size` total.
    pub fn reroll<R: Rng + ?Sized>(
        &self,
        target_size: u32,
        rng: &mut R,
    ) -> Result<Self, RangeError> {
        if target_size < self.size() {
            return Err(RangeError::RerollTarget {
                target: target_size,
                current: self.size(),
            });
        }
        let mut dice = self.dice.clone();
        dice.add_random(target_size - self.size(), rng);
        Ok(Self::from_multiset(dice, self.sides))
    }

    /// A new roll with one extra die showing `face`.
    pub fn add_one(&self, face: i32) -> Result<Self, RangeError> {
        if face < 1 || face > self.sides {
            return Err(RangeError::Face {
                face,
                sides: self.sides,
            });
        }
        let mut dice = self.dice.clone();
        dice.add(face - 1)?;
        Ok(Self::from_multiset(dice, self.sides))
    }

    /// True iff this roll's dice are a sub-selection of `other`'s: same
    /// number of sides and per-face counts dominated element-wise.
    pub fn is_subroll_of(&self, other: &DiceRoll) -> bool {
        self.sides == other.sides && self.dice.is_subset_of(&other.dice)
    }

    /// The subroll keeping every die showing any of `faces`, up to
    /// `max_per_face` of each when given.
    pub fn select_all(&self, faces: &[i32], max_per_face: Option<u32>) -> Result<Self, RangeError> {
        let mut dice = Multiset::new(self.sides as usize)?;
        for &face in faces {
            if face < 1 || face > self.sides {
                return Err(RangeError::Face {
                    face,
                    sides: self.sides,
                });
            }
            let keep = match max_per_face {
                Some(cap) => self.count(face).min(cap),
                None => self.count(face),
            };
            dice.add_many(face - 1, keep)?;
        }
        Ok(Self::from_multiset(dice, self.sides))
    }

    /// The subroll keeping at most one die per given face.
    pub fn select_one(&self, faces: &[i32]) -> Result<Self, RangeError> {
        let mut dice = Multiset::new(self.sides as usize)?;
        for &face in faces {
            if face < 1 || face > self.sides {
                return Err(RangeError::Face {
                    face,
                    sides: self.sides,
                });
            }
            if self.count(face) > 0 {
                dice.add(face - 1)?;
            }
        }
        Ok(Self::from_multiset(dice, self.sides))
    }

    /// All maximal consecutive runs of the longest length found.
    ///
    /// Scans faces `1..=sides` once. A run that strictly beats the best
    /// length replaces the result set; a run that ties it is appended.
    /// `[1, 2, 4, 4, 5]` on 6 sides yields `[[1, 2], [4, 5]]`.
    pub fn longest_runs(&self) -> Vec<Vec<i32>> {
        let mut runs: Vec<Vec<i32>> = Vec::new();
        let mut longest = 0;
        let mut current = 0;
        for face in 1..=self.sides {
            if self.count(face) > 0 {
                current += 1;
                let run: Vec<i32> = (face - current + 1..=face).collect();
                if current == longest {
                    runs.push(run);
                } else if current > longest {
                    runs = vec![run];
                    longest = current;
                }
            } else {
                current = 0;
            }
        }
        runs
    }

    /// Every subroll of this roll: the number of kept dice per face ranges
    /// over `0..=count(face)`, and the result is the Cartesian product of
    /// those ranges, so `Π (count(face) + 1)` rolls come back.
    pub fn all_subrolls(&self) -> Vec<DiceRoll> {
        let counts: Vec<u32> = (1..=self.sides).map(|face| self.count(face)).collect();
        let mut kept = vec![0u32; counts.len()];
        let mut result = Vec::new();
        loop {
            let mut dice = match Multiset::new(self.sides as usize) {
                Ok(m) => m,
                Err(_) => unreachable!("sides validated at construction"),
            };
            for (face0, &k) in kept.iter().enumerate() {
                // counts validated against this roll, add cannot fail
                let _ = dice.add_many(face0 as i32, k);
            }
            result.push(Self::from_multiset(dice, self.sides));

            // odometer over the per-face kept counts
            let mut pos = 0;
            loop {
                if pos == kept.len() {
                    return result;
                }
                if kept[pos] < counts[pos] {
                    kept[pos] += 1;
                    break;
                }
                kept[pos] = 0;
                pos += 1;
            }
        }
    }

    /// The faces showing, ascending.
    pub fn to_sorted_vec(&self) -> Vec<i32> {
        self.dice.to_sorted_vec().iter().map(|&v| v + 1).collect()
    }
}

impl PartialEq for DiceRoll {
    fn eq(&self, other: &Self) -> bool {
        self.sides == other.sides && self.dice == other.dice
    }
}

impl Eq for DiceRoll {}

impl Hash for DiceRoll {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

/// One digit per die, ascending: the roll text format.
impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for face in self.to_sorted_vec() {
            write!(f, "{}", face)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn r(text: &str) -> DiceRoll {
        DiceRoll::parse(text, 6).unwrap()
    }

    #[test]
    fn construction_validates_faces() {
        assert!(DiceRoll::new(&[1, 6], 6).is_ok());
        assert!(DiceRoll::new(&[0], 6).is_err());
        assert!(DiceRoll::new(&[7], 6).is_err());
        assert!(DiceRoll::new(&[1], 0).is_err());
    }

    #[test]
    fn parse_round_trip() {
        let roll = r("41154");
        assert_eq!(roll.to_string(), "11445");
        assert!(DiceRoll::parse("1x2", 6).is_err());
        assert!(DiceRoll::parse("17", 6).is_err());
        assert!(DiceRoll::parse("4", 3).is_err());
        assert_eq!(DiceRoll::parse("", 6).unwrap().size(), 0);
    }

    #[test]
    fn queries() {
        let roll = r("11445");
        assert_eq!(roll.size(), 5);
        assert_eq!(roll.count(1), 2);
        assert_eq!(roll.count(4), 2);
        assert_eq!(roll.count(9), 0);
        assert_eq!(roll.total(), 15);
        assert_eq!(roll.min_face(), 1);
        assert_eq!(roll.max_face(), 5);
        assert!(roll.is_n_kind(2));
        assert!(!roll.is_n_kind(3));
    }

    #[test]
    fn empty_roll_sentinels() {
        let empty = r("");
        assert_eq!(empty.min_face(), 7);
        assert_eq!(empty.max_face(), 0);
        assert_eq!(empty.total(), 0);
        assert_eq!(empty.longest_runs(), Vec::<Vec<i32>>::new());
    }

    #[test]
    fn reroll_preserves_kept_dice() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let kept = r("66");
        let full = kept.reroll(5, &mut rng).unwrap();
        assert_eq!(full.size(), 5);
        assert!(full.count(6) >= 2);
        assert!(kept.is_subroll_of(&full));
        assert!(full.reroll(4, &mut rng).is_err());
    }

    #[test]
    fn add_one() {
        let roll = r("123").add_one(3).unwrap();
        assert_eq!(roll.count(3), 2);
        assert_eq!(roll.size(), 4);
        assert!(roll.add_one(0).is_err());
        assert!(roll.add_one(7).is_err());
    }

    #[test]
    fn select_all_and_one() {
        let roll = r("11445");
        assert_eq!(roll.select_all(&[], None).unwrap().size(), 0);
        assert_eq!(
            roll.select_all(&[1, 2, 3, 4, 5, 6], None).unwrap(),
            roll,
            "selecting every face recovers the roll"
        );
        assert_eq!(roll.select_all(&[1, 4], Some(1)).unwrap(), r("14"));
        assert_eq!(roll.select_one(&[1, 4, 6]).unwrap(), r("14"));
        assert!(roll.select_all(&[0], None).is_err());
        assert!(roll.select_one(&[7]).is_err());
    }

    #[test]
    fn longest_runs_ties() {
        assert_eq!(r("12445").longest_runs(), vec![vec![1, 2], vec![4, 5]]);
        assert_eq!(r("12345").longest_runs(), vec![vec![1, 2, 3, 4, 5]]);
        assert_eq!(r("66").longest_runs(), vec![vec![6]]);
        assert_eq!(r("1356").longest_runs(), vec![vec![5, 6]]);
    }

    #[test]
    fn subroll_enumeration_count() {
        let roll = r("11223");
        // (2+1) * (2+1) * (1+1) = 18
        let subs = roll.all_subrolls();
        assert_eq!(subs.len(), 18);
        for sub in &subs {
            assert!(sub.is_subroll_of(&roll));
        }
        // the full roll and the empty roll are both present
        assert!(subs.contains(&roll));
        assert!(subs.contains(&r("")));
    }

    #[test]
    fn equality_and_hash_agree() {
        use std::collections::hash_map::DefaultHasher;
        let a = r("15234");
        let b = r("43215");
        assert_eq!(a, b);
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());

        let c = DiceRoll::new(&[1, 2], 4).unwrap();
        let d = DiceRoll::new(&[1, 2], 6).unwrap();
        assert_ne!(c, d, "sides participate in equality");
    }

    #[test]
    fn subroll_relation_is_ordered() {
        let a = r("14");
        let b = r("11445");
        assert!(a.is_subroll_of(&b));
        assert!(!b.is_subroll_of(&a));
        assert!(a.is_subroll_of(&a));
    }
}
