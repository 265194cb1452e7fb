//! Bounded multiset over `{0..n-1}` with per-value counts.
//!
//! The backing store for [`crate::roll::DiceRoll`]: a frequency vector plus a
//! running size and observed min/max. When empty, min reports the capacity
//! and max reports -1, so both sentinels sit just outside the legal range.

use rand::Rng;

use crate::error::RangeError;

/// A multiset of values drawn from `{0..n-1}` for a fixed capacity `n`.
#[derive(Debug, Clone)]
pub struct Multiset {
    freq: Vec<u32>,
    size: u32,
    min: i32,
    max: i32,
}

impl Multiset {
    /// Creates an empty multiset with values in `[0, n)`.
    pub fn new(n: usize) -> Result<Self, RangeError> {
        if n == 0 {
            return Err(RangeError::Capacity(n));
        }
        Ok(Multiset {
            freq: vec![0; n],
            size: 0,
            min: n as i32,
            max: -1,
        })
    }

    /// The maximum number of distinct values this multiset can hold.
    pub fn capacity(&self) -> usize {
        self.freq.len()
    }

    /// Adds one occurrence of `value`.
    pub fn add(&mut self, value: i32) -> Result<(), RangeError> {
        if value < 0 || value as usize >= self.freq.len() {
            return Err(RangeError::Element {
                value,
                capacity: self.freq.len(),
            });
        }
        self.freq[value as usize] += 1;
        self.size += 1;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
        Ok(())
    }

    /// Adds `count` occurrences of `value`.
    pub fn add_many(&mut self, value: i32, count: u32) -> Result<(), RangeError> {
        if value < 0 || value as usize >= self.freq.len() {
            return Err(RangeError::Element {
                value,
                capacity: self.freq.len(),
            });
        }
        if count > 0 {
            // one via add to update min/max, then the rest in bulk
            self.add(value)?;
            self.freq[value as usize] += count - 1;
            self.size += count - 1;
        }
        Ok(())
    }

    /// Adds `count` independent uniform draws from `[0, capacity)`.
    pub fn add_random<R: Rng + ?Sized>(&mut self, count: u32, rng: &mut R) {
        let n = self.freq.len() as i32;
        for _ in 0..count {
            let value = rng.gen_range(0..n);
            // in range by construction
            let _ = self.add(value);
        }
    }

    /// Occurrences of `value`; 0 for out-of-range values.
    pub fn count(&self, value: i32) -> u32 {
        if value < 0 || value as usize >= self.freq.len() {
            0
        } else {
            self.freq[value as usize]
        }
    }

    /// Total number of elements.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Smallest element, or the capacity when empty.
    pub fn min_value(&self) -> i32 {
        self.min
    }

    /// Largest element, or -1 when empty.
    pub fn max_value(&self) -> i32 {
        self.max
    }

    /// True iff every value's count here is at most its count in `other`.
    /// Element-wise domination; the declared capacities are irrelevant.
    pub fn is_subset_of(&self, other: &Multiset) -> bool {
        self.freq
            .iter()
            .enumerate()
            .all(|(value, &count)| count <= other.count(value as i32))
    }

    /// Sum of value times count over all values.
    pub fn total(&self) -> u32 {
        self.freq
            .iter()
            .enumerate()
            .map(|(value, &count)| value as u32 * count)
            .sum()
    }

    /// Elements in ascending order, with repetition.
    pub fn to_sorted_vec(&self) -> Vec<i32> {
        let mut out = Vec::with_capacity(self.size as usize);
        for (value, &count) in self.freq.iter().enumerate() {
            for _ in 0..count {
                out.push(value as i32);
            }
        }
        out
    }
}

/// Equal iff the same elements with the same counts; capacity is irrelevant.
impl PartialEq for Multiset {
    fn eq(&self, other: &Self) -> bool {
        if self.size != other.size {
            return false;
        }
        let wider = self.freq.len().max(other.freq.len());
        (0..wider as i32).all(|v| self.count(v) == other.count(v))
    }
}

impl Eq for Multiset {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn empty_sentinels() {
        let m = Multiset::new(6).unwrap();
        assert_eq!(m.size(), 0);
        assert_eq!(m.min_value(), 6);
        assert_eq!(m.max_value(), -1);
        assert_eq!(m.count(0), 0);
        assert_eq!(m.count(-3), 0);
        assert_eq!(m.count(99), 0);
    }

    #[test]
    fn zero_capacity_rejected() {
        assert_eq!(Multiset::new(0), Err(RangeError::Capacity(0)));
    }

    #[test]
    fn add_tracks_counts_and_extremes() {
        let mut m = Multiset::new(6).unwrap();
        m.add(3).unwrap();
        m.add(3).unwrap();
        m.add(1).unwrap();
        assert_eq!(m.size(), 3);
        assert_eq!(m.count(3), 2);
        assert_eq!(m.min_value(), 1);
        assert_eq!(m.max_value(), 3);
        assert!(m.add(6).is_err());
        assert!(m.add(-1).is_err());
    }

    #[test]
    fn add_many() {
        let mut m = Multiset::new(4).unwrap();
        m.add_many(2, 3).unwrap();
        m.add_many(0, 0).unwrap();
        assert_eq!(m.size(), 3);
        assert_eq!(m.count(2), 3);
        // count 0 must not disturb min/max
        assert_eq!(m.min_value(), 2);
        assert_eq!(m.max_value(), 2);
        assert!(m.add_many(4, 1).is_err());
    }

    #[test]
    fn add_random_stays_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut m = Multiset::new(3).unwrap();
        m.add_random(100, &mut rng);
        assert_eq!(m.size(), 100);
        assert_eq!(m.count(0) + m.count(1) + m.count(2), 100);
        assert!(m.min_value() >= 0);
        assert!(m.max_value() <= 2);
    }

    #[test]
    fn subset_ignores_capacity() {
        let mut a = Multiset::new(3).unwrap();
        let mut b = Multiset::new(6).unwrap();
        a.add(1).unwrap();
        b.add(1).unwrap();
        b.add(1).unwrap();
        b.add(2).unwrap();
        assert!(a.is_subset_of(&b));
        assert!(!b.is_subset_of(&a));
        assert!(a.is_subset_of(&a));
    }

    #[test]
    fn total_and_sorted_list() {
        let mut m = Multiset::new(5).unwrap();
        m.add(4).unwrap();
        m.add(0).unwrap();
        m.add(4).unwrap();
        assert_eq!(m.total(), 8);
        assert_eq!(m.to_sorted_vec(), vec![0, 4, 4]);
    }

    #[test]
    fn equality_across_capacities() {
        let mut a = Multiset::new(3).unwrap();
        let mut b = Multiset::new(6).unwrap();
        a.add(2).unwrap();
        b.add(2).unwrap();
        assert_eq!(a, b);
        b.add(5).unwrap();
        assert_ne!(a, b);
    }
}
