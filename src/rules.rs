//! Rule sets: scoring categories, anchors, and the finite state space.
//!
//! A [`YahtzeeRules`] turns a list of [`Category`] definitions plus numeric
//! [`RuleParams`] into everything the solver needs: a pure scoring/transition
//! function ([`YahtzeeRules::apply`]), the compressed turn-boundary state
//! ([`Anchor`]) with its dense integer index, and precomputed catalogs of all
//! complete and partial rolls together with the subroll relation.
//!
//! Categories are a closed set of scoring kinds with numeric parameters
//! rather than opaque functions; the cross-cutting behaviors (upper-bonus
//! tracking, joker substitution, Yahtzee-bonus awards, used-mask and
//! Yahtzee-flag advancement) are composed around the base kind inside
//! `apply`, in a fixed order.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::{Error, RangeError, StateError};
use crate::roll::DiceRoll;

/// How the Yahtzee category has been used so far.
///
/// The distinction between [`Zero`](YahtzeeFlag::Zero) and
/// [`Nonzero`](YahtzeeFlag::Nonzero) matters twice: only a nonzero Yahtzee
/// earns the repeat bonus, and both enable joker substitution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum YahtzeeFlag {
    Unused = 0,
    Zero = 1,
    Nonzero = 2,
}

impl YahtzeeFlag {
    pub const COUNT: usize = 3;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(YahtzeeFlag::Unused),
            1 => Some(YahtzeeFlag::Zero),
            2 => Some(YahtzeeFlag::Nonzero),
            _ => None,
        }
    }
}

/// Compressed turn-boundary state: an equivalence class of scoresheets with
/// the same optimal future strategy.
///
/// `used` has one bit per non-Yahtzee category; the Yahtzee category is
/// tracked by the flag. `upper_total` is capped at the rule set's bonus
/// threshold. Anchors are never mutated in place: [`YahtzeeRules::apply`]
/// returns the successor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Anchor {
    pub yahtzee: YahtzeeFlag,
    pub upper_total: i32,
    pub used: u32,
}

impl Anchor {
    /// The start-of-game anchor: nothing used, zero upper total.
    pub const START: Anchor = Anchor {
        yahtzee: YahtzeeFlag::Unused,
        upper_total: 0,
        used: 0,
    };
}

/// How a conditional category values a qualifying roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Valuation {
    /// Sum of all pips showing.
    TotalPips,
    /// A fixed point award.
    Fixed(i32),
}

impl Valuation {
    fn eval(self, roll: &DiceRoll) -> i32 {
        match self {
            Valuation::TotalPips => roll.total(),
            Valuation::Fixed(value) => value,
        }
    }
}

/// The closed set of base scoring kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoringKind {
    /// `face × count(face)`, feeding the upper-section total.
    Upper { face: i32 },
    /// `valuation(roll)` iff some face appears at least `min_count` times.
    NOfAKind { min_count: u32, valuation: Valuation },
    /// `value` iff a run of `length` consecutive faces is fully present.
    Straight { length: u32, value: i32 },
    /// `value` iff the roll is a full house.
    FullHouse { value: i32 },
    /// `value` iff all dice show the same face. Scoring this category sets
    /// the Yahtzee flag instead of a used bit; a rule set has exactly one,
    /// in the last position.
    FiveOfAKind { value: i32 },
}

/// Whether a second-or-later five-of-a-kind may be scored in this category
/// at a fixed value (the joker rule).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JokerRule {
    Allowed { value: i32 },
    Disallowed,
}

/// One scoring category: a short abbreviation (used in the anchor text
/// format), a base kind, and its joker treatment.
#[derive(Clone, Copy, Debug)]
pub struct Category {
    pub name: &'static str,
    pub kind: ScoringKind,
    pub joker: JokerRule,
}

impl Category {
    pub fn upper(name: &'static str, face: i32) -> Self {
        Category {
            name,
            kind: ScoringKind::Upper { face },
            joker: JokerRule::Disallowed,
        }
    }
}

/// Numeric parameters shared by the whole rule set.
#[derive(Clone, Copy, Debug)]
pub struct RuleParams {
    /// Dice rolled each turn.
    pub dice_count: u32,
    /// Faces per die (at most 9, so one digit encodes one die).
    pub sides: i32,
    /// Rerolls available after the initial roll of a turn.
    pub rerolls: u32,
    /// Upper-section total at which the one-time bonus is awarded; the
    /// anchor's running total is capped here.
    pub bonus_threshold: i32,
    /// The one-time upper bonus.
    pub bonus_value: i32,
    /// Award for each extra five-of-a-kind after a nonzero Yahtzee.
    pub yahtzee_bonus: i32,
}

/// Points awarded by scoring one roll, broken out by scoresheet slot.
///
/// Besides the scored category's own slot this can include the upper-bonus
/// slot and the Yahtzee-bonus slot, so at most three entries.
#[derive(Clone, Debug, Default)]
pub struct TurnScore {
    awards: SmallVec<[(usize, i32); 3]>,
}

impl TurnScore {
    fn add(&mut self, slot: usize, points: i32) {
        self.awards.push((slot, points));
    }

    /// Points awarded to the given slot this turn.
    pub fn get(&self, slot: usize) -> i32 {
        self.awards
            .iter()
            .filter(|(s, _)| *s == slot)
            .map(|(_, p)| p)
            .sum()
    }

    /// All (slot, points) awards.
    pub fn awards(&self) -> &[(usize, i32)] {
        &self.awards
    }

    /// Total points across all slots.
    pub fn total(&self) -> i32 {
        self.awards.iter().map(|(_, p)| p).sum()
    }
}

/// True iff every die shows the same face (and there is at least one die).
pub fn is_yahtzee(roll: &DiceRoll) -> bool {
    roll.size() > 0 && roll.count(roll.min_face()) == roll.size()
}

/// True iff `length` consecutive faces are all present.
pub fn is_straight(roll: &DiceRoll, length: u32) -> bool {
    if length <= 1 {
        return roll.size() >= length;
    }
    let mut run = 0;
    for face in 1..=roll.sides() {
        if roll.count(face) > 0 {
            run += 1;
            if run >= length {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

/// True iff exactly two distinct faces are present and each appears at
/// least twice. For five dice this matches the classic 3+2 shape; for other
/// dice counts it is the two-group decomposition covering the whole roll.
pub fn is_full_house(roll: &DiceRoll) -> bool {
    let mut groups = 0;
    for face in 1..=roll.sides() {
        let count = roll.count(face);
        if count == 1 {
            return false;
        }
        if count >= 2 {
            groups += 1;
        }
    }
    groups == 2
}

fn base_score(kind: ScoringKind, roll: &DiceRoll) -> i32 {
    match kind {
        ScoringKind::Upper { face } => face * roll.count(face) as i32,
        ScoringKind::NOfAKind {
            min_count,
            valuation,
        } => {
            if roll.is_n_kind(min_count) {
                valuation.eval(roll)
            } else {
                0
            }
        }
        ScoringKind::Straight { length, value } => {
            if is_straight(roll, length) {
                value
            } else {
                0
            }
        }
        ScoringKind::FullHouse { value } => {
            if is_full_house(roll) {
                value
            } else {
                0
            }
        }
        ScoringKind::FiveOfAKind { value } => {
            if is_yahtzee(roll) {
                value
            } else {
                0
            }
        }
    }
}

/// A complete, parameterized rule set with its precomputed roll catalogs.
pub struct YahtzeeRules {
    params: RuleParams,
    categories: Vec<Category>,
    /// Bits needed for the capped upper total in the anchor index.
    upper_bits: u32,
    /// face -> index of the upper category scoring that face, if any.
    upper_category_for_face: Vec<Option<usize>>,
    /// All rolls of exactly `dice_count` dice.
    complete: Vec<DiceRoll>,
    /// All rolls of fewer dice, larger sizes first, ending with the empty roll.
    partial: Vec<DiceRoll>,
    /// Subroll enumeration for every complete roll.
    subrolls: FxHashMap<DiceRoll, Vec<DiceRoll>>,
    /// Unused-category lists for every (flag, used) pair, Yahtzee first
    /// while still eligible. Indexed by `flag_index << cat_bits | used`.
    unused: Vec<Vec<usize>>,
    empty: DiceRoll,
}

fn push_combinations(
    pips: &mut Vec<i32>,
    lowest: i32,
    remaining: u32,
    sides: i32,
    out: &mut Vec<DiceRoll>,
) -> Result<(), RangeError> {
    if remaining == 0 {
        out.push(DiceRoll::new(pips, sides)?);
        return Ok(());
    }
    for face in lowest..=sides {
        pips.push(face);
        push_combinations(pips, face, remaining - 1, sides, out)?;
        pips.pop();
    }
    Ok(())
}

/// All distinct rolls of `size` dice: combinations with replacement.
fn rolls_of_size(size: u32, sides: i32) -> Result<Vec<DiceRoll>, RangeError> {
    let mut out = Vec::new();
    let mut pips = Vec::with_capacity(size as usize);
    push_combinations(&mut pips, 1, size, sides, &mut out)?;
    Ok(out)
}

impl YahtzeeRules {
    /// Builds a rule set, validating the parameters and precomputing the
    /// roll catalogs and unused-category lists.
    pub fn new(params: RuleParams, categories: Vec<Category>) -> Result<Self, RangeError> {
        if params.sides < 1 || params.sides > 9 {
            return Err(RangeError::Sides(params.sides));
        }
        if params.dice_count == 0 {
            return Err(RangeError::RuleParams("dice count must be positive"));
        }
        if params.bonus_threshold < 1 {
            return Err(RangeError::RuleParams("bonus threshold must be positive"));
        }
        if categories.len() < 2 || categories.len() > 32 {
            return Err(RangeError::RuleParams("need 2 to 32 categories"));
        }
        let last = categories.len() - 1;
        for (i, category) in categories.iter().enumerate() {
            let is_five_kind = matches!(category.kind, ScoringKind::FiveOfAKind { .. });
            if is_five_kind != (i == last) {
                return Err(RangeError::RuleParams(
                    "exactly one five-of-a-kind category, in the last position",
                ));
            }
            if categories[..i].iter().any(|c| c.name == category.name) {
                return Err(RangeError::RuleParams("duplicate category name"));
            }
        }

        let mut upper_category_for_face = vec![None; params.sides as usize + 1];
        for (i, category) in categories.iter().enumerate() {
            if let ScoringKind::Upper { face } = category.kind {
                if face < 1 || face > params.sides {
                    return Err(RangeError::Face {
                        face,
                        sides: params.sides,
                    });
                }
                upper_category_for_face[face as usize] = Some(i);
            }
        }

        let complete = rolls_of_size(params.dice_count, params.sides)?;
        let mut partial = Vec::new();
        for size in (0..params.dice_count).rev() {
            partial.extend(rolls_of_size(size, params.sides)?);
        }
        let mut subrolls = FxHashMap::default();
        for roll in &complete {
            subrolls.insert(roll.clone(), roll.all_subrolls());
        }

        let cat_bits = last;
        let mut unused = Vec::with_capacity(YahtzeeFlag::COUNT << cat_bits);
        for flag_index in 0..YahtzeeFlag::COUNT {
            for used in 0u32..(1 << cat_bits) {
                let mut list = Vec::new();
                if flag_index == YahtzeeFlag::Unused.index() {
                    list.push(last);
                }
                list.extend((0..last).filter(|&c| used & (1 << c) == 0));
                unused.push(list);
            }
        }

        let empty = DiceRoll::new(&[], params.sides)?;
        let upper_bits = (params.bonus_threshold as u32).ilog2() + 1;
        Ok(YahtzeeRules {
            params,
            categories,
            upper_bits,
            upper_category_for_face,
            complete,
            partial,
            subrolls,
            unused,
            empty,
        })
    }

    /// Standard Yahtzee: 5 six-sided dice, 2 rerolls, upper bonus 35 at 63,
    /// full house 25, straights 30/40, Yahtzee 50, Yahtzee bonus 100, free
    /// jokers on full house and both straights.
    pub fn standard() -> Self {
        let params = RuleParams {
            dice_count: 5,
            sides: 6,
            rerolls: 2,
            bonus_threshold: 63,
            bonus_value: 35,
            yahtzee_bonus: 100,
        };
        let pips = Valuation::TotalPips;
        let categories = vec![
            Category::upper("1", 1),
            Category::upper("2", 2),
            Category::upper("3", 3),
            Category::upper("4", 4),
            Category::upper("5", 5),
            Category::upper("6", 6),
            Category {
                name: "3K",
                kind: ScoringKind::NOfAKind {
                    min_count: 3,
                    valuation: pips,
                },
                joker: JokerRule::Disallowed,
            },
            Category {
                name: "4K",
                kind: ScoringKind::NOfAKind {
                    min_count: 4,
                    valuation: pips,
                },
                joker: JokerRule::Disallowed,
            },
            Category {
                name: "FH",
                kind: ScoringKind::FullHouse { value: 25 },
                joker: JokerRule::Allowed { value: 25 },
            },
            Category {
                name: "SS",
                kind: ScoringKind::Straight {
                    length: 4,
                    value: 30,
                },
                joker: JokerRule::Allowed { value: 30 },
            },
            Category {
                name: "LS",
                kind: ScoringKind::Straight {
                    length: 5,
                    value: 40,
                },
                joker: JokerRule::Allowed { value: 40 },
            },
            Category {
                name: "C",
                kind: ScoringKind::NOfAKind {
                    min_count: 1,
                    valuation: pips,
                },
                joker: JokerRule::Disallowed,
            },
            Category {
                name: "Y",
                kind: ScoringKind::FiveOfAKind { value: 50 },
                joker: JokerRule::Disallowed,
            },
        ];
        Self::new(params, categories).expect("standard rule set is valid")
    }

    pub fn params(&self) -> &RuleParams {
        &self.params
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn num_categories(&self) -> usize {
        self.categories.len()
    }

    pub fn dice_count(&self) -> u32 {
        self.params.dice_count
    }

    pub fn sides(&self) -> i32 {
        self.params.sides
    }

    pub fn rerolls(&self) -> u32 {
        self.params.rerolls
    }

    pub fn bonus_threshold(&self) -> i32 {
        self.params.bonus_threshold
    }

    /// Scoresheet slot receiving the one-time upper bonus.
    pub fn bonus_slot(&self) -> usize {
        self.categories.len()
    }

    /// Scoresheet slot accumulating Yahtzee bonuses.
    pub fn yahtzee_bonus_slot(&self) -> usize {
        self.categories.len() + 1
    }

    fn cat_bits(&self) -> usize {
        self.categories.len() - 1
    }

    fn used_mask(&self) -> u32 {
        (1 << self.cat_bits()) - 1
    }

    /// Number of slots in a dense value table: one per anchor index.
    pub fn table_len(&self) -> usize {
        YahtzeeFlag::COUNT << (self.cat_bits() + self.upper_bits as usize)
    }

    /// The coordinate-wise maximal anchor; the descending enumeration in the
    /// solver starts here.
    pub fn max_anchor(&self) -> Anchor {
        Anchor {
            yahtzee: YahtzeeFlag::Nonzero,
            upper_total: self.params.bonus_threshold,
            used: self.used_mask(),
        }
    }

    /// Packs an anchor into its dense index: used mask in the low bits, the
    /// capped upper total above it, the Yahtzee flag on top.
    pub fn anchor_to_index(&self, anchor: Anchor) -> usize {
        let cat_bits = self.cat_bits();
        (anchor.yahtzee.index() << (cat_bits + self.upper_bits as usize))
            | ((anchor.upper_total as usize) << cat_bits)
            | anchor.used as usize
    }

    /// Inverts [`Self::anchor_to_index`].
    pub fn index_to_anchor(&self, index: usize) -> Result<Anchor, RangeError> {
        if index >= self.table_len() {
            return Err(RangeError::AnchorIndex(index));
        }
        let cat_bits = self.cat_bits();
        let used = (index as u32) & self.used_mask();
        let upper_total = ((index >> cat_bits) & ((1 << self.upper_bits) - 1)) as i32;
        let flag_index = index >> (cat_bits + self.upper_bits as usize);
        let yahtzee =
            YahtzeeFlag::from_index(flag_index).ok_or(RangeError::AnchorIndex(index))?;
        if upper_total > self.params.bonus_threshold {
            return Err(RangeError::AnchorIndex(index));
        }
        Ok(Anchor {
            yahtzee,
            upper_total,
            used,
        })
    }

    /// Terminal anchors have every category used; no scoring remains.
    pub fn is_terminal(&self, anchor: Anchor) -> bool {
        anchor.yahtzee != YahtzeeFlag::Unused && anchor.used == self.used_mask()
    }

    /// Value of a terminal anchor: nothing left to score.
    pub fn terminal_value(&self, _anchor: Anchor) -> f64 {
        0.0
    }

    /// Categories still open at this anchor, the Yahtzee category first
    /// while it is unused.
    pub fn unused_categories(&self, anchor: Anchor) -> &[usize] {
        let index = (anchor.yahtzee.index() << self.cat_bits()) | anchor.used as usize;
        &self.unused[index]
    }

    /// All rolls of the full per-turn dice count.
    pub fn complete_rolls(&self) -> &[DiceRoll] {
        &self.complete
    }

    /// All undersized rolls, larger sizes first, ending with the empty roll.
    pub fn partial_rolls(&self) -> &[DiceRoll] {
        &self.partial
    }

    /// The precomputed subroll enumeration of a complete roll, if cataloged.
    pub fn subrolls(&self, roll: &DiceRoll) -> Option<&[DiceRoll]> {
        self.subrolls.get(roll).map(Vec::as_slice)
    }

    /// The zero-dice roll that starts every turn.
    pub fn empty_roll(&self) -> &DiceRoll {
        &self.empty
    }

    /// Index of the category with the given abbreviation.
    pub fn find_category(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.name == name)
    }

    /// Scores `roll` in category `cat` at `anchor`: the successor anchor and
    /// the per-slot points awarded.
    ///
    /// Composition order: joker substitution (active once the Yahtzee
    /// category has been used, even with a zero score), base scoring,
    /// upper-bonus tracking, used-mask / Yahtzee-flag advancement, and the
    /// Yahtzee-bonus award.
    pub fn apply(
        &self,
        anchor: Anchor,
        roll: &DiceRoll,
        cat: usize,
    ) -> Result<(Anchor, TurnScore), Error> {
        let last = self.categories.len() - 1;
        if cat > last {
            return Err(RangeError::Category(cat).into());
        }
        if cat == last {
            if anchor.yahtzee != YahtzeeFlag::Unused {
                return Err(StateError::CategoryUsed(cat).into());
            }
        } else if anchor.used & (1 << cat) != 0 {
            return Err(StateError::CategoryUsed(cat).into());
        }

        let category = &self.categories[cat];
        let mut score = TurnScore::default();
        let mut successor = anchor;

        if let ScoringKind::FiveOfAKind { value } = category.kind {
            let hit = is_yahtzee(roll);
            score.add(cat, if hit { value } else { 0 });
            successor.yahtzee = if hit {
                YahtzeeFlag::Nonzero
            } else {
                YahtzeeFlag::Zero
            };
        } else {
            let joker_active = anchor.yahtzee != YahtzeeFlag::Unused && is_yahtzee(roll);
            let points = match (joker_active, category.joker) {
                (true, JokerRule::Allowed { value }) => {
                    // joker scores the fixed value only when the matching
                    // upper category is already used
                    let face = roll.min_face();
                    match self.upper_category_for_face.get(face as usize) {
                        Some(Some(upper_cat)) if anchor.used & (1 << upper_cat) != 0 => value,
                        _ => 0,
                    }
                }
                _ => base_score(category.kind, roll),
            };
            score.add(cat, points);
            if matches!(category.kind, ScoringKind::Upper { .. }) {
                let threshold = self.params.bonus_threshold;
                if anchor.upper_total < threshold && anchor.upper_total + points >= threshold {
                    score.add(self.bonus_slot(), self.params.bonus_value);
                }
                successor.upper_total = (anchor.upper_total + points).min(threshold);
            }
            successor.used |= 1 << cat;
        }

        if anchor.yahtzee == YahtzeeFlag::Nonzero && is_yahtzee(roll) {
            score.add(self.yahtzee_bonus_slot(), self.params.yahtzee_bonus);
        }

        Ok((successor, score))
    }

    /// Total points for scoring `roll` in `cat` at `anchor`.
    pub fn score(&self, anchor: Anchor, roll: &DiceRoll, cat: usize) -> Result<i32, Error> {
        Ok(self.apply(anchor, roll, cat)?.1.total())
    }

    /// Successor anchor after scoring `roll` in `cat`.
    pub fn successor(&self, anchor: Anchor, roll: &DiceRoll, cat: usize) -> Result<Anchor, Error> {
        Ok(self.apply(anchor, roll, cat)?.0)
    }

    /// Anchor text format: used category abbreviations, `Y`/`Y+` for the
    /// Yahtzee flag, then `UP<n>` for the capped upper total.
    pub fn anchor_to_string(&self, anchor: Anchor) -> String {
        let mut parts: Vec<String> = Vec::new();
        for (i, category) in self.categories.iter().enumerate().take(self.cat_bits()) {
            if anchor.used & (1 << i) != 0 {
                parts.push(category.name.to_string());
            }
        }
        match anchor.yahtzee {
            YahtzeeFlag::Unused => {}
            YahtzeeFlag::Zero => parts.push("Y".to_string()),
            YahtzeeFlag::Nonzero => parts.push("Y+".to_string()),
        }
        parts.push(format!("UP{}", anchor.upper_total));
        parts.join(" ")
    }

    /// Parses the format written by [`Self::anchor_to_string`], for example
    /// `"1 2 4 5 6 3K 4K FH SS LS C Y+ UP58"`.
    pub fn parse_anchor(&self, text: &str) -> Result<Anchor, RangeError> {
        let mut anchor = Anchor::START;
        for token in text.split_whitespace() {
            if let Some(rest) = token.strip_prefix("UP") {
                let upper: i32 = rest.parse().map_err(|_| RangeError::Malformed {
                    what: "anchor upper total",
                    text: token.to_string(),
                })?;
                if upper < 0 || upper > self.params.bonus_threshold {
                    return Err(RangeError::Malformed {
                        what: "anchor upper total",
                        text: token.to_string(),
                    });
                }
                anchor.upper_total = upper;
            } else if token == "Y+" {
                anchor.yahtzee = YahtzeeFlag::Nonzero;
            } else if token == "Y" {
                anchor.yahtzee = YahtzeeFlag::Zero;
            } else {
                let cat = self
                    .find_category(token)
                    .ok_or_else(|| RangeError::Abbreviation(token.to_string()))?;
                if cat == self.categories.len() - 1 {
                    anchor.yahtzee = YahtzeeFlag::Zero;
                } else {
                    anchor.used |= 1 << cat;
                }
            }
        }
        Ok(anchor)
    }
}
