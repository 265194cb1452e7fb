//! Backward induction over the anchor partial order.
//!
//! [`solve`] fills a dense [`ValueTable`] with the optimal expected future
//! score of every anchor. Anchors are enumerated coordinate-descending,
//! Yahtzee flag outermost, then capped upper total, then used mask; every
//! legal transition strictly increases at least one coordinate, so each
//! anchor's successors are solved before the anchor itself.
//!
//! Each non-terminal anchor is solved by [`solve_component`]: the set of
//! in-turn positions `(rerolls remaining, roll)` reachable within one turn,
//! filled tier by tier from forced end-of-turn scoring back to the pre-roll
//! decision point. Player choices are maximized; chance nodes take the exact
//! mean over the next die, never a sample.

use std::io::Write;
use std::time::Instant;

use rustc_hash::FxHashMap;

use crate::error::{Error, RangeError, StateError};
use crate::roll::DiceRoll;
use crate::rules::{Anchor, YahtzeeFlag, YahtzeeRules};

/// Dense per-anchor value storage with an explicit solved bitmap.
///
/// Absence is represented by the bitmap, not a floating-point sentinel, so
/// seeded and computed values are indistinguishable once present.
#[derive(Clone, Debug)]
pub struct ValueTable {
    values: Vec<f64>,
    solved: Vec<bool>,
}

impl ValueTable {
    /// A table of `len` unsolved slots.
    pub fn new(len: usize) -> Self {
        ValueTable {
            values: vec![0.0; len],
            solved: vec![false; len],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_solved(&self, index: usize) -> bool {
        self.solved[index]
    }

    /// Number of solved slots.
    pub fn solved_count(&self) -> usize {
        self.solved.iter().filter(|&&s| s).count()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        if self.solved[index] {
            Some(self.values[index])
        } else {
            None
        }
    }

    pub fn set(&mut self, index: usize, value: f64) {
        self.values[index] = value;
        self.solved[index] = true;
    }

    /// The value at `index`, which must already be solved. A miss here means
    /// the anchor enumeration visited a predecessor first.
    pub fn expect(&self, index: usize) -> f64 {
        match self.get(index) {
            Some(value) => value,
            None => panic!("anchor index {index} read before it was solved; topological order violated"),
        }
    }
}

/// An in-turn position: the current dice and the rerolls still available.
/// `rerolls() + 1` with the empty roll is the turn's pre-roll decision point.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    pub rerolls: u32,
    pub roll: DiceRoll,
}

/// Transient value map for one anchor's component; discarded after the
/// anchor is solved.
pub type ComponentValues = FxHashMap<Position, f64>;

/// Default dice action filter: every subroll of the current roll.
pub fn keep_all_subrolls(
    rules: &YahtzeeRules,
    _anchor: Anchor,
    roll: &DiceRoll,
    _rerolls: u32,
) -> Vec<DiceRoll> {
    match rules.subrolls(roll) {
        Some(subs) => subs.to_vec(),
        None => roll.all_subrolls(),
    }
}

/// Default category action filter: every category still open at the anchor.
pub fn all_unused_categories(
    rules: &YahtzeeRules,
    anchor: Anchor,
    _roll: &DiceRoll,
) -> Vec<usize> {
    rules.unused_categories(anchor).to_vec()
}

/// Progress reporting for the anchor loop, throttled to twice a second.
struct SolveProgress {
    total: usize,
    completed: usize,
    start: Instant,
    last_report: Instant,
}

impl SolveProgress {
    fn new(total: usize) -> Self {
        let now = Instant::now();
        SolveProgress {
            total,
            completed: 0,
            start: now,
            last_report: now,
        }
    }

    fn step(&mut self) {
        self.completed += 1;
        let now = Instant::now();
        if self.completed < self.total
            && now.duration_since(self.last_report).as_secs_f64() < 0.5
        {
            return;
        }
        self.last_report = now;
        let elapsed = now.duration_since(self.start).as_secs_f64();
        let pct = self.completed as f64 / self.total as f64 * 100.0;
        let rate = self.completed as f64 / elapsed.max(1e-9);
        print!(
            "\rSolved {}/{} anchors ({:.1}%) | Elapsed: {:.1}s | Rate: {:.0} anchors/s   ",
            self.completed, self.total, pct, elapsed, rate
        );
        let _ = std::io::stdout().flush();
    }

    fn finish(&self) {
        let elapsed = self.start.elapsed().as_secs_f64();
        println!(
            "\nSolved {} anchors in {:.2}s ({:.0} anchors/s)",
            self.total,
            elapsed,
            self.total as f64 / elapsed.max(1e-9)
        );
    }
}

/// Fills (or resumes) the value table for every anchor and returns the value
/// of the initial anchor together with the table.
///
/// `seed` may carry pre-solved anchors, which are kept as-is; everything else
/// is computed. The enumeration visits, for each coordinate independently,
/// larger values before smaller ones, so every successor of an anchor is
/// solved strictly before the anchor itself.
pub fn solve<D, C>(
    rules: &YahtzeeRules,
    dice_filter: D,
    category_filter: C,
    seed: Option<ValueTable>,
) -> Result<(f64, ValueTable), Error>
where
    D: Fn(&YahtzeeRules, Anchor, &DiceRoll, u32) -> Vec<DiceRoll>,
    C: Fn(&YahtzeeRules, Anchor, &DiceRoll) -> Vec<usize>,
{
    let mut table = match seed {
        Some(table) => {
            if table.len() != rules.table_len() {
                return Err(RangeError::RuleParams(
                    "seed table length does not match the rule set",
                )
                .into());
            }
            table
        }
        None => ValueTable::new(rules.table_len()),
    };

    let max = rules.max_anchor();
    let total = YahtzeeFlag::COUNT * (max.upper_total as usize + 1) * (max.used as usize + 1);
    let mut progress = SolveProgress::new(total);

    for yahtzee in [
        YahtzeeFlag::Nonzero,
        YahtzeeFlag::Zero,
        YahtzeeFlag::Unused,
    ] {
        for upper_total in (0..=max.upper_total).rev() {
            for used in (0..=max.used).rev() {
                let anchor = Anchor {
                    yahtzee,
                    upper_total,
                    used,
                };
                let index = rules.anchor_to_index(anchor);
                progress.step();
                if table.is_solved(index) {
                    continue;
                }
                let value = if rules.is_terminal(anchor) {
                    rules.terminal_value(anchor)
                } else {
                    let component =
                        solve_component(anchor, rules, &dice_filter, &category_filter, &table)?;
                    component_value(
                        &component,
                        rules.rerolls() + 1,
                        rules.empty_roll().clone(),
                    )
                };
                table.set(index, value);
            }
        }
    }
    progress.finish();

    let initial = table.expect(rules.anchor_to_index(Anchor::START));
    Ok((initial, table))
}

fn component_value(values: &ComponentValues, rerolls: u32, roll: DiceRoll) -> f64 {
    let key = Position { rerolls, roll };
    match values.get(&key) {
        Some(&value) => value,
        None => panic!(
            "component position ({}, \"{}\") missing; tier ordering violated",
            key.rerolls, key.roll
        ),
    }
}

/// Solves every in-turn position reachable from `anchor` within one turn.
///
/// Tier order: forced scoring at 0 rerolls over complete rolls; then each
/// intermediate reroll count from 1 up, partial rolls (larger first) before
/// complete ones; finally the pre-roll tier of partial rolls. Each tier only
/// reads values from tiers already filled.
pub fn solve_component<D, C>(
    anchor: Anchor,
    rules: &YahtzeeRules,
    dice_filter: &D,
    category_filter: &C,
    table: &ValueTable,
) -> Result<ComponentValues, Error>
where
    D: Fn(&YahtzeeRules, Anchor, &DiceRoll, u32) -> Vec<DiceRoll>,
    C: Fn(&YahtzeeRules, Anchor, &DiceRoll) -> Vec<usize>,
{
    let dice_count = rules.dice_count();
    let tiers = rules.rerolls() as usize + 2;
    let mut values: ComponentValues = FxHashMap::default();
    values.reserve((rules.complete_rolls().len() + rules.partial_rolls().len()) * tiers);

    // 0 rerolls, complete roll: the player must score
    for roll in rules.complete_rolls() {
        let categories = category_filter(rules, anchor, roll);
        if categories.is_empty() {
            panic!(
                "category filter returned no actions at non-terminal anchor \"{}\"",
                rules.anchor_to_string(anchor)
            );
        }
        let mut best = f64::NEG_INFINITY;
        for cat in categories {
            let (successor, score) = rules.apply(anchor, roll, cat)?;
            let future = table.expect(rules.anchor_to_index(successor));
            best = best.max(future + score.total() as f64);
        }
        values.insert(
            Position {
                rerolls: 0,
                roll: roll.clone(),
            },
            best,
        );
    }

    for rerolls in 1..=rules.rerolls() {
        for roll in rules.partial_rolls() {
            let mean = expected_over_next_die(&values, rules, roll, rerolls)?;
            values.insert(
                Position {
                    rerolls,
                    roll: roll.clone(),
                },
                mean,
            );
        }
        // complete roll with rerolls in hand: choose which dice to keep;
        // keeping everything consumes a reroll, any smaller keep lands on
        // a partial position at the same reroll count
        for roll in rules.complete_rolls() {
            let keeps = dice_filter(rules, anchor, roll, rerolls);
            if keeps.is_empty() {
                panic!(
                    "dice filter returned no keeps for roll \"{}\" at anchor \"{}\"",
                    roll,
                    rules.anchor_to_string(anchor)
                );
            }
            let mut best = f64::NEG_INFINITY;
            for keep in keeps {
                if !keep.is_subroll_of(roll) {
                    return Err(StateError::NotSubroll {
                        keep: keep.to_string(),
                        roll: roll.to_string(),
                    }
                    .into());
                }
                let tier = if keep.size() == dice_count {
                    rerolls - 1
                } else {
                    rerolls
                };
                best = best.max(component_value(&values, tier, keep));
            }
            values.insert(
                Position {
                    rerolls,
                    roll: roll.clone(),
                },
                best,
            );
        }
    }

    // pre-roll tier: only partial rolls exist before the initial roll
    let pre_roll = rules.rerolls() + 1;
    for roll in rules.partial_rolls() {
        let mean = expected_over_next_die(&values, rules, roll, pre_roll)?;
        values.insert(
            Position {
                rerolls: pre_roll,
                roll: roll.clone(),
            },
            mean,
        );
    }

    Ok(values)
}

/// Exact mean over the `sides` equally likely next dice; the position
/// promotes to the next reroll tier exactly when the roll becomes complete.
fn expected_over_next_die(
    values: &ComponentValues,
    rules: &YahtzeeRules,
    roll: &DiceRoll,
    rerolls: u32,
) -> Result<f64, Error> {
    let tier = if roll.size() + 1 == rules.dice_count() {
        rerolls - 1
    } else {
        rerolls
    };
    let mut sum = 0.0;
    for face in 1..=rules.sides() {
        sum += component_value(values, tier, roll.add_one(face)?);
    }
    Ok(sum / rules.sides() as f64)
}
