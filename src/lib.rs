//! Exact solver for solitaire dice games of the Yahtzee family.
//!
//! Given a parameterized rule set (upper section with bonus, n-of-a-kind,
//! straights, full house, a five-of-a-kind category with joker and bonus
//! rules), the solver computes the provably optimal expected final score for
//! every reachable between-turn state by backward induction. Within a turn it
//! maximizes over kept subrolls and scoring categories and takes exact means
//! over die outcomes, so the resulting table is a ground-truth oracle for
//! grading heuristic or learned players and for move recommendation.
//!
//! Module map:
//! - [`multiset`]: fixed-capacity counting structure backing dice rolls
//! - [`roll`]: immutable dice rolls with cached hashes, subroll enumeration
//! - [`rules`]: categories, anchors (between-turn states), scoring, text forms
//! - [`solver`]: value table and the backward-induction engine
//! - [`storage`]: value-table text persistence for resumable solves
//!
//! ```no_run
//! use yahtzee_solver::{solve, keep_all_subrolls, all_unused_categories, YahtzeeRules};
//!
//! let rules = YahtzeeRules::standard();
//! let (value, _table) = solve(&rules, keep_all_subrolls, all_unused_categories, None)?;
//! println!("optimal expected score: {value:.2}");
//! # Ok::<(), yahtzee_solver::Error>(())
//! ```

pub mod error;
pub mod multiset;
pub mod roll;
pub mod rules;
pub mod solver;
pub mod storage;

pub use error::{Error, RangeError, StateError};
pub use multiset::Multiset;
pub use roll::DiceRoll;
pub use rules::{
    Anchor, Category, JokerRule, RuleParams, ScoringKind, TurnScore, Valuation, YahtzeeFlag,
    YahtzeeRules,
};
pub use solver::{all_unused_categories, keep_all_subrolls, solve, solve_component, ValueTable};
pub use storage::{load_values, load_values_from_path, save_values, save_values_to_path};
