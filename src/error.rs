//! Error taxonomy for the solver crate.
//!
//! Two families, both detected eagerly at the API boundary:
//! - [`RangeError`]: a value outside its domain (die faces, counts, category
//!   indices) or malformed parsed text.
//! - [`StateError`]: an operation that is illegal in the current game state
//!   (re-scoring a used category, keeping dice that are not in the roll).
//!
//! Invariant violations inside the solver itself (a successor anchor read
//! before it is solved, an action filter producing no actions at a
//! non-terminal position) are bugs, not recoverable conditions, and panic.

use thiserror::Error;

/// A value outside its legal domain, or text that does not decode to one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("element out of range: {value} (capacity {capacity})")]
    Element { value: i32, capacity: usize },

    #[error("number of possible values must be positive: {0}")]
    Capacity(usize),

    #[error("invalid number of sides: {0}")]
    Sides(i32),

    #[error("face out of range for {sides}-sided dice: {face}")]
    Face { face: i32, sides: i32 },

    #[error("can't reroll to fewer dice: {target} < {current}")]
    RerollTarget { target: u32, current: u32 },

    #[error("invalid category index: {0}")]
    Category(usize),

    #[error("anchor index out of range: {0}")]
    AnchorIndex(usize),

    #[error("invalid rule parameters: {0}")]
    RuleParams(&'static str),

    #[error("invalid digit {digit:?} in roll {text:?} for {sides} sides")]
    RollDigit { digit: char, text: String, sides: i32 },

    #[error("{0:?} is not a valid category abbreviation")]
    Abbreviation(String),

    #[error("malformed {what}: {text:?}")]
    Malformed { what: &'static str, text: String },
}

/// An operation that is illegal in the current game state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("category already used: {0}")]
    CategoryUsed(usize),

    #[error("dice to keep {keep:?} are not a subset of roll {roll:?}")]
    NotSubroll { keep: String, roll: String },
}

/// Union error for operations that can fail in more than one way.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
