//! Error type shared by every crate in the workbench.
//!
//! Infeasible schedules and round-trip mismatches are ordinary results and do
//! not appear here. These variants cover malformed input: the kind of thing
//! that aborts a candidate (length mismatches) or signals an authoring bug
//! upstream (malformed permutations).

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WheelError {
    #[error("invalid symbol {found:?} at index {index}")]
    InvalidSymbol { index: usize, found: char },

    #[error("{what} length mismatch: expected {expected}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("anchor {name} spans {span} positions but carries {found} symbols")]
    AnchorLength {
        name: String,
        span: usize,
        found: usize,
    },

    #[error("anchor {name} ends at {end}, beyond text length {len}")]
    AnchorOutOfRange { name: String, end: usize, len: usize },

    #[error("anchors {first} and {second} overlap")]
    OverlappingAnchors { first: String, second: String },

    #[error("constraint at position {position} conflicts: {existing} vs {attempted}")]
    ConflictingConstraint {
        position: usize,
        existing: char,
        attempted: char,
    },

    #[error("constraint position {position} out of range for length {len}")]
    PositionOutOfRange { position: usize, len: usize },

    #[error("period must be at least 1")]
    ZeroPeriod,

    #[error("classing {0} has no classes")]
    EmptyClassing(String),

    #[error("class {class} out of range: classing has {classes} classes")]
    ClassOutOfRange { class: usize, classes: usize },

    #[error("slot {slot} out of range for period {period}")]
    SlotOutOfRange { slot: usize, period: usize },

    #[error("slot {slot} already holds key {existing}, refusing to overwrite with {attempted}")]
    SlotConflict {
        slot: usize,
        existing: u8,
        attempted: u8,
    },

    #[error("schedule incomplete: class {class} slot {slot} has no key")]
    IncompleteSchedule { class: usize, slot: usize },

    #[error("malformed permutation {id}: {reason}")]
    MalformedPermutation { id: String, reason: String },

    #[error("failed to load config {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },
}

impl WheelError {
    /// Whether the error indicates an upstream authoring bug that must stop the batch.
    pub fn is_authoring_bug(&self) -> bool {
        matches!(self, WheelError::MalformedPermutation { .. })
    }
}
