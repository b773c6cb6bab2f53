//! Classing schemes and residue addressing.
//!
//! A classing partitions ciphertext positions into a handful of classes, each
//! driven by its own wheel. Within a class, a position is addressed by its
//! ordinal (how many earlier positions share its class), shifted by the
//! class phase and reduced modulo the class period.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::WheelError;

/// A closed set of classing functions. Every variant is total and pure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum Classing {
    /// `class(i) = (i mod 2) * 3 + (i mod 3)`; six classes.
    ParityTriad,
    /// `class(i) = i mod k`.
    Modulo { k: usize },
    /// One class holding every position.
    Single,
}

impl Classing {
    /// Stable identifier written into proof digests.
    pub fn id(&self) -> String {
        match self {
            Classing::ParityTriad => "c6a".to_string(),
            Classing::Modulo { k } => format!("mod{}", k),
            Classing::Single => "single".to_string(),
        }
    }

    pub fn num_classes(&self) -> usize {
        match self {
            Classing::ParityTriad => 6,
            Classing::Modulo { k } => *k,
            Classing::Single => 1,
        }
    }

    pub fn validate(&self) -> Result<(), WheelError> {
        if self.num_classes() == 0 {
            return Err(WheelError::EmptyClassing(self.id()));
        }
        Ok(())
    }

    /// Class of position `i`. Callers must have validated the scheme.
    pub fn class_of(&self, i: usize) -> usize {
        match self {
            Classing::ParityTriad => (i % 2) * 3 + (i % 3),
            Classing::Modulo { k } => i % k,
            Classing::Single => 0,
        }
    }
}

impl fmt::Display for Classing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// `(ordinal + phase) mod period`. `period` must be nonzero.
pub fn slot_index(ordinal: usize, period: usize, phase: usize) -> usize {
    (ordinal + phase % period) % period
}

/// Precomputed class and ordinal for every position of a text of length `n`.
///
/// Built once per (classing, length) and shared read-only by the solver,
/// the deriver and every null-sample trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressTable {
    classing: Classing,
    classes: Vec<usize>,
    ordinals: Vec<usize>,
    counts: Vec<usize>,
}

impl AddressTable {
    pub fn build(classing: Classing, n: usize) -> Result<Self, WheelError> {
        classing.validate()?;
        let mut counts = vec![0usize; classing.num_classes()];
        let mut classes = Vec::with_capacity(n);
        let mut ordinals = Vec::with_capacity(n);
        for i in 0..n {
            let c = classing.class_of(i);
            classes.push(c);
            ordinals.push(counts[c]);
            counts[c] += 1;
        }
        Ok(AddressTable {
            classing,
            classes,
            ordinals,
            counts,
        })
    }

    pub fn classing(&self) -> Classing {
        self.classing
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn num_classes(&self) -> usize {
        self.counts.len()
    }

    pub fn class(&self, i: usize) -> usize {
        self.classes[i]
    }

    /// 0-based occurrence count of position `i` within its class.
    pub fn ordinal(&self, i: usize) -> usize {
        self.ordinals[i]
    }

    /// Number of positions in `class`.
    pub fn count(&self, class: usize) -> usize {
        self.counts.get(class).copied().unwrap_or(0)
    }

    pub fn slot(&self, i: usize, period: usize, phase: usize) -> usize {
        slot_index(self.ordinals[i], period, phase)
    }

    /// Positions belonging to `class`, ascending.
    pub fn positions_of(&self, class: usize) -> impl Iterator<Item = usize> + '_ {
        self.classes
            .iter()
            .enumerate()
            .filter(move |(_, &c)| c == class)
            .map(|(i, _)| i)
    }
}
