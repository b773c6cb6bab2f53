//! Known-plaintext constraints built from anchors and extra positions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use wheel_core::{value_letter, Anchor, Permutation, WheelError};

/// Where a constraint came from. Option-A scope is decided on this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ConstraintSource {
    Anchor(String),
    Extra,
}

impl ConstraintSource {
    pub fn is_anchor(&self) -> bool {
        matches!(self, ConstraintSource::Anchor(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub position: usize,
    pub plain: u8,
    pub source: ConstraintSource,
}

/// Position-ordered map of required plaintext symbols for a text of length `len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintSet {
    len: usize,
    by_position: BTreeMap<usize, Constraint>,
}

impl ConstraintSet {
    pub fn new(len: usize) -> Self {
        ConstraintSet {
            len,
            by_position: BTreeMap::new(),
        }
    }

    /// Constraints from non-overlapping anchors inside `[0, len)`.
    pub fn from_anchors(anchors: &[Anchor], len: usize) -> Result<Self, WheelError> {
        for (i, a) in anchors.iter().enumerate() {
            if a.is_empty() || a.plain.len() != a.len() {
                return Err(WheelError::AnchorLength {
                    name: a.name.clone(),
                    span: a.len(),
                    found: a.plain.len(),
                });
            }
            if a.end >= len {
                return Err(WheelError::AnchorOutOfRange {
                    name: a.name.clone(),
                    end: a.end,
                    len,
                });
            }
            if let Some(b) = anchors[..i].iter().find(|b| b.overlaps(a)) {
                return Err(WheelError::OverlappingAnchors {
                    first: b.name.clone(),
                    second: a.name.clone(),
                });
            }
        }

        let mut set = ConstraintSet::new(len);
        for a in anchors {
            for (offset, &plain) in a.plain.iter().enumerate() {
                set.insert(Constraint {
                    position: a.start + offset,
                    plain,
                    source: ConstraintSource::Anchor(a.name.clone()),
                })?;
            }
        }
        Ok(set)
    }

    /// Add a non-anchor constraint.
    pub fn with_extra(mut self, position: usize, plain: u8) -> Result<Self, WheelError> {
        self.insert(Constraint {
            position,
            plain,
            source: ConstraintSource::Extra,
        })?;
        Ok(self)
    }

    /// Insert a constraint. Agreeing duplicates keep the first (anchor) source.
    pub fn insert(&mut self, c: Constraint) -> Result<(), WheelError> {
        if c.position >= self.len {
            return Err(WheelError::PositionOutOfRange {
                position: c.position,
                len: self.len,
            });
        }
        if let Some(existing) = self.by_position.get(&c.position) {
            if existing.plain != c.plain {
                return Err(WheelError::ConflictingConstraint {
                    position: c.position,
                    existing: value_letter(existing.plain),
                    attempted: value_letter(c.plain),
                });
            }
            return Ok(());
        }
        self.by_position.insert(c.position, c);
        Ok(())
    }

    /// Re-index plaintext-space constraints into the permuted space the wheels see.
    pub fn through(&self, perm: &Permutation) -> Result<Self, WheelError> {
        if perm.len() != self.len {
            return Err(WheelError::LengthMismatch {
                what: "permutation",
                expected: self.len,
                found: perm.len(),
            });
        }
        let mut out = ConstraintSet::new(self.len);
        for c in self.by_position.values() {
            out.insert(Constraint {
                position: perm.destination(c.position),
                plain: c.plain,
                source: c.source.clone(),
            })?;
        }
        Ok(out)
    }

    /// Keep only constraints whose position satisfies `keep`.
    pub fn filtered(&self, mut keep: impl FnMut(&Constraint) -> bool) -> Self {
        ConstraintSet {
            len: self.len,
            by_position: self
                .by_position
                .iter()
                .filter(|(_, c)| keep(c))
                .map(|(&p, c)| (p, c.clone()))
                .collect(),
        }
    }

    pub fn text_len(&self) -> usize {
        self.len
    }

    pub fn len(&self) -> usize {
        self.by_position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_position.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Constraint> {
        self.by_position.get(&position)
    }

    /// Constraints in ascending position order.
    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.by_position.values()
    }
}
