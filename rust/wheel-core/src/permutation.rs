//! Positional permutation layer.
//!
//! A permutation moves only its movable indices; fixed indices (typically
//! anchor spans) map to themselves. Forward (`source -> destination`) and
//! inverse (`destination -> source`) tables are computed once at
//! construction and shared by every apply/invert call.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::error::WheelError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    id: String,
    fixed: Vec<usize>,
    movable: Vec<usize>,
    forward: Vec<usize>,
    inverse: Vec<usize>,
}

/// Serializable description of a permutation, as authored in data files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermutationSpec {
    pub id: String,
    pub n: usize,
    pub fixed: Vec<usize>,
    pub movable: Vec<usize>,
    pub destinations: Vec<usize>,
}

impl PermutationSpec {
    pub fn build(&self) -> Result<Permutation, WheelError> {
        Permutation::from_destinations(&self.id, self.n, &self.fixed, &self.movable, &self.destinations)
    }
}

fn malformed(id: &str, reason: String) -> WheelError {
    WheelError::MalformedPermutation {
        id: id.to_string(),
        reason,
    }
}

impl Permutation {
    pub fn identity(n: usize) -> Self {
        let table: Vec<usize> = (0..n).collect();
        Permutation {
            id: "identity".to_string(),
            fixed: table.clone(),
            movable: Vec::new(),
            forward: table.clone(),
            inverse: table,
        }
    }

    /// Movable index `movable[k]` is sent to `destinations[k]`.
    ///
    /// `fixed` and `movable` must partition `[0, n)` and `destinations`
    /// must be a rearrangement of `movable`.
    pub fn from_destinations(
        id: &str,
        n: usize,
        fixed: &[usize],
        movable: &[usize],
        destinations: &[usize],
    ) -> Result<Self, WheelError> {
        if movable.len() != destinations.len() {
            return Err(malformed(
                id,
                format!(
                    "{} movable indices but {} destinations",
                    movable.len(),
                    destinations.len()
                ),
            ));
        }

        let mut role = vec![0u8; n];
        for &i in fixed {
            if i >= n {
                return Err(malformed(id, format!("fixed index {} out of range {}", i, n)));
            }
            role[i] += 1;
        }
        for &i in movable {
            if i >= n {
                return Err(malformed(id, format!("movable index {} out of range {}", i, n)));
            }
            role[i] += 1;
        }
        if let Some(i) = role.iter().position(|&r| r != 1) {
            return Err(malformed(
                id,
                format!("index {} appears {} times across fixed and movable sets", i, role[i]),
            ));
        }

        let mut is_movable = vec![false; n];
        for &i in movable {
            is_movable[i] = true;
        }
        let mut hit = vec![false; n];
        let mut forward: Vec<usize> = (0..n).collect();
        for (&src, &dst) in movable.iter().zip(destinations) {
            if dst >= n || !is_movable[dst] {
                return Err(malformed(id, format!("destination {} is not a movable index", dst)));
            }
            if hit[dst] {
                return Err(malformed(id, format!("destination {} used twice", dst)));
            }
            hit[dst] = true;
            forward[src] = dst;
        }

        let mut inverse = vec![0usize; n];
        for (src, &dst) in forward.iter().enumerate() {
            inverse[dst] = src;
        }

        let mut fixed = fixed.to_vec();
        fixed.sort_unstable();
        let mut movable = movable.to_vec();
        movable.sort_unstable();

        Self::from_tables(id, fixed, movable, forward, inverse)
    }

    /// Route transposition over the movable indices.
    ///
    /// The non-fixed indices, ascending, are written row-wise into a grid
    /// `width` columns wide and read back column by column in `column_order`.
    /// The t-th symbol read lands on the t-th movable index.
    pub fn columnar(
        id: &str,
        n: usize,
        width: usize,
        column_order: &[usize],
        fixed: &[usize],
    ) -> Result<Self, WheelError> {
        if width == 0 {
            return Err(malformed(id, "columnar width must be at least 1".to_string()));
        }
        let mut order_seen = vec![false; width];
        if column_order.len() != width {
            return Err(malformed(
                id,
                format!("column order has {} entries for width {}", column_order.len(), width),
            ));
        }
        for &c in column_order {
            if c >= width || order_seen[c] {
                return Err(malformed(id, format!("column order is not a permutation of 0..{}", width)));
            }
            order_seen[c] = true;
        }

        let mut is_fixed = vec![false; n];
        for &i in fixed {
            if i >= n {
                return Err(malformed(id, format!("fixed index {} out of range {}", i, n)));
            }
            is_fixed[i] = true;
        }
        let movable: Vec<usize> = (0..n).filter(|&i| !is_fixed[i]).collect();
        let k = movable.len();
        let rows = (k + width - 1) / width;

        let mut destinations = vec![0usize; k];
        let mut t = 0usize;
        for &col in column_order {
            for row in 0..rows {
                let g = row * width + col;
                if g < k {
                    destinations[g] = movable[t];
                    t += 1;
                }
            }
        }

        let fixed: Vec<usize> = (0..n).filter(|&i| is_fixed[i]).collect();
        Self::from_destinations(id, n, &fixed, &movable, &destinations)
    }

    /// Accept precomputed tables, checking that `inverse` left-inverts `forward`.
    pub fn from_tables(
        id: &str,
        fixed: Vec<usize>,
        movable: Vec<usize>,
        forward: Vec<usize>,
        inverse: Vec<usize>,
    ) -> Result<Self, WheelError> {
        if forward.len() != inverse.len() {
            return Err(malformed(
                id,
                format!("forward has {} entries, inverse {}", forward.len(), inverse.len()),
            ));
        }
        let n = forward.len();
        for (src, &dst) in forward.iter().enumerate() {
            if dst >= n || inverse[dst] != src {
                return Err(malformed(
                    id,
                    format!("inverse does not left-invert forward at index {}", src),
                ));
            }
        }
        for &i in &fixed {
            if i >= n || forward[i] != i {
                return Err(malformed(id, format!("fixed index {} is moved", i)));
            }
        }
        Ok(Permutation {
            id: id.to_string(),
            fixed,
            movable,
            forward,
            inverse,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn fixed(&self) -> &[usize] {
        &self.fixed
    }

    pub fn movable(&self) -> &[usize] {
        &self.movable
    }

    /// The authored form of this permutation.
    pub fn to_spec(&self) -> PermutationSpec {
        PermutationSpec {
            id: self.id.clone(),
            n: self.len(),
            fixed: self.fixed.clone(),
            movable: self.movable.clone(),
            destinations: self.movable.iter().map(|&i| self.forward[i]).collect(),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.forward.iter().enumerate().all(|(i, &d)| i == d)
    }

    /// Where source index `i` lands.
    pub fn destination(&self, i: usize) -> usize {
        self.forward[i]
    }

    /// Which source index lands on `j`.
    pub fn source(&self, j: usize) -> usize {
        self.inverse[j]
    }

    fn check_len(&self, found: usize) -> Result<(), WheelError> {
        if found != self.len() {
            return Err(WheelError::LengthMismatch {
                what: "permutation input",
                expected: self.len(),
                found,
            });
        }
        Ok(())
    }

    /// Scatter `text[i]` to `out[destination(i)]`.
    pub fn apply<T: Copy>(&self, text: &[T]) -> Result<Vec<T>, WheelError> {
        self.check_len(text.len())?;
        let mut out = text.to_vec();
        for (i, &v) in text.iter().enumerate() {
            out[self.forward[i]] = v;
        }
        Ok(out)
    }

    /// Gather `out[i] = text[destination(i)]`, the exact left-inverse of `apply`.
    pub fn invert<T: Copy>(&self, text: &[T]) -> Result<Vec<T>, WheelError> {
        self.check_len(text.len())?;
        let mut out = text.to_vec();
        for (j, &v) in text.iter().enumerate() {
            out[self.inverse[j]] = v;
        }
        Ok(out)
    }

    /// Check `invert(apply(sample)) == sample`.
    pub fn check_left_inverse<T: Copy + PartialEq>(&self, sample: &[T]) -> Result<(), WheelError> {
        let round = self.invert(&self.apply(sample)?)?;
        match round.iter().zip(sample).position(|(a, b)| a != b) {
            None => Ok(()),
            Some(i) => Err(malformed(
                &self.id,
                format!("invert(apply(x)) differs from x at index {}", i),
            )),
        }
    }

    /// Panicking form of [`Permutation::check_left_inverse`] for tests and drivers.
    pub fn assert_left_inverse<T: Copy + PartialEq + Debug>(&self, sample: &[T]) {
        if let Err(e) = self.check_left_inverse(sample) {
            panic!("{}", e);
        }
    }
}
