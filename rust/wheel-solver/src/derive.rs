//! Plaintext derivation and forward round-trip verification.
//!
//! Wheel keys are addressed by ciphertext position. Encryption permutes the
//! plaintext first, then enciphers every position of the permuted text with
//! the key addressed at that position. Derivation runs the same path
//! backwards: decipher every position it has a key for, then invert the
//! permutation.

use serde::{Deserialize, Serialize};
use std::fmt;

use wheel_core::{
    render_partial, value_letter, AddressTable, Ciphertext, Permutation, Schedule, WheelError,
};

/// Best-effort plaintext; `None` marks a position whose slot has no key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derived {
    pub text: Vec<Option<u8>>,
}

impl Derived {
    pub fn known(&self) -> usize {
        self.text.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.text.iter().all(Option::is_some)
    }

    /// The plaintext, if every position is known.
    pub fn complete(&self) -> Option<Vec<u8>> {
        self.text.iter().copied().collect()
    }

    pub fn render(&self) -> String {
        render_partial(&self.text)
    }
}

fn check_len(what: &'static str, expected: usize, found: usize) -> Result<(), WheelError> {
    if expected != found {
        return Err(WheelError::LengthMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}

/// Decrypt everything the schedule has keys for.
pub fn derive(
    ciphertext: &Ciphertext,
    schedule: &Schedule,
    perm: &Permutation,
) -> Result<Derived, WheelError> {
    let n = ciphertext.len();
    check_len("permutation", n, perm.len())?;
    let table = AddressTable::build(schedule.classing, n)?;
    derive_with(ciphertext, schedule, perm, &table)
}

/// [`derive`] with a prebuilt address table, for hot loops such as null sampling.
pub fn derive_with(
    ciphertext: &Ciphertext,
    schedule: &Schedule,
    perm: &Permutation,
    table: &AddressTable,
) -> Result<Derived, WheelError> {
    let n = ciphertext.len();
    check_len("address table", n, table.len())?;
    let permuted: Vec<Option<u8>> = ciphertext
        .symbols()
        .iter()
        .enumerate()
        .map(|(i, &c)| schedule.key_at(table, i).map(|(family, k)| family.decrypt(c, k)))
        .collect();
    Ok(Derived {
        text: perm.invert(&permuted)?,
    })
}

/// Forward path: permute then encrypt. Requires a complete schedule.
pub fn encrypt(
    plaintext: &[u8],
    schedule: &Schedule,
    perm: &Permutation,
) -> Result<Vec<u8>, WheelError> {
    check_len("permutation", plaintext.len(), perm.len())?;
    if let Some((class, slot)) = schedule.first_missing() {
        return Err(WheelError::IncompleteSchedule { class, slot });
    }
    let table = AddressTable::build(schedule.classing, plaintext.len())?;
    let permuted = perm.apply(plaintext)?;
    permuted
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let (class, slot) = schedule.address(&table, i);
            schedule
                .key_at(&table, i)
                .map(|(family, k)| family.encrypt(p, k))
                .ok_or(WheelError::IncompleteSchedule { class, slot })
        })
        .collect()
}

/// Outcome of forward verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RoundTrip {
    Exact,
    Mismatch { index: usize, expected: u8, found: u8 },
}

impl RoundTrip {
    pub fn is_exact(&self) -> bool {
        matches!(self, RoundTrip::Exact)
    }
}

impl fmt::Display for RoundTrip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundTrip::Exact => f.write_str("exact"),
            RoundTrip::Mismatch {
                index,
                expected,
                found,
            } => write!(
                f,
                "mismatch at index {}: ciphertext has {}, candidate encrypts to {}",
                index,
                value_letter(*expected),
                value_letter(*found)
            ),
        }
    }
}

/// Encrypt `plaintext` and compare symbol by symbol with `ciphertext`.
pub fn verify(
    plaintext: &[u8],
    ciphertext: &Ciphertext,
    schedule: &Schedule,
    perm: &Permutation,
) -> Result<RoundTrip, WheelError> {
    check_len("plaintext", ciphertext.len(), plaintext.len())?;
    let produced = encrypt(plaintext, schedule, perm)?;
    Ok(produced
        .iter()
        .zip(ciphertext.symbols())
        .position(|(a, b)| a != b)
        .map(|index| RoundTrip::Mismatch {
            index,
            expected: ciphertext.symbols()[index],
            found: produced[index],
        })
        .unwrap_or(RoundTrip::Exact))
}
