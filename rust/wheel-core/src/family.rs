//! The three additive polyalphabetic families, all mod 26.
//!
//! | family           | encrypt     | decrypt     | solve key   |
//! |------------------|-------------|-------------|-------------|
//! | Vigenere         | `C = P + K` | `P = C - K` | `K = C - P` |
//! | Beaufort         | `C = K - P` | `P = K - C` | `K = P + C` |
//! | Variant Beaufort | `C = P - K` | `P = C + K` | `K = P - C` |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ALPHABET_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CipherFamily {
    Vigenere,
    Beaufort,
    VariantBeaufort,
}

#[inline]
fn add(a: u8, b: u8) -> u8 {
    (a % ALPHABET_SIZE + b % ALPHABET_SIZE) % ALPHABET_SIZE
}

#[inline]
fn sub(a: u8, b: u8) -> u8 {
    (a % ALPHABET_SIZE + ALPHABET_SIZE - b % ALPHABET_SIZE) % ALPHABET_SIZE
}

impl CipherFamily {
    /// Default search priority.
    pub const ALL: [CipherFamily; 3] = [
        CipherFamily::Vigenere,
        CipherFamily::Beaufort,
        CipherFamily::VariantBeaufort,
    ];

    pub fn encrypt(self, p: u8, k: u8) -> u8 {
        match self {
            CipherFamily::Vigenere => add(p, k),
            CipherFamily::Beaufort => sub(k, p),
            CipherFamily::VariantBeaufort => sub(p, k),
        }
    }

    pub fn decrypt(self, c: u8, k: u8) -> u8 {
        match self {
            CipherFamily::Vigenere => sub(c, k),
            CipherFamily::Beaufort => sub(k, c),
            CipherFamily::VariantBeaufort => add(c, k),
        }
    }

    /// The unique key mapping plaintext `p` to ciphertext `c`.
    pub fn solve_key(self, c: u8, p: u8) -> u8 {
        match self {
            CipherFamily::Vigenere => sub(c, p),
            CipherFamily::Beaufort => add(p, c),
            CipherFamily::VariantBeaufort => sub(p, c),
        }
    }

    /// Vigenere and Variant Beaufort pass plaintext through unchanged at `K = 0`.
    pub fn is_additive(self) -> bool {
        matches!(self, CipherFamily::Vigenere | CipherFamily::VariantBeaufort)
    }

    /// True when `k` makes this family an identity map (Option-A).
    /// Beaufort at `K = 0` is a reflection, never a pass-through.
    pub fn is_pass_through(self, k: u8) -> bool {
        self.is_additive() && k % ALPHABET_SIZE == 0
    }

    pub fn name(self) -> &'static str {
        match self {
            CipherFamily::Vigenere => "vigenere",
            CipherFamily::Beaufort => "beaufort",
            CipherFamily::VariantBeaufort => "variant_beaufort",
        }
    }
}

impl fmt::Display for CipherFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_families_invert() {
        for family in CipherFamily::ALL {
            for p in 0..26u8 {
                for k in 0..26u8 {
                    let c = family.encrypt(p, k);
                    assert!(c < 26);
                    assert_eq!(family.decrypt(c, k), p, "{} p={} k={}", family, p, k);
                    assert_eq!(family.solve_key(c, p), k, "{} p={} k={}", family, p, k);
                }
            }
        }
    }

    #[test]
    fn test_vigenere_examples() {
        // A + D = D, Z + B = A
        assert_eq!(CipherFamily::Vigenere.encrypt(0, 3), 3);
        assert_eq!(CipherFamily::Vigenere.encrypt(25, 1), 0);
    }

    #[test]
    fn test_beaufort_is_involution() {
        for k in 0..26u8 {
            for p in 0..26u8 {
                let c = CipherFamily::Beaufort.encrypt(p, k);
                assert_eq!(CipherFamily::Beaufort.encrypt(c, k), p);
            }
        }
    }

    #[test]
    fn test_pass_through_asymmetry() {
        assert!(CipherFamily::Vigenere.is_pass_through(0));
        assert!(CipherFamily::VariantBeaufort.is_pass_through(0));
        assert!(!CipherFamily::Beaufort.is_pass_through(0));
        assert!(!CipherFamily::Vigenere.is_pass_through(1));
        // K = 0 leaves additive plaintext unchanged, Beaufort does not
        assert_eq!(CipherFamily::Vigenere.encrypt(7, 0), 7);
        assert_eq!(CipherFamily::VariantBeaufort.encrypt(7, 0), 7);
        assert_ne!(CipherFamily::Beaufort.encrypt(7, 0), 7);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&CipherFamily::VariantBeaufort).unwrap(),
            "\"variant_beaufort\""
        );
    }
}
