//! Shared types for the wheel-cipher workbench.
//!
//! Everything the solver and the confirmation pipeline agree on lives here:
//! the 26-symbol alphabet, the immutable ciphertext, anchors, classing
//! schemes with residue addressing, the three additive cipher families,
//! wheels and schedules, and the positional permutation layer.

pub mod classing;
pub mod config;
pub mod error;
pub mod family;
pub mod permutation;
pub mod wheel;

pub use classing::{slot_index, AddressTable, Classing};
pub use config::{OptionAMode, OptionAPolicy, OptionAScope, SearchSpace, SolverConfig};
pub use error::WheelError;
pub use family::CipherFamily;
pub use permutation::{Permutation, PermutationSpec};
pub use wheel::{ClassKey, ForcedSlot, Provenance, Schedule, SlotDisagreement, Wheel};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of symbols in the alphabet. All key and text arithmetic is mod 26.
pub const ALPHABET_SIZE: u8 = 26;

/// The canonical 97-symbol ciphertext.
pub const K4_CIPHERTEXT: &str =
    "OBKRUOXOGHULBSOLIFBBWFLRVQQPRNGKSSOTWTQSJQSSEKZZWATJKLUDIAWINFBNYPVTTMZFPKWGDKZXTJCDIGKUHUAUEKCAR";

/// Published plaintext cribs for the canonical ciphertext: (name, start, plaintext).
/// Spans are 0-based and inclusive.
pub const K4_ANCHORS: &[(&str, usize, &str)] = &[
    ("EAST", 21, "EAST"),
    ("NORTHEAST", 25, "NORTHEAST"),
    ("BERLINCLOCK", 63, "BERLINCLOCK"),
];

/// Convert an uppercase or lowercase ASCII letter to its value (A = 0).
pub fn letter_value(c: char) -> Option<u8> {
    if c.is_ascii_alphabetic() {
        Some(c.to_ascii_uppercase() as u8 - b'A')
    } else {
        None
    }
}

/// Convert a value back to its uppercase letter.
pub fn value_letter(v: u8) -> char {
    (b'A' + v % ALPHABET_SIZE) as char
}

/// Parse a letter string into symbol values, rejecting anything outside A-Z.
pub fn parse_text(s: &str) -> Result<Vec<u8>, WheelError> {
    s.chars()
        .enumerate()
        .map(|(index, c)| letter_value(c).ok_or(WheelError::InvalidSymbol { index, found: c }))
        .collect()
}

/// Render symbol values as an uppercase string.
pub fn render(text: &[u8]) -> String {
    text.iter().map(|&v| value_letter(v)).collect()
}

/// Render a partially known text, marking unknown positions with `?`.
pub fn render_partial(text: &[Option<u8>]) -> String {
    text.iter()
        .map(|v| v.map(value_letter).unwrap_or('?'))
        .collect()
}

/// Lowercase hex SHA-256 of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::Digest;
    use std::fmt::Write;

    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest.iter() {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

/// The ciphertext under attack. Loaded once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    symbols: Vec<u8>,
}

impl Ciphertext {
    pub fn parse(s: &str) -> Result<Self, WheelError> {
        Ok(Ciphertext {
            symbols: parse_text(s)?,
        })
    }

    pub fn from_symbols(symbols: Vec<u8>) -> Result<Self, WheelError> {
        if let Some(index) = symbols.iter().position(|&v| v >= ALPHABET_SIZE) {
            return Err(WheelError::InvalidSymbol {
                index,
                found: char::from(symbols[index]),
            });
        }
        Ok(Ciphertext { symbols })
    }

    /// The canonical K4 ciphertext.
    pub fn k4() -> Self {
        Ciphertext {
            symbols: K4_CIPHERTEXT.bytes().map(|b| b - b'A').collect(),
        }
    }

    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn sha256(&self) -> String {
        sha256_hex(render(&self.symbols).as_bytes())
    }
}

impl fmt::Display for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(&self.symbols))
    }
}

/// A named contiguous span of known plaintext, `[start, end]` inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub name: String,
    pub start: usize,
    pub end: usize,
    pub plain: Vec<u8>,
}

impl Anchor {
    /// Build an anchor starting at `start` whose span is the length of `plain`.
    pub fn new(name: &str, start: usize, plain: &str) -> Result<Self, WheelError> {
        let plain = parse_text(plain)?;
        if plain.is_empty() {
            return Err(WheelError::AnchorLength {
                name: name.to_string(),
                span: 0,
                found: 0,
            });
        }
        Ok(Anchor {
            name: name.to_string(),
            start,
            end: start + plain.len() - 1,
            plain,
        })
    }

    /// Build an anchor from an explicit inclusive span, checking the length agrees.
    pub fn with_span(name: &str, start: usize, end: usize, plain: &str) -> Result<Self, WheelError> {
        let plain = parse_text(plain)?;
        let span = end.checked_sub(start).map(|d| d + 1).unwrap_or(0);
        if span == 0 || span != plain.len() {
            return Err(WheelError::AnchorLength {
                name: name.to_string(),
                span,
                found: plain.len(),
            });
        }
        Ok(Anchor {
            name: name.to_string(),
            start,
            end,
            plain,
        })
    }

    /// Positions covered; zero when a deserialized span has `end < start`.
    pub fn len(&self) -> usize {
        self.end
            .checked_sub(self.start)
            .and_then(|d| d.checked_add(1))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn positions(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }

    pub fn overlaps(&self, other: &Anchor) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}-{}", render(&self.plain), self.start, self.end)
    }
}

/// All published K4 anchors.
pub fn k4_anchors() -> Vec<Anchor> {
    K4_ANCHORS
        .iter()
        .map(|&(name, start, plain)| Anchor {
            name: name.to_string(),
            start,
            end: start + plain.len() - 1,
            plain: plain.bytes().map(|b| b - b'A').collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_k4_length() {
        let ct = Ciphertext::k4();
        assert_eq!(ct.len(), 97);
        assert_eq!(ct.to_string(), K4_CIPHERTEXT);
    }

    #[test]
    fn test_parse_rejects_non_letters() {
        let err = parse_text("AB3D").unwrap_err();
        assert_eq!(err, WheelError::InvalidSymbol { index: 2, found: '3' });
    }

    #[test]
    fn test_parse_lowercase() {
        assert_eq!(parse_text("azZ").unwrap(), vec![0, 25, 25]);
    }

    #[test]
    fn test_render_partial_marks_unknown() {
        assert_eq!(render_partial(&[Some(0), None, Some(25)]), "A?Z");
    }

    #[test]
    fn test_anchor_spans() {
        let anchors = k4_anchors();
        assert_eq!(anchors[0].start, 21);
        assert_eq!(anchors[0].end, 24);
        assert_eq!(anchors[1].start, 25);
        assert_eq!(anchors[1].end, 33);
        assert_eq!(anchors[2].end, 73);
        assert!(!anchors[0].overlaps(&anchors[1]));
        assert_eq!(anchors[1].to_string(), "NORTHEAST@25-33");
    }

    #[test]
    fn test_anchor_with_span_length_check() {
        assert!(Anchor::with_span("E", 21, 24, "EAST").is_ok());
        assert!(matches!(
            Anchor::with_span("E", 21, 23, "EAST"),
            Err(WheelError::AnchorLength { span: 3, found: 4, .. })
        ));
    }

    #[test]
    fn test_inverted_span_has_no_length() {
        let inverted = Anchor {
            name: "X".into(),
            start: 30,
            end: 21,
            plain: vec![4, 0, 18, 19],
        };
        assert_eq!(inverted.len(), 0);
        assert!(inverted.is_empty());
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_from_symbols_range_check() {
        assert!(Ciphertext::from_symbols(vec![0, 25]).is_ok());
        assert!(Ciphertext::from_symbols(vec![0, 26]).is_err());
    }
}
