//! Phrase-gate: structural templates over the head window.
//!
//! A track passes only if every one of its own checks passes. The gate
//! accepts a candidate if any track passes; the first passing track in
//! configuration order is recorded as the one that accepted it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::lexicon::{metrics_from_tokens, Token, TokenClass, Tokenizer};

/// One position of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSlot {
    /// Any one of these exact words.
    Word(Vec<String>),
    /// Any token of this class.
    Class(TokenClass),
}

impl TemplateSlot {
    fn matches(&self, token: &Token) -> bool {
        match self {
            TemplateSlot::Word(alternatives) => alternatives.iter().any(|w| *w == token.text),
            TemplateSlot::Class(class) => token.class == *class,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub slots: Vec<TemplateSlot>,
}

impl Template {
    /// Ordered-subsequence match: each slot must match a token after the previous one.
    pub fn matches(&self, tokens: &[Token]) -> bool {
        let mut rest = tokens.iter();
        self.slots
            .iter()
            .all(|slot| rest.by_ref().any(|t| slot.matches(t)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhraseTrack {
    /// At least one template matches and every required token appears.
    Strict {
        name: String,
        templates: Vec<Template>,
        required_tokens: Vec<String>,
    },
    /// Lexical thresholds restricted to the head window.
    Generic {
        name: String,
        min_head_coverage: f64,
        min_function_words: usize,
        require_verb: bool,
    },
}

impl PhraseTrack {
    pub fn name(&self) -> &str {
        match self {
            PhraseTrack::Strict { name, .. } | PhraseTrack::Generic { name, .. } => name,
        }
    }

    /// Declination-correction phrase followed by an instrument verb, with
    /// both directional anchors present.
    pub fn default_strict() -> Self {
        PhraseTrack::Strict {
            name: "strict".to_string(),
            templates: vec![Template {
                name: "declination_then_instrument".to_string(),
                slots: vec![
                    TemplateSlot::Word(vec![
                        "DECLINATION".to_string(),
                        "CORRECTION".to_string(),
                        "BEARING".to_string(),
                    ]),
                    TemplateSlot::Class(TokenClass::Verb),
                ],
            }],
            required_tokens: vec!["EAST".to_string(), "NORTHEAST".to_string()],
        }
    }

    pub fn default_generic() -> Self {
        PhraseTrack::Generic {
            name: "generic".to_string(),
            min_head_coverage: 0.85,
            min_function_words: 6,
            require_verb: true,
        }
    }

    pub fn evaluate(&self, tokens: &[Token], head_len: usize) -> TrackReport {
        let mut checks = BTreeMap::new();
        match self {
            PhraseTrack::Strict {
                templates,
                required_tokens,
                ..
            } => {
                checks.insert(
                    "template".to_string(),
                    templates.iter().any(|t| t.matches(tokens)),
                );
                for word in required_tokens {
                    checks.insert(
                        format!("token:{}", word),
                        tokens.iter().any(|t| t.text == *word),
                    );
                }
            }
            PhraseTrack::Generic {
                min_head_coverage,
                min_function_words,
                require_verb,
                ..
            } => {
                let m = metrics_from_tokens(head_len, tokens);
                checks.insert("head_coverage".to_string(), m.coverage >= *min_head_coverage);
                checks.insert(
                    "function_words".to_string(),
                    m.function_words >= *min_function_words,
                );
                checks.insert("verb".to_string(), !*require_verb || m.has_verb);
            }
        }
        TrackReport {
            name: self.name().to_string(),
            pass: checks.values().all(|&ok| ok),
            checks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackReport {
    pub name: String,
    pub pass: bool,
    pub checks: BTreeMap<String, bool>,
}

/// `phrase_gate_report.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseGateReport {
    pub head_chars: usize,
    pub tracks: Vec<TrackReport>,
    pub accepted_by: Option<String>,
}

impl PhraseGateReport {
    pub fn pass(&self) -> bool {
        self.accepted_by.is_some()
    }
}

/// Tokenize the first `head_chars` symbols of `text` and run every track.
pub fn evaluate(
    tracks: &[PhraseTrack],
    tokenizer: &dyn Tokenizer,
    text: &str,
    head_chars: usize,
) -> PhraseGateReport {
    let head: String = text.chars().take(head_chars).collect();
    let tokens = tokenizer.tokenize(&head);
    let reports: Vec<TrackReport> = tracks
        .iter()
        .map(|t| t.evaluate(&tokens, head.len()))
        .collect();
    let accepted_by = reports.iter().find(|r| r.pass).map(|r| r.name.clone());
    PhraseGateReport {
        head_chars,
        tracks: reports,
        accepted_by,
    }
}
