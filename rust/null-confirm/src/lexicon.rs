//! Tokenizer and lexicon collaborators.
//!
//! The confirmation pipeline treats lexical scoring as opaque: it needs an
//! ordered token stream with class labels and three metrics (coverage,
//! function-word count, verb presence). [`WordListLexicon`] is a reference
//! implementation over caller-supplied word lists using greedy longest-match
//! segmentation of unspaced uppercase text.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::ConfirmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenClass {
    Function,
    Verb,
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub class: TokenClass,
    /// Offset of the first symbol in the source text.
    pub start: usize,
}

/// Text to ordered, class-labelled tokens.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LexicalMetrics {
    /// Fraction of symbols covered by recognised tokens, in `[0, 1]`.
    pub coverage: f64,
    pub function_words: usize,
    pub has_verb: bool,
}

/// Text to lexical metrics.
pub trait Lexicon: Send + Sync {
    fn metrics(&self, text: &str) -> LexicalMetrics;
}

/// Compute metrics from any tokenizer's output.
pub fn metrics_from_tokens(text_len: usize, tokens: &[Token]) -> LexicalMetrics {
    let covered: usize = tokens.iter().map(|t| t.text.len()).sum();
    LexicalMetrics {
        coverage: if text_len == 0 {
            0.0
        } else {
            covered as f64 / text_len as f64
        },
        function_words: tokens.iter().filter(|t| t.class == TokenClass::Function).count(),
        has_verb: tokens.iter().any(|t| t.class == TokenClass::Verb),
    }
}

/// Word lists as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordLists {
    #[serde(default)]
    pub function: Vec<String>,
    #[serde(default)]
    pub verbs: Vec<String>,
    #[serde(default)]
    pub content: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct WordListLexicon {
    words: HashMap<String, TokenClass>,
    max_len: usize,
}

impl WordListLexicon {
    /// Later lists do not override earlier ones: function beats verb beats content.
    pub fn new(lists: &WordLists) -> Self {
        let mut words = HashMap::new();
        let mut max_len = 0;
        let groups = [
            (&lists.function, TokenClass::Function),
            (&lists.verbs, TokenClass::Verb),
            (&lists.content, TokenClass::Content),
        ];
        for (list, class) in groups {
            for w in list {
                let w = w.trim().to_ascii_uppercase();
                if w.is_empty() || !w.bytes().all(|b| b.is_ascii_uppercase()) {
                    continue;
                }
                max_len = max_len.max(w.len());
                words.entry(w).or_insert(class);
            }
        }
        WordListLexicon { words, max_len }
    }

    pub fn from_slices(function: &[&str], verbs: &[&str], content: &[&str]) -> Self {
        let own = |s: &[&str]| -> Vec<String> { s.iter().map(|w| w.to_string()).collect() };
        Self::new(&WordLists {
            function: own(function),
            verbs: own(verbs),
            content: own(content),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfirmError> {
        let raw = std::fs::read_to_string(path)?;
        let lists: WordLists = serde_json::from_str(&raw)?;
        Ok(Self::new(&lists))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn class_of(&self, word: &str) -> Option<TokenClass> {
        self.words.get(word).copied()
    }
}

impl Tokenizer for WordListLexicon {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let bytes = text.as_bytes();
        let mut tokens = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            let longest = self.max_len.min(bytes.len() - i);
            let hit = (1..=longest).rev().find_map(|len| {
                std::str::from_utf8(&bytes[i..i + len])
                    .ok()
                    .and_then(|w| self.words.get(w).map(|&class| (w, class)))
            });
            match hit {
                Some((w, class)) => {
                    tokens.push(Token {
                        text: w.to_string(),
                        class,
                        start: i,
                    });
                    i += w.len();
                }
                None => i += 1,
            }
        }
        tokens
    }
}

impl Lexicon for WordListLexicon {
    fn metrics(&self, text: &str) -> LexicalMetrics {
        metrics_from_tokens(text.len(), &self.tokenize(text))
    }
}
