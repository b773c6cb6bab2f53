//! Near-gate: conjunctive lexical thresholds.

use serde::{Deserialize, Serialize};

use crate::lexicon::{LexicalMetrics, Lexicon};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearGateThresholds {
    pub min_coverage: f64,
    pub min_function_words: usize,
    pub require_verb: bool,
}

impl Default for NearGateThresholds {
    fn default() -> Self {
        NearGateThresholds {
            min_coverage: 0.85,
            min_function_words: 8,
            require_verb: true,
        }
    }
}

/// `near_gate_report.json`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearGateReport {
    pub coverage: f64,
    pub function_words: usize,
    pub has_verb: bool,
    pub pass: bool,
}

impl NearGateThresholds {
    /// Every threshold must hold at once.
    pub fn accepts(&self, m: &LexicalMetrics) -> bool {
        m.coverage >= self.min_coverage
            && m.function_words >= self.min_function_words
            && (!self.require_verb || m.has_verb)
    }

    pub fn evaluate(&self, lexicon: &dyn Lexicon, text: &str) -> NearGateReport {
        let m = lexicon.metrics(text);
        NearGateReport {
            coverage: m.coverage,
            function_words: m.function_words,
            has_verb: m.has_verb,
            pass: self.accepts(&m),
        }
    }
}
