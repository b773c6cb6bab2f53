//! null-confirm: statistical confirmation of wheel-cipher candidates.
//!
//! A candidate plaintext that survives forward verification walks a fixed
//! state machine: near-gate (lexical thresholds), phrase-gate (structural
//! templates over the head window), then a null-hypothesis test that redraws
//! every unconstrained wheel slot thousands of times and compares metrics.
//! Holm-corrected p-values below alpha make the candidate publishable.

pub mod artifacts;
pub mod config;
pub mod holm;
pub mod lexicon;
pub mod near_gate;
pub mod phrase_gate;
pub mod pipeline;

pub use artifacts::{write_artifacts, ArtifactBundle, ProofDigest};
pub use config::WorkbenchConfig;
pub use holm::{holm_adjust, HolmReport, MetricP};
pub use lexicon::{
    metrics_from_tokens, LexicalMetrics, Lexicon, Token, TokenClass, Tokenizer, WordListLexicon,
    WordLists,
};
pub use near_gate::{NearGateReport, NearGateThresholds};
pub use null_test::{candidate_seed, trial_seed, NullTest, NullTestResult};
pub use phrase_gate::{PhraseGateReport, PhraseTrack, TemplateSlot, TrackReport};
pub use pipeline::{
    Candidate, CancelFlag, ConfirmationOutcome, Confirmer, RejectReason, Stage, Verdict,
};

use wheel_core::WheelError;

#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    #[error(transparent)]
    Wheel(#[from] WheelError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("candidate {label} stopped at {stage}; artifacts need every report")]
    IncompleteOutcome { label: String, stage: String },
}

impl ConfirmError {
    /// Upstream data bugs that must abort a batch rather than one candidate.
    pub fn is_authoring_bug(&self) -> bool {
        matches!(self, ConfirmError::Wheel(e) if e.is_authoring_bug())
    }
}
