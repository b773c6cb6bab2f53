//! The confirmation state machine.
//!
//! `RoundTrip -> NearGate -> PhraseGate -> NullTest -> Publishable | Rejected`,
//! stopping at the first stage that fails. Every rejection carries a
//! structured reason and whatever reports were produced up to that point.
//!
//! The round-trip stage also re-derives the anchor slots from the configured
//! anchors and requires the candidate's wheels to agree with them. Those
//! slots, and only those, are held fixed by the null test.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use wheel_core::{
    render, Ciphertext, ForcedSlot, Permutation, PermutationSpec, Schedule, SlotDisagreement,
    WheelError,
};
use wheel_solver::{
    verify, ClassConfig, ConstraintSet, Infeasibility, RoundTrip, ScheduleVerdict, Solver,
};

use crate::config::WorkbenchConfig;
use crate::holm::HolmReport;
use crate::lexicon::{LexicalMetrics, Lexicon, Tokenizer};
use crate::near_gate::NearGateReport;
use crate::null_test::{NullTest, NullTestResult};
use crate::phrase_gate::{self, PhraseGateReport};
use crate::ConfirmError;

/// A candidate as handed over by the solver or an authored batch file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub label: String,
    /// Uppercase letters, one per ciphertext position.
    pub plaintext: String,
    pub schedule: Schedule,
    pub permutation: PermutationSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    RoundTrip,
    NearGate,
    PhraseGate,
    NullTest,
    Publishable,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::RoundTrip => "ROUND_TRIP",
            Stage::NearGate => "NEAR_GATE",
            Stage::PhraseGate => "PHRASE_GATE",
            Stage::NullTest => "NULL_TEST",
            Stage::Publishable => "PUBLISHABLE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum RejectReason {
    /// Forward encryption does not reproduce the ciphertext.
    RoundTrip(RoundTrip),
    /// The candidate's configuration cannot satisfy the anchors at all.
    Infeasible(Infeasibility),
    /// A wheel slot pinned by an anchor carries a different key.
    AnchorMismatch(SlotDisagreement),
    NearGate,
    PhraseGate,
    /// At least one Holm-adjusted p-value is not below alpha.
    NotSignificant,
    /// Candidate-local error such as a length mismatch.
    Fatal(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::RoundTrip(rt) => write!(f, "round trip failed: {}", rt),
            RejectReason::Infeasible(why) => write!(f, "anchors infeasible: {}", why),
            RejectReason::AnchorMismatch(d) => write!(f, "anchor mismatch: {}", d),
            RejectReason::NearGate => f.write_str("near-gate thresholds not met"),
            RejectReason::PhraseGate => f.write_str("no phrase track accepted"),
            RejectReason::NotSignificant => f.write_str("not significant after Holm correction"),
            RejectReason::Fatal(e) => write!(f, "fatal: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "why", rename_all = "snake_case")]
pub enum Verdict {
    Publishable,
    Rejected(RejectReason),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationOutcome {
    pub label: String,
    /// Stage at which the candidate stopped.
    pub stage: Stage,
    pub verdict: Verdict,
    /// Anchor-derived slots held by the null test.
    pub forced: Vec<ForcedSlot>,
    pub near: Option<NearGateReport>,
    pub phrase: Option<PhraseGateReport>,
    pub null: Option<NullTestResult>,
    pub holm: Option<HolmReport>,
}

impl ConfirmationOutcome {
    fn start(label: &str) -> Self {
        ConfirmationOutcome {
            label: label.to_string(),
            stage: Stage::RoundTrip,
            verdict: Verdict::Rejected(RejectReason::Fatal("not evaluated".into())),
            forced: Vec::new(),
            near: None,
            phrase: None,
            null: None,
            holm: None,
        }
    }

    fn reject(mut self, reason: RejectReason) -> Self {
        info!(label = %self.label, stage = %self.stage, %reason, "candidate rejected");
        self.verdict = Verdict::Rejected(reason);
        self
    }

    pub fn is_publishable(&self) -> bool {
        matches!(self.verdict, Verdict::Publishable)
    }

    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match &self.verdict {
            Verdict::Rejected(r) => Some(r),
            Verdict::Publishable => None,
        }
    }
}

/// Coarse cancellation, honoured between candidates only.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs candidates against one ciphertext under one configuration.
pub struct Confirmer<'a> {
    ciphertext: &'a Ciphertext,
    config: &'a WorkbenchConfig,
    lexicon: &'a dyn Lexicon,
    tokenizer: &'a dyn Tokenizer,
}

impl<'a> Confirmer<'a> {
    pub fn new(
        ciphertext: &'a Ciphertext,
        config: &'a WorkbenchConfig,
        lexicon: &'a dyn Lexicon,
        tokenizer: &'a dyn Tokenizer,
    ) -> Self {
        Confirmer {
            ciphertext,
            config,
            lexicon,
            tokenizer,
        }
    }

    pub fn config(&self) -> &WorkbenchConfig {
        self.config
    }

    /// Walk one candidate through every stage.
    ///
    /// Errors are candidate-fatal (length mismatch, bad symbols) or, for a
    /// malformed permutation, batch-fatal; see [`ConfirmError::is_authoring_bug`].
    pub fn confirm(&self, candidate: &Candidate) -> Result<ConfirmationOutcome, ConfirmError> {
        let perm = candidate.permutation.build()?;
        let n = self.ciphertext.len();
        let every: Vec<usize> = (0..perm.len()).collect();
        perm.check_left_inverse(&every)?;
        let plaintext = wheel_core::parse_text(&candidate.plaintext)?;
        if plaintext.len() != n {
            return Err(WheelError::LengthMismatch {
                what: "plaintext",
                expected: n,
                found: plaintext.len(),
            }
            .into());
        }
        self.confirm_parsed(&candidate.label, &plaintext, &candidate.schedule, &perm)
    }

    pub fn confirm_parsed(
        &self,
        label: &str,
        plaintext: &[u8],
        schedule: &Schedule,
        perm: &Permutation,
    ) -> Result<ConfirmationOutcome, ConfirmError> {
        schedule.validate()?;
        let mut outcome = ConfirmationOutcome::start(label);

        let rt = verify(plaintext, self.ciphertext, schedule, perm)?;
        if !rt.is_exact() {
            return Ok(outcome.reject(RejectReason::RoundTrip(rt)));
        }
        let held = match self.hold_anchor_slots(schedule, perm)? {
            Ok(held) => held,
            Err(reason) => return Ok(outcome.reject(reason)),
        };
        outcome.forced = held.forced_slots();

        let text = render(plaintext);
        outcome.stage = Stage::NearGate;
        info!(label, stage = %outcome.stage, "entering stage");
        let near = self.config.near_gate.evaluate(self.lexicon, &text);
        outcome.near = Some(near);
        if !near.pass {
            return Ok(outcome.reject(RejectReason::NearGate));
        }

        outcome.stage = Stage::PhraseGate;
        info!(label, stage = %outcome.stage, "entering stage");
        let phrase = phrase_gate::evaluate(
            &self.config.phrase_tracks,
            self.tokenizer,
            &text,
            self.config.head_chars,
        );
        let phrase_pass = phrase.pass();
        outcome.phrase = Some(phrase);
        if !phrase_pass {
            return Ok(outcome.reject(RejectReason::PhraseGate));
        }

        outcome.stage = Stage::NullTest;
        info!(label, stage = %outcome.stage, samples = self.config.null_samples, "entering stage");
        let observed = LexicalMetrics {
            coverage: near.coverage,
            function_words: near.function_words,
            has_verb: near.has_verb,
        };
        let null = NullTest::new(self.ciphertext, &held, perm, self.lexicon)?.run(
            label,
            self.config.master_seed,
            self.config.null_samples,
            &observed,
        )?;
        let holm = HolmReport::from_raw(null.samples, &null.p_values(), self.config.alpha);
        let publishable = holm.publishable;
        outcome.null = Some(null);
        outcome.holm = Some(holm);
        if !publishable {
            return Ok(outcome.reject(RejectReason::NotSignificant));
        }

        outcome.stage = Stage::Publishable;
        outcome.verdict = Verdict::Publishable;
        info!(label, "candidate publishable");
        Ok(outcome)
    }

    /// The candidate schedule with its held slots re-derived from the configured anchors.
    ///
    /// The anchors are solved under the candidate's own per-class
    /// configuration; provenance labels carried by the candidate are ignored.
    fn hold_anchor_slots(
        &self,
        schedule: &Schedule,
        perm: &Permutation,
    ) -> Result<Result<Schedule, RejectReason>, ConfirmError> {
        let constraints =
            ConstraintSet::from_anchors(&self.config.anchors, self.ciphertext.len())?.through(perm)?;
        let solver = Solver::new(
            self.ciphertext,
            schedule.classing,
            &constraints,
            self.config.solver.option_a,
        )?;
        let configs: Vec<ClassConfig> = schedule
            .classes
            .iter()
            .map(|c| ClassConfig::new(c.family, c.period(), c.phase))
            .collect();
        let solved = match solver.validate(&configs)?.verdict {
            ScheduleVerdict::Feasible(solved) => solved,
            ScheduleVerdict::Infeasible { reason, .. } => {
                return Ok(Err(RejectReason::Infeasible(reason)))
            }
        };
        Ok(schedule
            .hold_from(&solved.schedule)
            .map_err(RejectReason::AnchorMismatch))
    }

    /// Confirm candidates in order, checking `cancel` before each one.
    ///
    /// Candidate-local errors become `Fatal` rejections; a malformed
    /// permutation aborts the whole batch.
    pub fn confirm_batch(
        &self,
        candidates: &[Candidate],
        cancel: &CancelFlag,
    ) -> Result<Vec<ConfirmationOutcome>, ConfirmError> {
        let mut outcomes = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if cancel.is_cancelled() {
                warn!(
                    completed = outcomes.len(),
                    remaining = candidates.len() - outcomes.len(),
                    "batch cancelled"
                );
                break;
            }
            match self.confirm(candidate) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) if e.is_authoring_bug() => {
                    warn!(label = %candidate.label, error = %e, "aborting batch");
                    return Err(e);
                }
                Err(e) => {
                    warn!(label = %candidate.label, error = %e, "candidate failed");
                    outcomes.push(
                        ConfirmationOutcome::start(&candidate.label)
                            .reject(RejectReason::Fatal(e.to_string())),
                    );
                }
            }
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WordListLexicon;
    use wheel_core::{Anchor, CipherFamily, ClassKey, Classing, Provenance, Wheel};
    use wheel_solver::encrypt;

    fn schedule() -> Schedule {
        let key = ClassKey {
            family: CipherFamily::Vigenere,
            phase: 0,
            wheel: Wheel::from_keys(&[3, 1, 4]).unwrap(),
        };
        Schedule::new(Classing::Single, vec![key]).unwrap()
    }

    fn setup(plain: &str) -> (Ciphertext, Candidate) {
        let perm = Permutation::identity(plain.len());
        let symbols = wheel_core::parse_text(plain).unwrap();
        let ct = Ciphertext::from_symbols(encrypt(&symbols, &schedule(), &perm).unwrap()).unwrap();
        let candidate = Candidate {
            label: "c1".into(),
            plaintext: plain.into(),
            schedule: schedule(),
            permutation: perm.to_spec(),
        };
        (ct, candidate)
    }

    fn lexicon() -> WordListLexicon {
        WordListLexicon::from_slices(&["THE"], &["SET"], &["CLOCK"])
    }

    /// Quick config anchored on "CL" at 6..=7, which pins slots 0 and 1.
    fn anchored_config() -> WorkbenchConfig {
        WorkbenchConfig {
            anchors: vec![Anchor::new("CL", 6, "CL").unwrap()],
            ..WorkbenchConfig::quick()
        }
    }

    /// Passes everything through to a word list, cancelling the batch on first use.
    struct CancellingLexicon {
        inner: WordListLexicon,
        cancel: CancelFlag,
    }

    impl Lexicon for CancellingLexicon {
        fn metrics(&self, text: &str) -> LexicalMetrics {
            self.cancel.cancel();
            self.inner.metrics(text)
        }
    }

    #[test]
    fn test_round_trip_rejection_is_structured() {
        let (ct, mut candidate) = setup("SETTHECLOCK");
        candidate.plaintext = "SETTHECLOCX".into();
        let config = anchored_config();
        let lex = lexicon();
        let outcome = Confirmer::new(&ct, &config, &lex, &lex)
            .confirm(&candidate)
            .unwrap();
        assert_eq!(outcome.stage, Stage::RoundTrip);
        match outcome.reject_reason() {
            Some(RejectReason::RoundTrip(RoundTrip::Mismatch { index, .. })) => {
                assert_eq!(*index, 10)
            }
            other => panic!("expected round-trip rejection, got {:?}", other),
        }
        assert!(outcome.near.is_none());
    }

    #[test]
    fn test_near_gate_short_circuits() {
        let (ct, candidate) = setup("SETTHECLOCK");
        let mut config = anchored_config();
        config.near_gate.min_function_words = 5;
        let lex = lexicon();
        let outcome = Confirmer::new(&ct, &config, &lex, &lex)
            .confirm(&candidate)
            .unwrap();
        assert_eq!(outcome.stage, Stage::NearGate);
        assert_eq!(outcome.reject_reason(), Some(&RejectReason::NearGate));
        assert!(outcome.phrase.is_none());
        assert!(outcome.holm.is_none());
    }

    #[test]
    fn test_phrase_gate_rejection_keeps_near_report() {
        let (ct, candidate) = setup("SETTHECLOCK");
        let mut config = anchored_config();
        config.near_gate.min_function_words = 1;
        config.phrase_tracks = vec![crate::PhraseTrack::default_strict()];
        let lex = lexicon();
        let outcome = Confirmer::new(&ct, &config, &lex, &lex)
            .confirm(&candidate)
            .unwrap();
        assert_eq!(outcome.stage, Stage::PhraseGate);
        assert_eq!(outcome.reject_reason(), Some(&RejectReason::PhraseGate));
        assert!(outcome.near.unwrap().pass);
        assert_eq!(outcome.phrase.unwrap().accepted_by, None);
    }

    #[test]
    fn test_length_mismatch_is_candidate_local() {
        let (ct, mut short) = setup("SETTHECLOCK");
        short.plaintext = "SETTHE".into();
        let (_, good) = setup("SETTHECLOCK");
        let config = anchored_config();
        let lex = lexicon();
        let confirmer = Confirmer::new(&ct, &config, &lex, &lex);
        let outcomes = confirmer
            .confirm_batch(&[short, good], &CancelFlag::new())
            .unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0].reject_reason(), Some(RejectReason::Fatal(_))));
        assert!(!matches!(outcomes[1].reject_reason(), Some(RejectReason::Fatal(_))));
    }

    #[test]
    fn test_malformed_schedule_is_candidate_local() {
        let (ct, good) = setup("SETTHECLOCK");
        let mut short_classing = good.clone();
        short_classing.label = "one-class-triad".into();
        short_classing.schedule.classing = Classing::ParityTriad;
        let mut empty_wheel = good.clone();
        empty_wheel.label = "empty-wheel".into();
        empty_wheel.schedule.classes[0].wheel =
            serde_json::from_str(r#"{"keys":[],"provenance":[]}"#).unwrap();
        let mut ragged_wheel = good.clone();
        ragged_wheel.label = "ragged-wheel".into();
        ragged_wheel.schedule.classes[0].wheel =
            serde_json::from_str(r#"{"keys":[3,1,4],"provenance":["free"]}"#).unwrap();

        let config = anchored_config();
        let lex = lexicon();
        let outcomes = Confirmer::new(&ct, &config, &lex, &lex)
            .confirm_batch(&[short_classing, empty_wheel, ragged_wheel, good], &CancelFlag::new())
            .unwrap();
        assert_eq!(outcomes.len(), 4);
        for bad in &outcomes[..3] {
            assert!(
                matches!(bad.reject_reason(), Some(RejectReason::Fatal(_))),
                "{} got {:?}",
                bad.label,
                bad.reject_reason()
            );
        }
        assert!(!matches!(outcomes[3].reject_reason(), Some(RejectReason::Fatal(_))));
        assert!(outcomes[3].near.is_some());
    }

    #[test]
    fn test_held_slots_come_from_anchors_not_labels() {
        let (ct, mut candidate) = setup("SETTHECLOCK");
        for slot in 0..3 {
            let key = candidate.schedule.classes[0].wheel.get(slot).unwrap();
            candidate.schedule.classes[0]
                .wheel
                .set(slot, key, Provenance::Forced)
                .unwrap();
        }
        let config = anchored_config();
        let lex = lexicon();
        let outcome = Confirmer::new(&ct, &config, &lex, &lex)
            .confirm(&candidate)
            .unwrap();
        // "CL" at 6..=7 lands on slots 0 and 1; the label on slot 2 is dropped
        let slots: Vec<usize> = outcome.forced.iter().map(|f| f.residue).collect();
        assert_eq!(slots, vec![0, 1]);
    }

    #[test]
    fn test_anchor_mismatch_rejected_at_round_trip() {
        let (ct, candidate) = setup("SETTHECLOCK");
        let mut config = anchored_config();
        config.anchors = vec![Anchor::new("CX", 6, "CX").unwrap()];
        let lex = lexicon();
        let outcome = Confirmer::new(&ct, &config, &lex, &lex)
            .confirm(&candidate)
            .unwrap();
        assert_eq!(outcome.stage, Stage::RoundTrip);
        match outcome.reject_reason() {
            Some(RejectReason::AnchorMismatch(d)) => {
                assert_eq!((d.class, d.slot), (0, 1));
                assert_eq!(d.found, Some(1));
            }
            other => panic!("expected anchor mismatch, got {:?}", other),
        }
        assert!(outcome.near.is_none());
    }

    #[test]
    fn test_malformed_permutation_aborts_batch() {
        let (ct, good) = setup("SETTHECLOCK");
        let mut bad = good.clone();
        bad.permutation = PermutationSpec {
            id: "broken".into(),
            n: 11,
            fixed: (0..9).collect(),
            movable: vec![9, 10],
            destinations: vec![9, 9],
        };
        let config = anchored_config();
        let lex = lexicon();
        let err = Confirmer::new(&ct, &config, &lex, &lex)
            .confirm_batch(&[good, bad], &CancelFlag::new())
            .unwrap_err();
        assert!(err.is_authoring_bug());
    }

    #[test]
    fn test_cancel_before_batch() {
        let (ct, good) = setup("SETTHECLOCK");
        let config = anchored_config();
        let lex = lexicon();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let outcomes = Confirmer::new(&ct, &config, &lex, &lex)
            .confirm_batch(&[good], &cancel)
            .unwrap();
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_cancel_mid_batch_keeps_finished_outcome() {
        let (ct, first) = setup("SETTHECLOCK");
        let mut second = first.clone();
        second.label = "c2".into();
        let config = anchored_config();
        let cancel = CancelFlag::new();
        let words = lexicon();
        let lex = CancellingLexicon {
            inner: lexicon(),
            cancel: cancel.clone(),
        };
        let outcomes = Confirmer::new(&ct, &config, &lex, &words)
            .confirm_batch(&[first, second], &cancel)
            .unwrap();
        assert!(cancel.is_cancelled());
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].label, "c1");
        assert!(outcomes[0].near.is_some());
        assert!(!matches!(outcomes[0].reject_reason(), Some(RejectReason::Fatal(_))));
    }

    #[test]
    fn test_reject_reason_serializes_with_tag() {
        let v = serde_json::to_value(Verdict::Rejected(RejectReason::NotSignificant)).unwrap();
        assert_eq!(v["verdict"], "rejected");
        assert_eq!(v["why"]["reason"], "not_significant");
    }
}
