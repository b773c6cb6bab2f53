//! Per-candidate artifact files and their hash manifest.
//!
//! Nothing is written until the candidate's outcome is complete. JSON goes
//! through `to_string_pretty` with a trailing newline; every map is a
//! `BTreeMap` so reruns produce byte-identical files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use wheel_core::{render, sha256_hex, CipherFamily, Ciphertext, ForcedSlot, Schedule};

use crate::holm::HolmReport;
use crate::near_gate::NearGateReport;
use crate::phrase_gate::PhraseGateReport;
use crate::pipeline::ConfirmationOutcome;
use crate::ConfirmError;

pub const PROOF_DIGEST: &str = "proof_digest.json";
pub const NEAR_GATE_REPORT: &str = "near_gate_report.json";
pub const PHRASE_GATE_REPORT: &str = "phrase_gate_report.json";
pub const HOLM_REPORT: &str = "holm_report_canonical.json";
pub const COVERAGE_REPORT: &str = "coverage_report.json";
pub const HASHES: &str = "hashes.txt";

pub fn plaintext_file_name(n: usize) -> String {
    format!("plaintext_{}.txt", n)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    pub class: usize,
    pub family: CipherFamily,
    pub period: usize,
    pub phase: usize,
}

/// `proof_digest.json`: the schedule descriptor plus content hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofDigest {
    pub classing: String,
    pub classes: Vec<ClassDescriptor>,
    pub forced: Vec<ForcedSlot>,
    pub permutation_id: String,
    pub ciphertext_sha256: String,
    pub plaintext_sha256: String,
}

impl ProofDigest {
    pub fn new(
        ciphertext: &Ciphertext,
        plaintext: &[u8],
        schedule: &Schedule,
        forced: Vec<ForcedSlot>,
        permutation_id: &str,
    ) -> Self {
        ProofDigest {
            classing: schedule.classing.id(),
            classes: schedule
                .classes
                .iter()
                .enumerate()
                .map(|(class, c)| ClassDescriptor {
                    class,
                    family: c.family,
                    period: c.period(),
                    phase: c.phase,
                })
                .collect(),
            forced,
            permutation_id: permutation_id.to_string(),
            ciphertext_sha256: ciphertext.sha256(),
            plaintext_sha256: sha256_hex(render(plaintext).as_bytes()),
        }
    }
}

/// `coverage_report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub label: String,
    pub publishable: bool,
    pub stage: String,
    pub permutation_id: String,
    pub classing: String,
    pub ciphertext_sha256: String,
    pub plaintext_sha256: String,
    pub coverage: f64,
    pub function_words: usize,
    pub has_verb: bool,
    pub accepted_by: Option<String>,
    pub null_samples: usize,
    /// Report name to file name.
    pub reports: BTreeMap<String, String>,
}

/// Everything needed to write one candidate's artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub label: String,
    pub plaintext: Vec<u8>,
    pub digest: ProofDigest,
    pub near: NearGateReport,
    pub phrase: PhraseGateReport,
    pub holm: HolmReport,
    pub publishable: bool,
    pub stage: String,
}

impl ArtifactBundle {
    /// Requires an outcome that reached the null test. The forced list is the
    /// anchor-derived one recorded on the outcome, not the candidate's labels.
    pub fn from_outcome(
        outcome: &ConfirmationOutcome,
        ciphertext: &Ciphertext,
        plaintext: &[u8],
        schedule: &Schedule,
        permutation_id: &str,
    ) -> Result<Self, ConfirmError> {
        let incomplete = || ConfirmError::IncompleteOutcome {
            label: outcome.label.clone(),
            stage: outcome.stage.to_string(),
        };
        Ok(ArtifactBundle {
            label: outcome.label.clone(),
            plaintext: plaintext.to_vec(),
            digest: ProofDigest::new(
                ciphertext,
                plaintext,
                schedule,
                outcome.forced.clone(),
                permutation_id,
            ),
            near: outcome.near.ok_or_else(incomplete)?,
            phrase: outcome.phrase.clone().ok_or_else(incomplete)?,
            holm: outcome.holm.clone().ok_or_else(incomplete)?,
            publishable: outcome.is_publishable(),
            stage: outcome.stage.to_string(),
        })
    }

    fn coverage_report(&self) -> CoverageReport {
        let mut reports = BTreeMap::new();
        reports.insert("plaintext".to_string(), plaintext_file_name(self.plaintext.len()));
        reports.insert("proof_digest".to_string(), PROOF_DIGEST.to_string());
        reports.insert("near_gate".to_string(), NEAR_GATE_REPORT.to_string());
        reports.insert("phrase_gate".to_string(), PHRASE_GATE_REPORT.to_string());
        reports.insert("holm".to_string(), HOLM_REPORT.to_string());
        CoverageReport {
            label: self.label.clone(),
            publishable: self.publishable,
            stage: self.stage.clone(),
            permutation_id: self.digest.permutation_id.clone(),
            classing: self.digest.classing.clone(),
            ciphertext_sha256: self.digest.ciphertext_sha256.clone(),
            plaintext_sha256: self.digest.plaintext_sha256.clone(),
            coverage: self.near.coverage,
            function_words: self.near.function_words,
            has_verb: self.near.has_verb,
            accepted_by: self.phrase.accepted_by.clone(),
            null_samples: self.holm.samples,
            reports,
        }
    }
}

fn pretty<T: Serialize>(value: &T) -> Result<String, ConfirmError> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}

/// Write every artifact into `dir` (created if needed) and finish with `hashes.txt`.
///
/// Returns file name to SHA-256 hex for every file listed in `hashes.txt`.
pub fn write_artifacts(
    dir: &Path,
    bundle: &ArtifactBundle,
) -> Result<BTreeMap<String, String>, ConfirmError> {
    let mut files: BTreeMap<String, String> = BTreeMap::new();
    files.insert(
        plaintext_file_name(bundle.plaintext.len()),
        format!("{}\n", render(&bundle.plaintext)),
    );
    files.insert(PROOF_DIGEST.to_string(), pretty(&bundle.digest)?);
    files.insert(NEAR_GATE_REPORT.to_string(), pretty(&bundle.near)?);
    files.insert(PHRASE_GATE_REPORT.to_string(), pretty(&bundle.phrase)?);
    files.insert(HOLM_REPORT.to_string(), pretty(&bundle.holm)?);
    files.insert(COVERAGE_REPORT.to_string(), pretty(&bundle.coverage_report())?);

    std::fs::create_dir_all(dir)?;
    let mut hashes = BTreeMap::new();
    for (name, contents) in &files {
        std::fs::write(dir.join(name), contents)?;
        hashes.insert(name.clone(), sha256_hex(contents.as_bytes()));
    }

    let manifest: String = hashes
        .iter()
        .map(|(name, hash)| format!("{}  {}\n", hash, name))
        .collect();
    std::fs::write(dir.join(HASHES), manifest)?;

    info!(label = %bundle.label, dir = %dir.display(), files = hashes.len(), "artifacts written");
    Ok(hashes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holm::MetricP;
    use wheel_core::{ClassKey, Classing, Provenance, Wheel};

    fn bundle() -> ArtifactBundle {
        let mut key = ClassKey {
            family: CipherFamily::Beaufort,
            phase: 2,
            wheel: Wheel::from_keys(&[1, 2, 3]).unwrap(),
        };
        key.wheel.set(0, 1, Provenance::Forced).unwrap();
        let schedule = Schedule::new(Classing::Single, vec![key]).unwrap();
        let ct = Ciphertext::parse("ABCD").unwrap();
        let plaintext = vec![3, 2, 1, 0];
        let mut metrics = BTreeMap::new();
        metrics.insert(
            "coverage".to_string(),
            MetricP {
                p_raw: 0.5,
                p_holm: 1.0,
            },
        );
        ArtifactBundle {
            label: "t".into(),
            digest: ProofDigest::new(&ct, &plaintext, &schedule, schedule.forced_slots(), "identity"),
            plaintext,
            near: NearGateReport {
                coverage: 0.5,
                function_words: 1,
                has_verb: false,
                pass: false,
            },
            phrase: PhraseGateReport {
                head_chars: 75,
                tracks: Vec::new(),
                accepted_by: None,
            },
            holm: HolmReport {
                samples: 10,
                metrics,
                publishable: false,
            },
            publishable: false,
            stage: "NULL_TEST".into(),
        }
    }

    #[test]
    fn test_digest_lists_forced_triples() {
        let b = bundle();
        assert_eq!(b.digest.classing, "single");
        assert_eq!(
            b.digest.forced,
            vec![ForcedSlot {
                class: 0,
                residue: 0,
                key: 1
            }]
        );
        assert_eq!(b.digest.classes[0].period, 3);
        assert_eq!(b.digest.plaintext_sha256, sha256_hex(b"DCBA"));
    }

    #[test]
    fn test_write_artifacts_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let hashes = write_artifacts(dir.path(), &bundle()).unwrap();
        assert_eq!(hashes.len(), 6);
        assert!(!hashes.contains_key(HASHES));

        let plain = std::fs::read_to_string(dir.path().join("plaintext_4.txt")).unwrap();
        assert_eq!(plain, "DCBA\n");

        let manifest = std::fs::read_to_string(dir.path().join(HASHES)).unwrap();
        let lines: Vec<&str> = manifest.lines().collect();
        assert_eq!(lines.len(), 6);
        let mut names: Vec<&str> = lines.iter().map(|l| l.split("  ").nth(1).unwrap()).collect();
        let sorted = {
            let mut s = names.clone();
            s.sort();
            s
        };
        assert_eq!(names, sorted);
        names.dedup();
        assert_eq!(names.len(), 6);

        for line in lines {
            let (hash, name) = line.split_once("  ").unwrap();
            let bytes = std::fs::read(dir.path().join(name)).unwrap();
            assert_eq!(sha256_hex(&bytes), hash);
        }

        let holm: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(HOLM_REPORT)).unwrap(),
        )
        .unwrap();
        assert_eq!(holm["K"], 10);
    }

    #[test]
    fn test_rewrite_is_byte_identical() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        assert_eq!(
            write_artifacts(a.path(), &bundle()).unwrap(),
            write_artifacts(b.path(), &bundle()).unwrap()
        );
    }
}
