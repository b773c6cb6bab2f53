//! Run-wide configuration, passed by reference to every stage.

use serde::{Deserialize, Serialize};
use std::path::Path;

use wheel_core::{k4_anchors, Anchor, SolverConfig, WheelError};
use wheel_solver::ConstraintSet;

use crate::near_gate::NearGateThresholds;
use crate::phrase_gate::PhraseTrack;
use crate::ConfirmError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbenchConfig {
    /// Root of every per-candidate seed.
    pub master_seed: u64,
    /// Null samples per candidate (K).
    pub null_samples: usize,
    /// Every Holm-adjusted p-value must fall below this.
    pub alpha: f64,
    /// Symbols of plaintext the phrase-gate looks at.
    pub head_chars: usize,
    /// Known plaintext spans; the null test holds exactly the slots they force.
    pub anchors: Vec<Anchor>,
    /// Option-A policy applied when re-deriving anchor slots.
    pub solver: SolverConfig,
    pub near_gate: NearGateThresholds,
    pub phrase_tracks: Vec<PhraseTrack>,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        WorkbenchConfig::full()
    }
}

impl WorkbenchConfig {
    /// Quick configuration for testing.
    pub fn quick() -> Self {
        WorkbenchConfig {
            null_samples: 500,
            ..WorkbenchConfig::full()
        }
    }

    /// Full configuration for production runs.
    pub fn full() -> Self {
        WorkbenchConfig {
            master_seed: 1337,
            null_samples: 10_000,
            alpha: 0.01,
            head_chars: 75,
            anchors: k4_anchors(),
            solver: SolverConfig::default(),
            near_gate: NearGateThresholds::default(),
            phrase_tracks: vec![PhraseTrack::default_strict(), PhraseTrack::default_generic()],
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfirmError> {
        let raw = std::fs::read_to_string(path).map_err(|e| WheelError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: WorkbenchConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfirmError> {
        if self.null_samples == 0 {
            return Err(ConfirmError::Config("null_samples must be at least 1".into()));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(ConfirmError::Config(format!(
                "alpha must be in (0, 1], got {}",
                self.alpha
            )));
        }
        if self.head_chars == 0 {
            return Err(ConfirmError::Config("head_chars must be at least 1".into()));
        }
        if self.phrase_tracks.is_empty() {
            return Err(ConfirmError::Config("at least one phrase track is required".into()));
        }
        let span = self
            .anchors
            .iter()
            .map(|a| a.end.saturating_add(1))
            .max()
            .unwrap_or(0);
        ConstraintSet::from_anchors(&self.anchors, span)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quick_and_full() {
        assert_eq!(WorkbenchConfig::quick().null_samples, 500);
        assert_eq!(WorkbenchConfig::full().null_samples, 10_000);
        assert_eq!(WorkbenchConfig::default().alpha, 0.01);
        assert_eq!(WorkbenchConfig::default().head_chars, 75);
        assert!(WorkbenchConfig::quick().validate().is_ok());
    }

    #[test]
    fn test_load_partial_json_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"master_seed": 7, "null_samples": 64}"#).unwrap();
        let c = WorkbenchConfig::load(&path).unwrap();
        assert_eq!(c.master_seed, 7);
        assert_eq!(c.null_samples, 64);
        assert_eq!(c.phrase_tracks.len(), 2);
        assert_eq!(c.anchors, k4_anchors());
    }

    #[test]
    fn test_round_trips_through_json() {
        let c = WorkbenchConfig::quick();
        let json = serde_json::to_string_pretty(&c).unwrap();
        let back: WorkbenchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.null_samples, c.null_samples);
        assert_eq!(back.solver, c.solver);
        assert_eq!(back.phrase_tracks[0], c.phrase_tracks[0]);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut c = WorkbenchConfig::quick();
        c.null_samples = 0;
        assert!(c.validate().is_err());
        let mut c = WorkbenchConfig::quick();
        c.alpha = 0.0;
        assert!(c.validate().is_err());
        let mut c = WorkbenchConfig::quick();
        c.anchors.push(Anchor::new("OVERLAP", 30, "EASTNORTH").unwrap());
        assert!(matches!(
            c.validate(),
            Err(ConfirmError::Wheel(WheelError::OverlappingAnchors { .. }))
        ));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = WorkbenchConfig::load(Path::new("/nonexistent/workbench.json")).unwrap_err();
        assert!(matches!(err, ConfirmError::Wheel(WheelError::Config { .. })));
    }
}
