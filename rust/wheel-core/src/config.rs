//! Solver configuration: Option-A policy and the (family, period, phase) search space.

use serde::{Deserialize, Serialize};

use crate::family::CipherFamily;

/// Which constrained positions Option-A applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionAScope {
    /// Anchor positions only.
    Anchors,
    /// Every constrained position, anchors and extras alike.
    AllConstraints,
}

/// What an Option-A violation does to a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionAMode {
    /// The configuration is infeasible.
    Reject,
    /// The configuration stays feasible but ranks behind any with fewer violations.
    Penalize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionAPolicy {
    pub scope: OptionAScope,
    pub mode: OptionAMode,
}

impl Default for OptionAPolicy {
    fn default() -> Self {
        OptionAPolicy {
            scope: OptionAScope::Anchors,
            mode: OptionAMode::Reject,
        }
    }
}

impl OptionAPolicy {
    /// Whether a constraint of the given kind is subject to Option-A.
    pub fn applies_to(&self, is_anchor: bool) -> bool {
        match self.scope {
            OptionAScope::Anchors => is_anchor,
            OptionAScope::AllConstraints => true,
        }
    }
}

/// Configurations a search may try for every class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSpace {
    /// Families in priority order; earlier wins ties.
    pub families: Vec<CipherFamily>,
    pub periods: Vec<usize>,
    /// Explicit phases, or every phase `0..period` when `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phases: Option<Vec<usize>>,
}

impl Default for SearchSpace {
    fn default() -> Self {
        SearchSpace {
            families: CipherFamily::ALL.to_vec(),
            periods: (1..=26).collect(),
            phases: None,
        }
    }
}

impl SearchSpace {
    /// Single period, phase 0, all families.
    pub fn fixed_period(period: usize) -> Self {
        SearchSpace {
            families: CipherFamily::ALL.to_vec(),
            periods: vec![period],
            phases: Some(vec![0]),
        }
    }

    pub fn phases_for(&self, period: usize) -> Vec<usize> {
        match &self.phases {
            Some(p) => p.iter().copied().filter(|&ph| ph < period).collect(),
            None => (0..period).collect(),
        }
    }

    pub fn family_priority(&self, family: CipherFamily) -> usize {
        self.families
            .iter()
            .position(|&f| f == family)
            .unwrap_or(self.families.len())
    }

    /// Number of (family, period, phase) triples per class.
    pub fn size(&self) -> usize {
        self.families.len()
            * self
                .periods
                .iter()
                .filter(|&&p| p > 0)
                .map(|&p| self.phases_for(p).len())
                .sum::<usize>()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default)]
    pub option_a: OptionAPolicy,
    #[serde(default)]
    pub search: SearchSpace,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_space_size() {
        // 3 families * (1 + 2 + ... + 26) phases
        assert_eq!(SearchSpace::default().size(), 3 * 351);
    }

    #[test]
    fn test_explicit_phases_filtered_by_period() {
        let space = SearchSpace {
            families: vec![CipherFamily::Beaufort],
            periods: vec![2, 5],
            phases: Some(vec![0, 3]),
        };
        assert_eq!(space.phases_for(2), vec![0]);
        assert_eq!(space.phases_for(5), vec![0, 3]);
        assert_eq!(space.size(), 3);
    }

    #[test]
    fn test_family_priority() {
        let space = SearchSpace::default();
        assert_eq!(space.family_priority(CipherFamily::Vigenere), 0);
        assert_eq!(space.family_priority(CipherFamily::VariantBeaufort), 2);
    }

    #[test]
    fn test_option_a_scope() {
        let anchors = OptionAPolicy::default();
        assert!(anchors.applies_to(true));
        assert!(!anchors.applies_to(false));
        let all = OptionAPolicy {
            scope: OptionAScope::AllConstraints,
            mode: OptionAMode::Reject,
        };
        assert!(all.applies_to(false));
    }

    #[test]
    fn test_solver_config_defaults_from_empty_json() {
        let cfg: SolverConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, SolverConfig::default());
    }
}
