//! wheel-solver: keyed polyalphabetic wheel solving over a classed, periodic key.
//!
//! Given a ciphertext and known plaintext anchors, the solver derives one
//! wheel per class for each candidate `(family, period, phase)` and rejects
//! configurations with slot collisions or Option-A violations. Feasible
//! schedules feed the deriver (ciphertext to best-effort plaintext) and the
//! forward verifier (candidate plaintext back to the exact ciphertext).

pub mod constraints;
pub mod derive;
pub mod solver;

pub use constraints::{Constraint, ConstraintSet, ConstraintSource};
pub use derive::{derive, derive_with, encrypt, verify, Derived, RoundTrip};
pub use solver::{
    ClassConfig, ClassSolution, ClassVerdict, Infeasibility, ScheduleVerdict, SearchOutcome,
    SolveStats, SolvedSchedule, Solver,
};

use wheel_core::{Anchor, Ciphertext, Classing, Permutation, SolverConfig, WheelError};

/// Search the configured space for a schedule consistent with `anchors`.
///
/// Anchors are given in plaintext coordinates and are carried through `perm`
/// before solving.
pub fn solve_anchors(
    ciphertext: &Ciphertext,
    anchors: &[Anchor],
    classing: Classing,
    perm: &Permutation,
    config: &SolverConfig,
) -> Result<SearchOutcome, WheelError> {
    let constraints = ConstraintSet::from_anchors(anchors, ciphertext.len())?.through(perm)?;
    let solver = Solver::new(ciphertext, classing, &constraints, config.option_a)?;
    solver.search(&config.search)
}

/// Validate a fixed per-class configuration against `anchors`.
pub fn validate_anchors(
    ciphertext: &Ciphertext,
    anchors: &[Anchor],
    classing: Classing,
    perm: &Permutation,
    configs: &[ClassConfig],
    config: &SolverConfig,
) -> Result<SearchOutcome, WheelError> {
    let constraints = ConstraintSet::from_anchors(anchors, ciphertext.len())?.through(perm)?;
    let solver = Solver::new(ciphertext, classing, &constraints, config.option_a)?;
    solver.validate(configs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wheel_core::{k4_anchors, CipherFamily, SearchSpace};

    #[test]
    fn test_solve_anchors_k4_period_17() {
        let ct = Ciphertext::k4();
        let anchors: Vec<Anchor> = k4_anchors().into_iter().take(2).collect();
        let config = SolverConfig {
            search: SearchSpace::fixed_period(17),
            ..SolverConfig::default()
        };
        let outcome = solve_anchors(
            &ct,
            &anchors,
            Classing::ParityTriad,
            &Permutation::identity(97),
            &config,
        )
        .unwrap();
        assert_eq!(outcome.stats.collisions, 0);
        let solved = outcome.verdict.feasible().unwrap();
        assert_eq!(solved.configs[2].family, CipherFamily::Beaufort);
        assert!(solved
            .configs
            .iter()
            .enumerate()
            .filter(|(c, _)| *c != 2)
            .all(|(_, cfg)| cfg.family == CipherFamily::Vigenere));
    }

    #[test]
    fn test_validate_anchors_rejects_overlap() {
        let ct = Ciphertext::k4();
        let anchors = vec![
            Anchor::new("A", 20, "XEAST").unwrap(),
            Anchor::new("B", 24, "TNORTH").unwrap(),
        ];
        let configs = vec![ClassConfig::new(CipherFamily::Beaufort, 17, 0); 6];
        assert!(matches!(
            validate_anchors(
                &ct,
                &anchors,
                Classing::ParityTriad,
                &Permutation::identity(97),
                &configs,
                &SolverConfig::default()
            ),
            Err(WheelError::OverlappingAnchors { .. })
        ));
    }
}
