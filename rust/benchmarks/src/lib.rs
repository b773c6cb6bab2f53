//! Shared fixtures for the benches, the scaling run and the end-to-end tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use wheel_core::{
    k4_anchors, Ciphertext, Classing, Permutation, Schedule, SearchSpace, SolverConfig, WheelError,
};
use wheel_solver::{derive, solve_anchors};

/// Route transposition over every non-anchor index of the 97-symbol text.
pub fn k4_route() -> Result<Permutation, WheelError> {
    let fixed: Vec<usize> = k4_anchors().iter().flat_map(|a| a.positions()).collect();
    Permutation::columnar("k4-route-w7", 97, 7, &[3, 0, 6, 2, 5, 1, 4], &fixed)
}

/// Solve the published anchors at `period` under the ParityTriad classing.
pub fn k4_solution(period: usize, perm: &Permutation) -> Result<Option<Schedule>, WheelError> {
    let config = SolverConfig {
        search: SearchSpace::fixed_period(period),
        ..SolverConfig::default()
    };
    let outcome = solve_anchors(
        &Ciphertext::k4(),
        &k4_anchors(),
        Classing::ParityTriad,
        perm,
        &config,
    )?;
    Ok(outcome.verdict.into_feasible().map(|s| s.schedule))
}

/// Period-17 anchor solution with every free slot drawn from `seed`.
pub fn k4_complete(seed: u64, perm: &Permutation) -> Result<Option<Schedule>, WheelError> {
    let mut rng = StdRng::seed_from_u64(seed);
    Ok(k4_solution(17, perm)?.map(|mut schedule| {
        schedule.fill_missing(|_, _| rng.gen_range(0..26u8));
        schedule
    }))
}

/// Full plaintext of the ciphertext under a complete schedule.
pub fn k4_plaintext(schedule: &Schedule, perm: &Permutation) -> Result<Vec<u8>, WheelError> {
    let derived = derive(&Ciphertext::k4(), schedule, perm)?;
    let missing = schedule.first_missing().unwrap_or((0, 0));
    derived.complete().ok_or(WheelError::IncompleteSchedule {
        class: missing.0,
        slot: missing.1,
    })
}
