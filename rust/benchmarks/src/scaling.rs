//! Scaling runs for the solver and the null test.
//!
//! Sweeps every period 1..=26 on the published anchors, recording feasibility
//! and rejection counts per period, then measures null-test throughput for
//! increasing sample counts on a completed period-17 schedule.

use serde::Serialize;
use std::time::Instant;

use benchmarks::{k4_complete, k4_route};
use null_confirm::{HolmReport, LexicalMetrics, NullTest, WordListLexicon};
use wheel_core::{k4_anchors, Ciphertext, Classing, Permutation, SearchSpace, SolverConfig};
use wheel_solver::solve_anchors;

#[derive(Serialize)]
struct PeriodRow {
    period: usize,
    feasible: bool,
    configurations_tried: usize,
    collisions: usize,
    option_a_rejections: usize,
    missing_slots: Option<usize>,
    time_us: u128,
}

#[derive(Serialize)]
struct NullRow {
    samples: usize,
    time_ms: u128,
    samples_per_second: f64,
    holm: HolmReport,
}

#[derive(Serialize)]
struct ScalingResults {
    periods: Vec<PeriodRow>,
    null_batches: Vec<NullRow>,
}

fn sweep_periods() -> Vec<PeriodRow> {
    println!("================================================================");
    println!("  Solver: published anchors, ParityTriad classing, period sweep");
    println!("================================================================\n");
    println!(
        "  {:>6} {:>9} {:>8} {:>10} {:>9} {:>8} {:>10}",
        "period", "feasible", "tried", "collisions", "option_a", "missing", "time_us"
    );
    println!("  {}", "-".repeat(68));

    let ct = Ciphertext::k4();
    let anchors = k4_anchors();
    let perm = Permutation::identity(ct.len());
    let mut rows = Vec::new();

    for period in 1..=26 {
        let config = SolverConfig {
            search: SearchSpace {
                periods: vec![period],
                ..SearchSpace::default()
            },
            ..SolverConfig::default()
        };
        let start = Instant::now();
        let outcome = match solve_anchors(&ct, &anchors, Classing::ParityTriad, &perm, &config) {
            Ok(o) => o,
            Err(e) => {
                println!("  {:>6} ERROR {}", period, e);
                continue;
            }
        };
        let time_us = start.elapsed().as_micros();
        let missing = outcome
            .verdict
            .feasible()
            .map(|s| s.schedule.missing_slots());

        println!(
            "  {:>6} {:>9} {:>8} {:>10} {:>9} {:>8} {:>10}",
            period,
            if outcome.verdict.is_feasible() { "yes" } else { "no" },
            outcome.stats.configurations_tried,
            outcome.stats.collisions,
            outcome.stats.option_a_rejections,
            missing.map(|m| m.to_string()).unwrap_or_else(|| "-".into()),
            time_us
        );
        rows.push(PeriodRow {
            period,
            feasible: outcome.verdict.is_feasible(),
            configurations_tried: outcome.stats.configurations_tried,
            collisions: outcome.stats.collisions,
            option_a_rejections: outcome.stats.option_a_rejections,
            missing_slots: missing,
            time_us,
        });
    }
    println!();
    rows
}

fn null_throughput() -> Vec<NullRow> {
    println!("================================================================");
    println!("  Null test: period-17 schedule through the k4 route");
    println!("================================================================\n");

    let ct = Ciphertext::k4();
    let setup = k4_route().and_then(|perm| k4_complete(2024, &perm).map(|s| (perm, s)));
    let (perm, schedule) = match setup {
        Ok((perm, Some(schedule))) => (perm, schedule),
        Ok((_, None)) => {
            println!("  period 17 infeasible, skipping");
            return Vec::new();
        }
        Err(e) => {
            println!("  setup failed: {}", e);
            return Vec::new();
        }
    };
    let lexicon = WordListLexicon::from_slices(
        &["THE", "AND", "OF", "TO", "IN"],
        &["READ", "SET", "LIES"],
        &["EAST", "NORTHEAST", "BERLIN", "CLOCK", "DIAL"],
    );
    let null = match NullTest::new(&ct, &schedule, &perm, &lexicon) {
        Ok(n) => n,
        Err(e) => {
            println!("  null test rejected: {}", e);
            return Vec::new();
        }
    };
    let observed = LexicalMetrics {
        coverage: 0.4,
        function_words: 2,
        has_verb: true,
    };

    println!(
        "  {:>8} {:>10} {:>14} {:>10} {:>10}",
        "K", "time_ms", "samples/s", "p_cov", "p_fw"
    );
    println!("  {}", "-".repeat(58));

    let mut rows = Vec::new();
    for samples in [100usize, 1_000, 10_000] {
        let start = Instant::now();
        let result = match null.run("scaling", 1337, samples, &observed) {
            Ok(r) => r,
            Err(e) => {
                println!("  {:>8} ERROR {}", samples, e);
                continue;
            }
        };
        let elapsed = start.elapsed();
        let holm = HolmReport::from_raw(samples, &result.p_values(), 0.01);
        let p = |name: &str| holm.metrics.get(name).map(|m| m.p_holm).unwrap_or(f64::NAN);
        let rate = samples as f64 / elapsed.as_secs_f64().max(1e-9);
        println!(
            "  {:>8} {:>10} {:>14.0} {:>10.4} {:>10.4}",
            samples,
            elapsed.as_millis(),
            rate,
            p("coverage"),
            p("function_words")
        );
        rows.push(NullRow {
            samples,
            time_ms: elapsed.as_millis(),
            samples_per_second: rate,
            holm,
        });
    }
    println!();
    rows
}

fn main() {
    println!("================================================================");
    println!("  SCALING: wheel solver and null confirmation");
    println!("================================================================\n");

    let results = ScalingResults {
        periods: sweep_periods(),
        null_batches: null_throughput(),
    };

    let data_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("data");
    std::fs::create_dir_all(&data_dir).ok();
    let path = data_dir.join("scaling_results.json");
    match serde_json::to_string_pretty(&results) {
        Ok(json) => match std::fs::write(&path, json) {
            Ok(()) => println!("Results saved to {}", path.display()),
            Err(e) => eprintln!("  Warning: failed to write {}: {}", path.display(), e),
        },
        Err(e) => eprintln!("  Warning: failed to serialize results: {}", e),
    }
}
