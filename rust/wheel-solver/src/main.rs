//! wheel-solver driver: solve the canonical ciphertext against its anchors.
//!
//! Options:
//!   --period=<L>        Restrict the search to one period (default: search 1..=26)
//!   --classing=<id>     c6a | single | mod<k> (default: c6a)
//!   --anchors=<n>       Use the first n published anchors (default: all)
//!   --option-a=<scope>  anchors | all (default: anchors)
//!   --output=<path>     JSON result path (default: data/wheel_solver_results.json)

use serde::Serialize;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use wheel_core::{
    k4_anchors, Anchor, Ciphertext, Classing, OptionAMode, OptionAPolicy, OptionAScope,
    Permutation, SearchSpace, SolverConfig,
};
use wheel_solver::{derive, solve_anchors, ClassConfig, Infeasibility, ScheduleVerdict, SolveStats};

struct CliConfig {
    period: Option<usize>,
    classing: Classing,
    anchors: usize,
    scope: OptionAScope,
    output: Option<String>,
}

fn parse_classing(s: &str) -> Option<Classing> {
    match s {
        "c6a" => Some(Classing::ParityTriad),
        "single" => Some(Classing::Single),
        _ => s
            .strip_prefix("mod")
            .and_then(|k| k.parse().ok())
            .filter(|&k: &usize| k > 0)
            .map(|k| Classing::Modulo { k }),
    }
}

fn parse_args() -> CliConfig {
    let mut cfg = CliConfig {
        period: None,
        classing: Classing::ParityTriad,
        anchors: usize::MAX,
        scope: OptionAScope::Anchors,
        output: None,
    };
    for arg in std::env::args().skip(1) {
        if let Some(v) = arg.strip_prefix("--period=") {
            cfg.period = v.parse().ok().filter(|&p: &usize| p > 0);
        } else if let Some(v) = arg.strip_prefix("--classing=") {
            match parse_classing(v) {
                Some(c) => cfg.classing = c,
                None => eprintln!("  Warning: unknown classing '{}', keeping {}", v, cfg.classing),
            }
        } else if let Some(v) = arg.strip_prefix("--anchors=") {
            if let Ok(n) = v.parse() {
                cfg.anchors = n;
            }
        } else if let Some(v) = arg.strip_prefix("--option-a=") {
            cfg.scope = if v == "all" {
                OptionAScope::AllConstraints
            } else {
                OptionAScope::Anchors
            };
        } else if let Some(v) = arg.strip_prefix("--output=") {
            cfg.output = Some(v.to_string());
        }
    }
    cfg
}

#[derive(Serialize)]
struct SolverReport {
    ciphertext: String,
    ciphertext_sha256: String,
    classing: String,
    anchors: Vec<String>,
    feasible: bool,
    configs: Vec<ClassConfig>,
    infeasible_class: Option<usize>,
    reason: Option<Infeasibility>,
    derived: Option<String>,
    known_positions: usize,
    missing_slots: usize,
    stats: SolveStats,
    wall_seconds: f64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = parse_args();
    let ct = Ciphertext::k4();
    let anchors: Vec<Anchor> = k4_anchors().into_iter().take(cli.anchors).collect();
    let perm = Permutation::identity(ct.len());
    let config = SolverConfig {
        option_a: OptionAPolicy {
            scope: cli.scope,
            mode: OptionAMode::Reject,
        },
        search: match cli.period {
            Some(p) => SearchSpace::fixed_period(p),
            None => SearchSpace::default(),
        },
    };

    println!("=== Wheel Solver ===");
    println!("Ciphertext: {}", ct);
    println!(
        "Anchors:    {}",
        anchors.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ")
    );
    println!("Classing:   {}  ({} configurations per class)\n", cli.classing, config.search.size());

    let start = Instant::now();
    let outcome = match solve_anchors(&ct, &anchors, cli.classing, &perm, &config) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Solver input rejected: {}", e);
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed().as_secs_f64();

    let mut report = SolverReport {
        ciphertext: ct.to_string(),
        ciphertext_sha256: ct.sha256(),
        classing: cli.classing.id(),
        anchors: anchors.iter().map(|a| a.to_string()).collect(),
        feasible: outcome.verdict.is_feasible(),
        configs: Vec::new(),
        infeasible_class: None,
        reason: None,
        derived: None,
        known_positions: 0,
        missing_slots: 0,
        stats: outcome.stats,
        wall_seconds: elapsed,
    };

    match &outcome.verdict {
        ScheduleVerdict::Feasible(solved) => {
            println!("{:>5} {:>18} {:>6} {:>6} {:>8}", "class", "family", "L", "phase", "missing");
            println!("{}", "-".repeat(48));
            for (class, (cfg, key)) in solved.configs.iter().zip(&solved.schedule.classes).enumerate() {
                println!(
                    "{:>5} {:>18} {:>6} {:>6} {:>8}",
                    class,
                    cfg.family,
                    cfg.period,
                    cfg.phase,
                    key.wheel.missing_slots()
                );
            }
            match derive(&ct, &solved.schedule, &perm) {
                Ok(d) => {
                    println!("\nDerived:    {}", d.render());
                    println!("Known:      {}/{}", d.known(), ct.len());
                    report.known_positions = d.known();
                    report.derived = Some(d.render());
                }
                Err(e) => eprintln!("Derivation failed: {}", e),
            }
            report.configs = solved.configs.clone();
            report.missing_slots = solved.schedule.missing_slots();
        }
        ScheduleVerdict::Infeasible { class, reason } => {
            println!("INFEASIBLE: class {}: {}", class, reason);
            report.infeasible_class = Some(*class);
            report.reason = Some(reason.clone());
        }
    }

    println!("\n{}", "=".repeat(48));
    println!("Configurations tried: {}", outcome.stats.configurations_tried);
    println!("Collisions:           {}", outcome.stats.collisions);
    println!("Option-A rejections:  {}", outcome.stats.option_a_rejections);
    println!("Wall time:            {:.3}s", elapsed);

    let output = cli.output.unwrap_or_else(|| {
        let data_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("data");
        std::fs::create_dir_all(&data_dir).ok();
        data_dir.join("wheel_solver_results.json").display().to_string()
    });
    match serde_json::to_string_pretty(&report) {
        Ok(json) => match std::fs::write(&output, json) {
            Ok(()) => println!("\nResults saved to {}", output),
            Err(e) => eprintln!("  Warning: failed to write {}: {}", output, e),
        },
        Err(e) => eprintln!("  Warning: failed to serialize report: {}", e),
    }
}
