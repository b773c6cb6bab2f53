//! null-confirm driver: run a batch of candidates through the gates and the
//! null test, then write artifacts for every candidate that reached it.
//!
//! Options:
//!   --candidates=<path>  JSON array of candidates (required)
//!   --lexicon=<path>     JSON word lists {function, verbs, content} (required)
//!   --config=<path>      WorkbenchConfig JSON (default: built-in full config)
//!   --quick              Use the quick config (500 null samples)
//!   --out=<dir>          Artifact root (default: data/confirm)

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use null_confirm::{
    write_artifacts, ArtifactBundle, CancelFlag, Candidate, ConfirmationOutcome, Confirmer,
    WordListLexicon, WorkbenchConfig,
};
use wheel_core::{parse_text, Ciphertext};

struct CliConfig {
    candidates: Option<PathBuf>,
    lexicon: Option<PathBuf>,
    config: Option<PathBuf>,
    quick: bool,
    out: Option<PathBuf>,
}

fn parse_args() -> CliConfig {
    let mut cfg = CliConfig {
        candidates: None,
        lexicon: None,
        config: None,
        quick: false,
        out: None,
    };
    for arg in std::env::args().skip(1) {
        if let Some(v) = arg.strip_prefix("--candidates=") {
            cfg.candidates = Some(PathBuf::from(v));
        } else if let Some(v) = arg.strip_prefix("--lexicon=") {
            cfg.lexicon = Some(PathBuf::from(v));
        } else if let Some(v) = arg.strip_prefix("--config=") {
            cfg.config = Some(PathBuf::from(v));
        } else if arg == "--quick" {
            cfg.quick = true;
        } else if let Some(v) = arg.strip_prefix("--out=") {
            cfg.out = Some(PathBuf::from(v));
        } else {
            eprintln!("  Warning: ignoring unknown argument '{}'", arg);
        }
    }
    cfg
}

fn data_dir() -> PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("data")
}

#[derive(Serialize)]
struct BatchSummary {
    ciphertext_sha256: String,
    master_seed: u64,
    null_samples: usize,
    alpha: f64,
    outcomes: Vec<ConfirmationOutcome>,
    publishable: Vec<String>,
    wall_seconds: f64,
}

fn fail(msg: String) -> ! {
    eprintln!("{}", msg);
    std::process::exit(1);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = parse_args();
    let (Some(candidates_path), Some(lexicon_path)) = (cli.candidates, cli.lexicon) else {
        fail("usage: null-confirm --candidates=<path> --lexicon=<path> [--config=<path>] [--quick] [--out=<dir>]".into());
    };

    let config = match &cli.config {
        Some(path) => WorkbenchConfig::load(path)
            .unwrap_or_else(|e| fail(format!("Config rejected: {}", e))),
        None if cli.quick => WorkbenchConfig::quick(),
        None => WorkbenchConfig::full(),
    };
    let lexicon = WordListLexicon::load(&lexicon_path)
        .unwrap_or_else(|e| fail(format!("Lexicon rejected: {}", e)));
    let candidates: Vec<Candidate> = std::fs::read_to_string(&candidates_path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()))
        .unwrap_or_else(|e| fail(format!("Candidates rejected: {}", e)));

    let ct = Ciphertext::k4();
    println!("=== Null Confirmation ===");
    println!("Ciphertext:  {}", ct);
    println!(
        "Anchors:     {}",
        config.anchors.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ")
    );
    println!("Candidates:  {}", candidates.len());
    println!("Lexicon:     {} words", lexicon.len());
    println!(
        "Null test:   K = {}, alpha = {}, master seed = {}\n",
        config.null_samples, config.alpha, config.master_seed
    );

    let start = Instant::now();
    let confirmer = Confirmer::new(&ct, &config, &lexicon, &lexicon);
    let outcomes = confirmer
        .confirm_batch(&candidates, &CancelFlag::new())
        .unwrap_or_else(|e| fail(format!("Batch aborted: {}", e)));
    let elapsed = start.elapsed().as_secs_f64();

    println!(
        "{:>16} {:>12} {:>9} {:>5} {:>10} {:>10}  {}",
        "label", "stage", "coverage", "fw", "p_cov", "p_fw", "verdict"
    );
    println!("{}", "-".repeat(84));
    let out_root = cli.out.unwrap_or_else(|| data_dir().join("confirm"));
    for (candidate, outcome) in candidates.iter().zip(&outcomes) {
        let holm = |name: &str| {
            outcome
                .holm
                .as_ref()
                .and_then(|h| h.metrics.get(name))
                .map(|m| format!("{:.5}", m.p_holm))
                .unwrap_or_else(|| "-".to_string())
        };
        let verdict = match outcome.reject_reason() {
            None => "PUBLISHABLE".to_string(),
            Some(r) => format!("REJECTED ({})", r),
        };
        println!(
            "{:>16} {:>12} {:>9} {:>5} {:>10} {:>10}  {}",
            outcome.label,
            outcome.stage.to_string(),
            outcome.near.map(|n| format!("{:.3}", n.coverage)).unwrap_or_else(|| "-".into()),
            outcome.near.map(|n| n.function_words.to_string()).unwrap_or_else(|| "-".into()),
            holm("coverage"),
            holm("function_words"),
            verdict
        );

        if outcome.holm.is_none() {
            continue;
        }
        let written = parse_text(&candidate.plaintext)
            .map_err(null_confirm::ConfirmError::from)
            .and_then(|plain| {
                ArtifactBundle::from_outcome(
                    outcome,
                    &ct,
                    &plain,
                    &candidate.schedule,
                    &candidate.permutation.id,
                )
            })
            .and_then(|bundle| write_artifacts(&out_root.join(&outcome.label), &bundle));
        if let Err(e) = written {
            eprintln!("  Warning: artifacts for {} not written: {}", outcome.label, e);
        }
    }

    let publishable: Vec<String> = outcomes
        .iter()
        .filter(|o| o.is_publishable())
        .map(|o| o.label.clone())
        .collect();
    println!("\n{}", "=".repeat(84));
    println!("Confirmed:   {}/{}", outcomes.len(), candidates.len());
    println!("Publishable: {}", publishable.len());
    println!("Wall time:   {:.2}s", elapsed);

    let summary = BatchSummary {
        ciphertext_sha256: ct.sha256(),
        master_seed: config.master_seed,
        null_samples: config.null_samples,
        alpha: config.alpha,
        outcomes,
        publishable,
        wall_seconds: elapsed,
    };
    let dir = data_dir();
    std::fs::create_dir_all(&dir).ok();
    let path = dir.join("null_confirm_results.json");
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => match std::fs::write(&path, json) {
            Ok(()) => println!("\nResults saved to {}", path.display()),
            Err(e) => eprintln!("  Warning: failed to write {}: {}", path.display(), e),
        },
        Err(e) => eprintln!("  Warning: failed to serialize summary: {}", e),
    }
}
