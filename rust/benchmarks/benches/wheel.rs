use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use benchmarks::{k4_complete, k4_plaintext, k4_route};
use null_confirm::{LexicalMetrics, NullTest, WordListLexicon};
use wheel_core::{k4_anchors, Ciphertext, Classing, Permutation, SearchSpace, SolverConfig};
use wheel_solver::{derive, encrypt, solve_anchors};

fn bench_solver_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver_search");
    group.sample_size(20);
    let ct = Ciphertext::k4();
    let anchors = k4_anchors();
    let perm = Permutation::identity(97);

    for max_period in [8usize, 17, 26] {
        let config = SolverConfig {
            search: SearchSpace {
                periods: (1..=max_period).collect(),
                ..SearchSpace::default()
            },
            ..SolverConfig::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(max_period), &config, |b, cfg| {
            b.iter(|| solve_anchors(&ct, &anchors, Classing::ParityTriad, &perm, cfg));
        });
    }

    group.finish();
}

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_trip");
    let ct = Ciphertext::k4();
    let Ok(perm) = k4_route() else { return };
    let Ok(Some(schedule)) = k4_complete(7, &perm) else { return };
    let Ok(plain) = k4_plaintext(&schedule, &perm) else { return };

    group.bench_function("derive", |b| b.iter(|| derive(&ct, &schedule, &perm)));
    group.bench_function("encrypt", |b| b.iter(|| encrypt(&plain, &schedule, &perm)));

    group.finish();
}

fn bench_null_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("null_batch");
    group.sample_size(10);
    let ct = Ciphertext::k4();
    let Ok(perm) = k4_route() else { return };
    let Ok(Some(schedule)) = k4_complete(7, &perm) else { return };
    let lexicon = WordListLexicon::from_slices(
        &["THE", "AND", "OF"],
        &["READ", "SET"],
        &["EAST", "NORTHEAST", "BERLIN", "CLOCK"],
    );
    let Ok(null) = NullTest::new(&ct, &schedule, &perm, &lexicon) else { return };
    let observed = LexicalMetrics {
        coverage: 0.5,
        function_words: 3,
        has_verb: true,
    };

    for samples in [100usize, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(samples), &samples, |b, &k| {
            b.iter(|| null.run("bench", 1337, k, &observed));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_solver_search, bench_round_trip, bench_null_batch);
criterion_main!(benches);
