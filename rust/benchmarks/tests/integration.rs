//! End-to-end scenarios on the canonical 97-symbol ciphertext.

use proptest::prelude::*;

use benchmarks::{k4_complete, k4_plaintext, k4_route, k4_solution};
use null_confirm::{HolmReport, LexicalMetrics, NullTest, WordListLexicon};
use wheel_core::{
    k4_anchors, render, sha256_hex, CipherFamily, Ciphertext, Classing, Permutation, SearchSpace,
    SolverConfig,
};
use wheel_solver::{derive, encrypt, solve_anchors, verify};

const K4_SHA256: &str = "eea813570c7f1fd3b34674e47b5c3da8948026f5cefee612a0b38ffaa515ceab";

#[test]
fn scenario_a_two_anchors_period_17() {
    let perm = Permutation::identity(97);
    let ct = Ciphertext::k4();
    let anchors: Vec<_> = k4_anchors().into_iter().take(2).collect();
    let config = SolverConfig {
        search: SearchSpace::fixed_period(17),
        ..SolverConfig::default()
    };
    let outcome = solve_anchors(&ct, &anchors, Classing::ParityTriad, &perm, &config).unwrap();
    assert_eq!(outcome.stats.collisions, 0);
    let solved = outcome.verdict.into_feasible().unwrap();
    let text = derive(&ct, &solved.schedule, &perm).unwrap().render();
    assert_eq!(&text[21..=24], "EAST");
    assert_eq!(&text[25..=33], "NORTHEAST");
}

#[test]
fn scenario_b_forward_encrypt_reproduces_ciphertext_digest() {
    assert_eq!(Ciphertext::k4().sha256(), K4_SHA256);

    let perm = k4_route().unwrap();
    let schedule = k4_complete(2024, &perm).unwrap().expect("period 17 is feasible");
    let plain = k4_plaintext(&schedule, &perm).unwrap();

    // every anchor survives the solve, the route and the fill
    for a in k4_anchors() {
        assert_eq!(&plain[a.start..=a.end], a.plain.as_slice(), "anchor {}", a.name);
    }

    let produced = encrypt(&plain, &schedule, &perm).unwrap();
    assert_eq!(sha256_hex(render(&produced).as_bytes()), K4_SHA256);
    assert!(verify(&plain, &Ciphertext::k4(), &schedule, &perm)
        .unwrap()
        .is_exact());
}

#[test]
fn scenario_b_single_symbol_change_is_caught() {
    let perm = k4_route().unwrap();
    let schedule = k4_complete(5, &perm).unwrap().unwrap();
    let mut plain = k4_plaintext(&schedule, &perm).unwrap();
    plain[50] = (plain[50] + 1) % 26;
    let rt = verify(&plain, &Ciphertext::k4(), &schedule, &perm).unwrap();
    assert!(!rt.is_exact());
    let produced = encrypt(&plain, &schedule, &perm).unwrap();
    assert_ne!(sha256_hex(render(&produced).as_bytes()), K4_SHA256);
}

#[test]
fn scenario_c_null_test_is_deterministic() {
    let ct = Ciphertext::k4();
    let perm = k4_route().unwrap();
    let schedule = k4_complete(11, &perm).unwrap().unwrap();
    let lexicon = WordListLexicon::from_slices(
        &["THE", "AND", "OF", "TO", "IN"],
        &["READ", "SET", "LIES"],
        &["EAST", "NORTHEAST", "BERLIN", "CLOCK"],
    );
    let observed = LexicalMetrics {
        coverage: 0.4,
        function_words: 2,
        has_verb: true,
    };
    let null = NullTest::new(&ct, &schedule, &perm, &lexicon).unwrap();

    let first = null.run("k4-candidate", 1337, 10_000, &observed).unwrap();
    let second = null.run("k4-candidate", 1337, 10_000, &observed).unwrap();
    assert_eq!(first, second);

    let holm_a = HolmReport::from_raw(first.samples, &first.p_values(), 0.01);
    let holm_b = HolmReport::from_raw(second.samples, &second.p_values(), 0.01);
    assert_eq!(holm_a, holm_b);
    assert_eq!(holm_a.samples, 10_000);
    for m in holm_a.metrics.values() {
        assert!(m.p_raw > 0.0);
        assert!(m.p_holm >= m.p_raw && m.p_holm <= 1.0);
    }

    let other = null.run("k4-candidate", 1338, 10_000, &observed).unwrap();
    assert_ne!(first.seed, other.seed);
}

#[test]
fn test_period_17_forces_beaufort_where_ciphertext_equals_plaintext() {
    let perm = Permutation::identity(97);
    let solved = k4_solution(17, &perm).unwrap().expect("period 17 is feasible");
    // position 32 (class 2) and position 73 (class 4) carry C == P
    assert_eq!(solved.classes[2].family, CipherFamily::Beaufort);
    assert_eq!(solved.classes[4].family, CipherFamily::Beaufort);
    for class in [0, 1, 3, 5] {
        assert_eq!(solved.classes[class].family, CipherFamily::Vigenere);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_fill_of_the_free_slots_round_trips(seed in any::<u64>()) {
        let perm = k4_route().unwrap();
        let schedule = k4_complete(seed, &perm).unwrap().unwrap();
        let plain = k4_plaintext(&schedule, &perm).unwrap();
        prop_assert_eq!(render(&encrypt(&plain, &schedule, &perm).unwrap()), Ciphertext::k4().to_string());
    }
}
