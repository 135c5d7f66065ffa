// SPDX-License-Identifier: Apache-2.0

use dals_g8r::aig::gate::AigRef;
use dals_g8r::aig::topo::TopoRanks;
use dals_g8r::alc::Alc;
use dals_g8r::aig_sim::{ErrorMetric, OutputSamples, Stimulus, simulate};
use dals_g8r::candidates::{
    Candidate, CandidateOptions, apply_polarity, enumerate_candidates, generate, select_top_k,
};
use dals_g8r::test_utils::{random_gate_fn, setup_redundant_chain_graph};
use dals_g8r::timing::{DelayModel, analyze};
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use test_case::test_case;

fn random_candidates(seed: u64, count: usize) -> Vec<Candidate> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    (0..count)
        .map(|id| Candidate {
            substitute: AigRef { id },
            complemented: false,
            // Few distinct values, so ties are common.
            error: f64::from(rng.gen_range(0..5u32)) / 8.0,
        })
        .collect()
}

#[test_case(1, 20, 3)]
#[test_case(2, 20, 1)]
#[test_case(3, 7, 6)]
#[test_case(4, 7, 7)]
#[test_case(5, 3, 10)]
fn test_top_k_matches_stable_sort(seed: u64, count: usize, k: usize) {
    let cands = random_candidates(seed, count);
    let mut reference = cands.clone();
    reference.sort_by(|a, b| a.error.total_cmp(&b.error));
    reference.truncate(k);
    assert_eq!(select_top_k(cands, k), reference);
}

#[test]
fn test_polarity_is_deterministic_per_arrival_gap() {
    for raw in [0.0, 0.25, 0.5, 0.75, 1.0] {
        let (complemented, error) = apply_polarity(raw, 3, 5);
        assert_eq!(complemented, raw > 0.5);
        assert!(error <= 0.5);
        assert_eq!(apply_polarity(raw, 4, 5), (false, raw));
        assert_eq!(apply_polarity(raw, 3, 5), (complemented, error));
    }
}

#[test]
fn test_enumerated_polarity_follows_arrival() {
    let g = random_gate_fn(9, 6, 40, 3);
    let timing = analyze(&g, &DelayModel::default());
    let stim = Stimulus::random(&g, 4, 9);
    let truth = simulate(&g, &stim).unwrap();
    for target in timing.zero_slack_nodes() {
        if g.is_source(target) {
            continue;
        }
        for cand in enumerate_candidates(&timing, &truth, target) {
            assert!(timing.arrival(cand.substitute) < timing.arrival(target));
            if timing.arrival(cand.substitute) + 1 >= timing.arrival(target) {
                assert!(!cand.complemented);
            } else {
                assert!(cand.error <= 0.5);
            }
        }
    }
}

#[test_case(ErrorMetric::BitFlip)]
#[test_case(ErrorMetric::Pattern)]
fn test_generate_leaves_working_unchanged(metric: ErrorMetric) {
    let g = random_gate_fn(21, 6, 40, 3);
    let mut working = g.clone();
    let timing = analyze(&working, &DelayModel::default());
    let stim = Stimulus::random(&working, 4, 21);
    let golden = OutputSamples::capture(&g, &stim).unwrap();
    let targets: Vec<AigRef> = timing
        .zero_slack_nodes()
        .into_iter()
        .filter(|r| !g.is_source(*r))
        .collect();
    let set = generate(
        &mut working,
        &golden,
        &stim,
        &timing,
        &targets,
        &CandidateOptions { top_k: 2 },
        metric,
    )
    .unwrap();
    assert_eq!(working, g);
    assert_eq!(set.stats.targets, targets.len());
    assert_eq!(set.len() + set.stats.infeasible_targets, targets.len());
    assert!(set.stats.trials <= 2 * targets.len());
    for target in &targets {
        let alc = set.optimal(*target).unwrap();
        assert!((0.0..=1.0).contains(&alc.error()));
        assert!(!alc.is_applied());
    }
}

#[test]
fn test_generate_finds_exact_substitute() {
    let t = setup_redundant_chain_graph();
    let mut working = t.g.clone();
    let timing = analyze(&working, &DelayModel::default());
    let stim = Stimulus::random(&working, 16, 5);
    let golden = OutputSamples::capture(&t.g, &stim).unwrap();
    let set = generate(
        &mut working,
        &golden,
        &stim,
        &timing,
        &[t.n3.node],
        &CandidateOptions::default(),
        ErrorMetric::BitFlip,
    )
    .unwrap();
    let alc = set.optimal(t.n3.node).unwrap();
    assert_eq!(alc.substitute(), t.n2.node);
    assert!(!alc.is_complemented());
    assert_eq!(alc.error(), 0.0);
}

#[test]
fn test_redundant_chain_has_one_exact_substitution() {
    // x, y and z take all eight assignments in the low byte of one word.
    let t = setup_redundant_chain_graph();
    let stim = Stimulus::from_words(vec![vec![0b1111_0000], vec![0b1100_1100], vec![0b1010_1010]]);
    let golden = OutputSamples::capture(&t.g, &stim).unwrap();
    let timing = analyze(&t.g, &DelayModel::default());
    let ranks = TopoRanks::new(&t.g);

    let mut exact = Vec::new();
    for target in [t.n1.node, t.n2.node, t.n3.node] {
        assert!(timing.is_zero_slack(target));
        for &substitute in timing.live_order() {
            if timing.arrival(substitute) >= timing.arrival(target) {
                continue;
            }
            for complemented in [false, true] {
                let mut working = t.g.clone();
                let mut alc = Alc::new(&working, &ranks, target, substitute, complemented, 1.0).unwrap();
                alc.apply(&mut working).unwrap();
                let approx = OutputSamples::capture(&working, &stim).unwrap();
                if golden.error_rate(&approx, ErrorMetric::BitFlip).unwrap() == 0.0 {
                    exact.push((target, substitute, complemented));
                }
            }
        }
    }
    assert_eq!(exact, vec![(t.n3.node, t.n2.node, false)]);
}

#[test_case(0)]
#[test_case(3)]
#[test_case(11)]
fn test_redundant_chain_optimal_changes(seed: u64) {
    let t = setup_redundant_chain_graph();
    let mut working = t.g.clone();
    let timing = analyze(&working, &DelayModel::default());
    let stim = Stimulus::random(&working, 16, seed);
    let golden = OutputSamples::capture(&t.g, &stim).unwrap();
    let set = generate(
        &mut working,
        &golden,
        &stim,
        &timing,
        &[t.n1.node, t.n2.node, t.n3.node],
        &CandidateOptions::default(),
        ErrorMetric::BitFlip,
    )
    .unwrap();
    assert_eq!(working, t.g);
    assert_eq!(set.optimal(t.n3.node).unwrap().substitute(), t.n2.node);
    assert_eq!(set.optimal(t.n3.node).unwrap().error(), 0.0);
    assert!(set.optimal(t.n1.node).unwrap().error() > 0.0);
    assert!(set.optimal(t.n2.node).unwrap().error() > 0.0);
}
