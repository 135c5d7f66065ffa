// SPDX-License-Identifier: Apache-2.0

//! Min-cut selection on random circuits: the selected gates must cut every
//! critical path, and their total error must equal the maximum flow.

use std::collections::{HashSet, VecDeque};

use dals_g8r::aig::gate::{AigRef, GateFn};
use dals_g8r::aig_sim::{ErrorMetric, OutputSamples, Stimulus};
use dals_g8r::candidates::{CandidateOptions, CandidateSet, generate};
use dals_g8r::selector::select;
use dals_g8r::test_utils::random_gate_fn;
use dals_g8r::timing::{DelayModel, TimingInfo, analyze, critical_graph};
use dals_flow::FlowValue;
use test_case::test_case;

fn candidates_for(g: &GateFn, timing: &TimingInfo, seed: u64) -> CandidateSet {
    let mut working = g.clone();
    let stim = Stimulus::random(g, 2, seed);
    let golden = OutputSamples::capture(g, &stim).unwrap();
    let targets: Vec<AigRef> = timing
        .zero_slack_nodes()
        .into_iter()
        .filter(|r| !g.is_source(*r))
        .collect();
    generate(
        &mut working,
        &golden,
        &stim,
        timing,
        &targets,
        &CandidateOptions { top_k: 2 },
        ErrorMetric::BitFlip,
    )
    .unwrap()
}

/// True if some critical output is reachable from a zero-slack source over
/// critical edges without passing through `removed`.
fn critical_path_survives(
    g: &GateFn,
    timing: &TimingInfo,
    model: &DelayModel,
    removed: &HashSet<AigRef>,
) -> bool {
    let edges = critical_graph(g, timing, model);
    let successors = |u: AigRef| {
        edges
            .iter()
            .find(|(from, _)| *from == u)
            .map(|(_, vs)| vs.clone())
            .unwrap_or_default()
    };
    let mut queue: VecDeque<AigRef> = timing
        .zero_slack_nodes()
        .into_iter()
        .filter(|r| g.is_source(*r))
        .collect();
    let mut seen: HashSet<AigRef> = queue.iter().copied().collect();
    while let Some(u) = queue.pop_front() {
        if removed.contains(&u) {
            continue;
        }
        if g.drives_output(u) && timing.arrival(u) == timing.max_delay {
            return true;
        }
        for v in successors(u) {
            if seen.insert(v) {
                queue.push_back(v);
            }
        }
    }
    false
}

#[test_case(1)]
#[test_case(5)]
#[test_case(17)]
#[test_case(23)]
fn test_cut_disconnects_critical_paths(seed: u64) {
    let g = random_gate_fn(seed, 6, 40, 3);
    let model = DelayModel::default();
    let timing = analyze(&g, &model);
    let set = candidates_for(&g, &timing, seed);
    let selection = select(&g, &timing, &model, &set);

    assert!(critical_path_survives(&g, &timing, &model, &HashSet::new()));
    assert!(!selection.is_empty());
    let removed: HashSet<AigRef> = selection.nodes.iter().copied().collect();
    assert!(!critical_path_survives(&g, &timing, &model, &removed));

    let total: f64 = selection
        .nodes
        .iter()
        .map(|n| set.optimal(*n).unwrap().error())
        .sum();
    assert!((total - selection.cut_weight).abs() < 1e-9);
    assert_eq!(selection.max_flow, FlowValue::Finite(selection.cut_weight));
}

#[test]
fn test_no_candidates_means_no_selection() {
    let g = random_gate_fn(3, 6, 40, 3);
    let model = DelayModel::default();
    let timing = analyze(&g, &model);
    let selection = select(&g, &timing, &model, &CandidateSet::default());
    assert!(selection.is_empty());
    assert!(selection.max_flow.is_unbounded());
}
