// SPDX-License-Identifier: Apache-2.0

//! Candidate generation: for each timing-critical target, estimate how often
//! each earlier, faster node disagrees with it, keep the most promising few,
//! and refine those by measuring the real output error of trying them.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use crate::aig::gate::{AigRef, GateFn};
use crate::aig::topo::TopoRanks;
use crate::aig_sim::error_rate::popcount_xor;
use crate::aig_sim::{ErrorMetric, OutputSamples, Stimulus, TruthVectors, simulate};
use crate::alc::Alc;
use crate::timing::TimingInfo;

#[derive(Debug, Clone, Copy)]
pub struct CandidateOptions {
    /// How many estimated-best substitutes per target are refined by
    /// simulation.
    pub top_k: usize,
}

impl Default for CandidateOptions {
    fn default() -> Self {
        CandidateOptions { top_k: 3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub substitute: AigRef,
    pub complemented: bool,
    pub error: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CandidateStats {
    pub targets: usize,
    pub infeasible_targets: usize,
    pub candidates_enumerated: usize,
    pub trials: usize,
}

/// The best refined change per feasible target.
#[derive(Debug, Default)]
pub struct CandidateSet {
    optimal: BTreeMap<AigRef, Alc>,
    pub stats: CandidateStats,
}

impl CandidateSet {
    pub fn optimal(&self, target: AigRef) -> Option<&Alc> {
        self.optimal.get(&target)
    }

    /// Records `alc` as its target's best change, replacing any previous one.
    pub fn insert(&mut self, alc: Alc) {
        self.optimal.insert(alc.target(), alc);
    }

    pub fn take_optimal(&mut self, target: AigRef) -> Option<Alc> {
        self.optimal.remove(&target)
    }

    pub fn is_feasible(&self, target: AigRef) -> bool {
        self.optimal.contains_key(&target)
    }

    pub fn len(&self) -> usize {
        self.optimal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.optimal.is_empty()
    }
}

/// Fraction of sampled patterns on which `target` and `substitute` differ.
pub fn estimate_pair_error(truth: &TruthVectors, target: AigRef, substitute: AigRef) -> f64 {
    let bits = 64 * truth.sample_words();
    if bits == 0 {
        return 0.0;
    }
    popcount_xor(truth.node_words(target), truth.node_words(substitute)) as f64 / bits as f64
}

/// Decides polarity for a substitute arriving at `substitute_arrival` for a
/// target arriving at `target_arrival`.
///
/// Only a substitute at least two time units earlier can afford the extra
/// inverter delay; then the complement is used whenever it disagrees less.
pub fn apply_polarity(raw_error: f64, substitute_arrival: u32, target_arrival: u32) -> (bool, f64) {
    if substitute_arrival + 1 < target_arrival {
        (raw_error > 0.5, raw_error.min(1.0 - raw_error))
    } else {
        (false, raw_error)
    }
}

/// Every node before `target` in topological order that arrives strictly
/// earlier, with its estimated error and polarity, in enumeration order.
pub fn enumerate_candidates(
    timing: &TimingInfo,
    truth: &TruthVectors,
    target: AigRef,
) -> Vec<Candidate> {
    let target_arrival = timing.arrival(target);
    timing
        .live_order()
        .iter()
        .take_while(|s| **s != target)
        .filter(|s| timing.arrival(**s) < target_arrival)
        .map(|s| {
            let raw = estimate_pair_error(truth, target, *s);
            let (complemented, error) = apply_polarity(raw, timing.arrival(*s), target_arrival);
            Candidate {
                substitute: *s,
                complemented,
                error,
            }
        })
        .collect()
}

fn by_error_then_index(a: &(usize, Candidate), b: &(usize, Candidate)) -> Ordering {
    a.1.error.total_cmp(&b.1.error).then(a.0.cmp(&b.0))
}

/// The `k` lowest-error candidates, ascending, ties broken by position.
///
/// With more than `k` candidates this is a partial selection followed by a
/// sort of the selected prefix; otherwise a full stable sort. Both paths give
/// the same answer.
pub fn select_top_k(cands: Vec<Candidate>, k: usize) -> Vec<Candidate> {
    if k == 0 {
        return Vec::new();
    }
    let mut decorated: Vec<(usize, Candidate)> = cands.into_iter().enumerate().collect();
    if decorated.len() > k {
        decorated.select_nth_unstable_by(k - 1, by_error_then_index);
        decorated.truncate(k);
        decorated.sort_unstable_by(by_error_then_index);
    } else {
        decorated.sort_by(|a, b| a.1.error.total_cmp(&b.1.error));
    }
    decorated.into_iter().map(|(_, c)| c).collect()
}

/// Builds the best change for every target.
///
/// Truth vectors of `working` are computed once up front. Each of a target's
/// top-K candidates is then applied to `working`, scored against
/// `golden_outputs`, and recovered, strictly one at a time, so `working` is
/// structurally unchanged on return. A target with no eligible substitute is
/// left out of the result.
pub fn generate(
    working: &mut GateFn,
    golden_outputs: &OutputSamples,
    stimulus: &Stimulus,
    timing: &TimingInfo,
    targets: &[AigRef],
    options: &CandidateOptions,
    metric: ErrorMetric,
) -> Result<CandidateSet> {
    let truth = simulate(working, stimulus)?;
    let ranks = TopoRanks::new(working);
    let mut set = CandidateSet::default();

    for &target in targets {
        set.stats.targets += 1;
        let cands = enumerate_candidates(timing, &truth, target);
        set.stats.candidates_enumerated += cands.len();
        if cands.is_empty() {
            log::debug!("{}: no eligible substitute", working.node_name(target));
            set.stats.infeasible_targets += 1;
            continue;
        }

        let mut best: Option<Alc> = None;
        for cand in select_top_k(cands, options.top_k) {
            let mut alc = Alc::new(
                working,
                &ranks,
                target,
                cand.substitute,
                cand.complemented,
                cand.error,
            )?;
            alc.apply(working)?;
            let measured = OutputSamples::capture(working, stimulus)
                .and_then(|approx| golden_outputs.error_rate(&approx, metric));
            alc.recover(working)?;
            let measured = measured?;
            set.stats.trials += 1;
            log::trace!(
                "{} -> {}{}: estimated {:.6}, measured {:.6}",
                working.node_name(target),
                if cand.complemented { "inv " } else { "" },
                working.node_name(cand.substitute),
                cand.error,
                measured
            );
            alc.set_error(measured);
            let better = match &best {
                Some(current) => measured < current.error(),
                None => true,
            };
            if better {
                best = Some(alc);
            }
        }
        if let Some(alc) = best {
            log::debug!(
                "{}: optimal substitute {}{} error {:.6}",
                working.node_name(target),
                if alc.is_complemented() { "inv " } else { "" },
                working.node_name(alc.substitute()),
                alc.error()
            );
            set.insert(alc);
        }
    }
    log::debug!("candidates: {:?}", set.stats);
    Ok(set)
}
