// SPDX-License-Identifier: Apache-2.0

//! Unit-delay static timing analysis over a `GateFn`.
//!
//! Arrival times propagate forward from inputs and literals (time zero);
//! required times propagate backward from the outputs, all of which are
//! required at the circuit's maximum delay. Slack is `required - arrival`.
//! Delays are integers so that "zero slack" is an exact test.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::aig::gate::{AigNode, AigRef, GateFn};
use crate::aig::topo::topo_sort_refs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayModel {
    pub and2: u32,
    pub inv: u32,
}

impl Default for DelayModel {
    fn default() -> Self {
        DelayModel { and2: 1, inv: 1 }
    }
}

impl DelayModel {
    pub fn delay(&self, node: &AigNode) -> u32 {
        match node {
            AigNode::Input { .. } | AigNode::Literal(_) => 0,
            AigNode::And2 { .. } => self.and2,
            AigNode::Inv { .. } => self.inv,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimingInfo {
    /// Arrival time of every node in the arena.
    pub arrival: Vec<u32>,
    /// `None` for nodes with no path to an output.
    pub slack: Vec<Option<u32>>,
    /// Latest arrival over all output bits.
    pub max_delay: u32,
    live_order: Vec<AigRef>,
}

impl TimingInfo {
    pub fn arrival(&self, aig_ref: AigRef) -> u32 {
        self.arrival[aig_ref.id]
    }

    pub fn slack(&self, aig_ref: AigRef) -> Option<u32> {
        self.slack[aig_ref.id]
    }

    pub fn is_zero_slack(&self, aig_ref: AigRef) -> bool {
        self.slack[aig_ref.id] == Some(0)
    }

    /// Live nodes in topological order (inputs included).
    pub fn live_order(&self) -> &[AigRef] {
        &self.live_order
    }

    /// Zero-slack nodes in topological order, sources included.
    pub fn zero_slack_nodes(&self) -> Vec<AigRef> {
        self.live_order
            .iter()
            .copied()
            .filter(|r| self.is_zero_slack(*r))
            .collect()
    }
}

pub fn analyze(gate_fn: &GateFn, model: &DelayModel) -> TimingInfo {
    let order = topo_sort_refs(&gate_fn.gates);
    let mut arrival = vec![0u32; gate_fn.gates.len()];
    for r in &order {
        let node = gate_fn.get(*r);
        let latest_fanin = node
            .get_args()
            .iter()
            .map(|arg| arrival[arg.id])
            .max()
            .unwrap_or(0);
        arrival[r.id] = if node.is_source() {
            0
        } else {
            latest_fanin + model.delay(node)
        };
    }

    let outputs = gate_fn.output_operands();
    let max_delay = outputs
        .iter()
        .map(|op| arrival[op.node.id])
        .max()
        .unwrap_or(0);

    let live = gate_fn.live_mask();
    let live_order: Vec<AigRef> = order.into_iter().filter(|r| live[r.id]).collect();

    let mut required: Vec<Option<u32>> = vec![None; gate_fn.gates.len()];
    for op in &outputs {
        required[op.node.id] = Some(max_delay);
    }
    for r in live_order.iter().rev() {
        let Some(req) = required[r.id] else {
            continue;
        };
        let node = gate_fn.get(*r);
        let fanin_req = req.saturating_sub(model.delay(node));
        for arg in node.get_args() {
            required[arg.id] = Some(match required[arg.id] {
                Some(existing) => existing.min(fanin_req),
                None => fanin_req,
            });
        }
    }

    let slack = required
        .iter()
        .zip(&arrival)
        .map(|(req, arr)| {
            req.map(|req| {
                debug_assert!(req >= *arr, "required {} before arrival {}", req, arr);
                req.saturating_sub(*arr)
            })
        })
        .collect();

    log::debug!(
        "timing: {} live nodes, max delay {}",
        live_order.len(),
        max_delay
    );
    TimingInfo {
        arrival,
        slack,
        max_delay,
        live_order,
    }
}

/// Edges `u -> v` where both ends have zero slack and `u` is the fanin that
/// sets `v`'s arrival time. Grouped by `u`, in topological order.
pub fn critical_graph(
    gate_fn: &GateFn,
    timing: &TimingInfo,
    model: &DelayModel,
) -> Vec<(AigRef, Vec<AigRef>)> {
    let mut successors: Vec<Vec<AigRef>> = vec![Vec::new(); gate_fn.gates.len()];
    for v in timing.live_order() {
        let node = gate_fn.get(*v);
        if node.is_source() || !timing.is_zero_slack(*v) {
            continue;
        }
        let mut args = node.get_args();
        args.dedup();
        for u in args {
            if timing.is_zero_slack(u)
                && timing.arrival(u) + model.delay(node) == timing.arrival(*v)
            {
                successors[u.id].push(*v);
            }
        }
    }
    timing
        .live_order()
        .iter()
        .filter_map(|u| {
            let vs = std::mem::take(&mut successors[u.id]);
            (!vs.is_empty()).then_some((*u, vs))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalPath {
    pub max_delay: u32,
    /// From a source to an output-driving node.
    pub path: Vec<AigRef>,
}

/// Up to `k` distinct source-to-output paths in non-increasing delay order.
///
/// Best-first search backward from the output drivers. A partial path ending
/// at `v` is keyed by its accumulated delay plus the arrival time of `v`'s
/// latest fanin, which is exact, so complete paths pop in order. Among equal
/// bounds the longest partial path pops first, so reaching each path costs
/// one descent instead of a sweep over every tied prefix.
pub fn k_most_critical_paths(gate_fn: &GateFn, model: &DelayModel, k: usize) -> Vec<CriticalPath> {
    let timing = analyze(gate_fn, model);
    let mut heap: BinaryHeap<(u32, usize, Reverse<usize>, Vec<AigRef>)> = BinaryHeap::new();
    let mut seq = 0usize;

    let mut drivers: Vec<AigRef> = gate_fn.output_operands().iter().map(|op| op.node).collect();
    drivers.sort();
    drivers.dedup();
    for d in drivers {
        heap.push((timing.arrival(d), 1, Reverse(seq), vec![d]));
        seq += 1;
    }

    let mut result = Vec::new();
    while result.len() < k {
        let Some((bound, _, _, reversed_path)) = heap.pop() else {
            break;
        };
        let Some(&front) = reversed_path.last() else {
            continue;
        };
        let node = gate_fn.get(front);
        if node.is_source() {
            let mut path = reversed_path;
            path.reverse();
            result.push(CriticalPath {
                max_delay: bound,
                path,
            });
            continue;
        }
        let accumulated = bound - timing.arrival(front) + model.delay(node);
        let mut args = node.get_args();
        args.dedup();
        for u in args {
            let mut extended = reversed_path.clone();
            extended.push(u);
            let depth = extended.len();
            heap.push((accumulated + timing.arrival(u), depth, Reverse(seq), extended));
            seq += 1;
        }
    }
    result
}
