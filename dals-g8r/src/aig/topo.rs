// SPDX-License-Identifier: Apache-2.0

use crate::aig::gate::{AigNode, AigRef, GateFn};
use std::collections::VecDeque;

/// Kahn's algorithm over the node arena, children before parents.
///
/// Returns the order and `None` for an acyclic arena, or the partial order and
/// the ids it could not place when there is a cycle. Ready nodes are visited
/// first-in first-out, seeded in id order, so the result is deterministic.
/// Operands outside the arena are ignored here; the parser reports them.
pub fn topo_order_and_cycle_check(nodes: &[AigNode]) -> (Vec<AigRef>, Option<Vec<usize>>) {
    let n = nodes.len();
    let mut pending_fanins = vec![0usize; n];
    let mut consumers: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (id, node) in nodes.iter().enumerate() {
        for fanin in node.get_args().into_iter().filter(|r| r.id < n) {
            pending_fanins[id] += 1;
            consumers[fanin.id].push(id);
        }
    }

    let mut ready: VecDeque<usize> = (0..n).filter(|&id| pending_fanins[id] == 0).collect();
    let mut order = Vec::with_capacity(n);
    let mut placed = vec![false; n];
    while let Some(id) = ready.pop_front() {
        order.push(AigRef { id });
        placed[id] = true;
        for &consumer in &consumers[id] {
            pending_fanins[consumer] -= 1;
            if pending_fanins[consumer] == 0 {
                ready.push_back(consumer);
            }
        }
    }

    if order.len() == n {
        (order, None)
    } else {
        let unplaced = (0..n).filter(|&id| !placed[id]).collect();
        (order, Some(unplaced))
    }
}

/// Topological order of the whole arena. Panics on a cycle, which the
/// parser and every edit rule out.
pub fn topo_sort_refs(nodes: &[AigNode]) -> Vec<AigRef> {
    match topo_order_and_cycle_check(nodes) {
        (order, None) => order,
        (_, Some(unplaced)) => panic!("nodes {:?} form a cycle", unplaced),
    }
}

/// Topological order restricted to the nodes some output still reaches, plus
/// every primary input bit.
pub fn live_topo_order(gate_fn: &GateFn) -> Vec<AigRef> {
    let live = gate_fn.live_mask();
    topo_sort_refs(&gate_fn.gates)
        .into_iter()
        .filter(|r| live[r.id])
        .collect()
}

/// Position of every node in a topological order of the whole arena.
#[derive(Debug, Clone)]
pub struct TopoRanks {
    rank: Vec<usize>,
}

impl TopoRanks {
    pub fn new(gate_fn: &GateFn) -> Self {
        Self::from_order(&topo_sort_refs(&gate_fn.gates), gate_fn.gates.len())
    }

    pub fn from_order(order: &[AigRef], node_count: usize) -> Self {
        let mut rank = vec![usize::MAX; node_count];
        for (i, r) in order.iter().enumerate() {
            rank[r.id] = i;
        }
        TopoRanks { rank }
    }

    pub fn rank(&self, aig_ref: AigRef) -> usize {
        self.rank[aig_ref.id]
    }

    /// True if `a` comes strictly before `b`.
    pub fn precedes(&self, a: AigRef, b: AigRef) -> bool {
        self.rank(a) < self.rank(b)
    }
}

/// Debug-build check after an edit; logs each node on the cycle before
/// panicking.
pub fn debug_assert_no_cycles(nodes: &[AigNode], context: &str) {
    if !cfg!(debug_assertions) {
        return;
    }
    if let (_, Some(unplaced)) = topo_order_and_cycle_check(nodes) {
        for id in &unplaced {
            log::error!("{}: %{} = {:?} is on a cycle", context, id, nodes[*id]);
        }
        panic!("{}: {} nodes form a cycle", context, unplaced.len());
    }
}
