// SPDX-License-Identifier: Apache-2.0

//! Picks which critical nodes to approximate in a round.
//!
//! Every zero-slack gate is split into an in-vertex and an out-vertex joined
//! by an edge whose capacity is the error of the gate's best change (unbounded
//! if it has none). Sources, critical dependencies and critical output ends
//! are joined by unbounded edges, so any finite cut separating the source from
//! the sink consists of split edges only: a set of gates that together cover
//! every critical path, at minimum total error.

use dals_flow::{FlowNetwork, FlowValue};

use crate::aig::gate::{AigRef, GateFn};
use crate::candidates::CandidateSet;
use crate::timing::{DelayModel, TimingInfo, critical_graph};

/// Vertex numbering: node `u` has in-vertex `u` and out-vertex `u + N`, where
/// `N` is the node id space; the source and sink come last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexMap {
    node_count: usize,
}

impl VertexMap {
    pub fn new(node_count: usize) -> Self {
        VertexMap { node_count }
    }

    pub fn in_vertex(&self, aig_ref: AigRef) -> usize {
        aig_ref.id
    }

    pub fn out_vertex(&self, aig_ref: AigRef) -> usize {
        aig_ref.id + self.node_count
    }

    pub fn source(&self) -> usize {
        2 * self.node_count
    }

    pub fn sink(&self) -> usize {
        2 * self.node_count + 1
    }

    pub fn vertex_count(&self) -> usize {
        2 * self.node_count + 2
    }

    /// The node whose split edge is `from -> to`, if it is one.
    pub fn split_node(&self, from: usize, to: usize) -> Option<AigRef> {
        if from < self.node_count && to == from + self.node_count {
            Some(AigRef { id: from })
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Gates to approximate, in the order their split edges were added.
    pub nodes: Vec<AigRef>,
    /// Total error capacity of the cut; infinite when no finite cut exists.
    pub cut_weight: f64,
    pub max_flow: FlowValue,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Builds the split flow network over the zero-slack nodes of `gate_fn`.
pub fn build_network(
    gate_fn: &GateFn,
    timing: &TimingInfo,
    model: &DelayModel,
    candidates: &CandidateSet,
) -> (FlowNetwork, VertexMap) {
    let vm = VertexMap::new(gate_fn.gates.len());
    let mut net = FlowNetwork::new(vm.vertex_count());

    for u in timing.zero_slack_nodes() {
        let critical_output =
            gate_fn.drives_output(u) && timing.arrival(u) == timing.max_delay;
        if gate_fn.is_source(u) {
            net.add_edge(vm.source(), vm.in_vertex(u), f64::INFINITY);
            if critical_output {
                net.add_edge(vm.in_vertex(u), vm.sink(), f64::INFINITY);
            }
        } else {
            let capacity = candidates
                .optimal(u)
                .map(|alc| alc.error())
                .unwrap_or(f64::INFINITY);
            net.add_edge(vm.in_vertex(u), vm.out_vertex(u), capacity);
            if critical_output {
                net.add_edge(vm.out_vertex(u), vm.sink(), f64::INFINITY);
            }
        }
    }

    for (u, successors) in critical_graph(gate_fn, timing, model) {
        let from = if gate_fn.is_source(u) {
            vm.in_vertex(u)
        } else {
            vm.out_vertex(u)
        };
        for v in successors {
            net.add_edge(from, vm.in_vertex(v), f64::INFINITY);
        }
    }
    (net, vm)
}

/// Minimum-error set of gates whose approximation cuts every critical path.
///
/// Empty when no finite cut exists, e.g. when a critical path runs straight
/// from an input to an output or passes only through gates with no
/// substitute.
pub fn select(
    gate_fn: &GateFn,
    timing: &TimingInfo,
    model: &DelayModel,
    candidates: &CandidateSet,
) -> Selection {
    let (mut net, vm) = build_network(gate_fn, timing, model, candidates);
    log::debug!(
        "selector: {} vertices, {} edges",
        net.vertex_count(),
        net.edges().len()
    );
    let Some(cut) = net.min_cut(vm.source(), vm.sink()) else {
        log::debug!("selector: unbounded flow, no finite cut");
        return Selection {
            nodes: Vec::new(),
            cut_weight: f64::INFINITY,
            max_flow: FlowValue::Unbounded,
        };
    };
    let nodes: Vec<AigRef> = cut
        .edges
        .iter()
        .filter_map(|id| {
            let edge = net.edge(*id);
            vm.split_node(edge.from, edge.to)
        })
        .collect();
    debug_assert_eq!(nodes.len(), cut.edges.len(), "cut crosses a non-split edge");
    log::debug!(
        "selector: cut weight {:.6} over {} nodes",
        cut.value,
        nodes.len()
    );
    Selection {
        nodes,
        cut_weight: cut.value,
        max_flow: FlowValue::Finite(cut.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::gate::AigOperand;
    use crate::aig::topo::TopoRanks;
    use crate::alc::Alc;
    use crate::test_utils::{TestGraph, setup_simple_graph};
    use crate::timing::analyze;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn candidates_with(t: &TestGraph, errors: &[(AigOperand, AigOperand, f64)]) -> CandidateSet {
        let ranks = TopoRanks::new(&t.g);
        let mut set = CandidateSet::default();
        for (target, substitute, error) in errors {
            set.insert(
                Alc::new(&t.g, &ranks, target.node, substitute.node, false, *error).unwrap(),
            );
        }
        set
    }

    #[test]
    fn test_vertex_map() {
        let vm = VertexMap::new(5);
        assert_eq!(vm.out_vertex(AigRef { id: 2 }), 7);
        assert_eq!((vm.source(), vm.sink(), vm.vertex_count()), (10, 11, 12));
        assert_eq!(vm.split_node(2, 7), Some(AigRef { id: 2 }));
        assert_eq!(vm.split_node(7, 2), None);
        assert_eq!(vm.split_node(10, 2), None);
    }

    #[test_case(0.6, &["a", "b"] ; "output driver dearer than its fanins")]
    #[test_case(0.4, &["o"] ; "output driver cheapest")]
    #[test_case(0.0, &["o"] ; "zero error output driver")]
    fn test_select_simple_graph(o_error: f64, expected: &[&str]) {
        let t = setup_simple_graph();
        let model = DelayModel::default();
        let timing = analyze(&t.g, &model);
        let set = candidates_with(&t, &[(t.a, t.i0, 0.3), (t.b, t.i1, 0.2), (t.o, t.a, o_error)]);
        let selection = select(&t.g, &timing, &model, &set);
        let name = |r: &AigRef| match *r {
            r if r == t.a.node => "a",
            r if r == t.b.node => "b",
            r if r == t.o.node => "o",
            _ => "?",
        };
        assert_eq!(selection.nodes.iter().map(name).collect::<Vec<_>>(), expected);
        assert_eq!(selection.max_flow, FlowValue::Finite(selection.cut_weight));
    }

    #[test]
    fn test_infeasible_node_is_never_cut() {
        let t = setup_simple_graph();
        let model = DelayModel::default();
        let timing = analyze(&t.g, &model);
        let set = candidates_with(&t, &[(t.a, t.i0, 0.3), (t.b, t.i1, 0.2)]);
        let selection = select(&t.g, &timing, &model, &set);
        assert_eq!(selection.nodes, vec![t.a.node, t.b.node]);
        assert_eq!(selection.cut_weight, 0.5);
    }

    #[test]
    fn test_all_infeasible_is_empty_selection() {
        let t = setup_simple_graph();
        let model = DelayModel::default();
        let timing = analyze(&t.g, &model);
        let selection = select(&t.g, &timing, &model, &CandidateSet::default());
        assert!(selection.is_empty());
        assert_eq!(selection.max_flow, FlowValue::Unbounded);
    }

    #[test]
    fn test_non_critical_output_has_no_sink_edge() {
        let t = setup_simple_graph();
        let model = DelayModel::default();
        let timing = analyze(&t.g, &model);
        let (net, vm) = build_network(&t.g, &timing, &model, &CandidateSet::default());
        let into_sink: Vec<usize> = net
            .edges()
            .iter()
            .filter(|e| e.to == vm.sink())
            .map(|e| e.from)
            .collect();
        // `c` drives an output but arrives before the maximum delay.
        assert_eq!(into_sink, vec![vm.out_vertex(t.o.node)]);
    }
}
