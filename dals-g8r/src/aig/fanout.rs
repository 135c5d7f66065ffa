// SPDX-License-Identifier: Apache-2.0

use crate::aig::gate::{AigRef, GateFn};

/// A consumer of a node's value: either another gate or a primary-output bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Fanout {
    Gate(AigRef),
    OutputBit { output_idx: usize, bit_idx: usize },
}

/// Per-node list of consumers, built in one sweep over the arena.
///
/// Gate consumers come first in id order, then output bits in signature
/// order. A gate that uses the same node on both of its operands is listed
/// once.
#[derive(Debug, Clone)]
pub struct FanoutIndex {
    fanouts: Vec<Vec<Fanout>>,
}

impl FanoutIndex {
    pub fn new(gate_fn: &GateFn) -> Self {
        let mut fanouts: Vec<Vec<Fanout>> = vec![Vec::new(); gate_fn.gates.len()];
        for (id, node) in gate_fn.gates.iter().enumerate() {
            let mut args = node.get_args();
            args.dedup();
            for arg in args {
                fanouts[arg.id].push(Fanout::Gate(AigRef { id }));
            }
        }
        for (output_idx, output) in gate_fn.outputs.iter().enumerate() {
            for (bit_idx, bit) in output.bit_vector.iter_lsb_to_msb().enumerate() {
                fanouts[bit.node.id].push(Fanout::OutputBit {
                    output_idx,
                    bit_idx,
                });
            }
        }
        FanoutIndex { fanouts }
    }

    pub fn fanouts(&self, aig_ref: AigRef) -> &[Fanout] {
        &self.fanouts[aig_ref.id]
    }

    pub fn fanout_count(&self, aig_ref: AigRef) -> usize {
        self.fanouts[aig_ref.id].len()
    }
}

/// Current consumers of a single node, without building a full index.
pub fn fanouts_of(gate_fn: &GateFn, aig_ref: AigRef) -> Vec<Fanout> {
    let mut result = Vec::new();
    for (id, node) in gate_fn.gates.iter().enumerate() {
        if node.get_args().contains(&aig_ref) {
            result.push(Fanout::Gate(AigRef { id }));
        }
    }
    for (output_idx, output) in gate_fn.outputs.iter().enumerate() {
        for (bit_idx, bit) in output.bit_vector.iter_lsb_to_msb().enumerate() {
            if bit.node == aig_ref {
                result.push(Fanout::OutputBit {
                    output_idx,
                    bit_idx,
                });
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate_builder::{GateBuilder, GateBuilderOptions};
    use crate::test_utils::setup_simple_graph;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fanouts_simple_graph() {
        let t = setup_simple_graph();
        let index = FanoutIndex::new(&t.g);
        assert_eq!(
            index.fanouts(t.i1.node),
            &[Fanout::Gate(t.a.node), Fanout::Gate(t.b.node)]
        );
        assert_eq!(
            index.fanouts(t.c.node),
            &[Fanout::OutputBit {
                output_idx: 1,
                bit_idx: 0
            }]
        );
        assert_eq!(index.fanout_count(t.o.node), 1);
        assert_eq!(index.fanout_count(t.i0.node), 1);
    }

    #[test]
    fn test_index_agrees_with_single_node_query() {
        let t = setup_simple_graph();
        let index = FanoutIndex::new(&t.g);
        for id in 0..t.g.gates.len() {
            let r = AigRef { id };
            assert_eq!(index.fanouts(r), fanouts_of(&t.g, r).as_slice());
        }
    }

    #[test]
    fn test_same_operand_twice_listed_once() {
        let mut gb = GateBuilder::new("dup".to_string(), GateBuilderOptions::no_opt());
        let x = gb.add_input("x".to_string(), 1);
        let x0 = *x.get_lsb(0);
        let y = gb.add_and_binary(x0, x0.negate());
        gb.add_output("o".to_string(), y.into());
        let g = gb.build();
        let index = FanoutIndex::new(&g);
        assert_eq!(index.fanouts(x0.node), &[Fanout::Gate(y.node)]);
    }
}
