// SPDX-License-Identifier: Apache-2.0

use crate::aig::gate::{AigBitVector, AigOperand, AigRef, GateFn, Input, Output};
use crate::aig::topo::topo_sort_refs;

/// Dead-code elimination that is robust to any node ordering.
///
/// Committed approximations leave their target nodes behind with no
/// consumers, and inverters they add are appended after the gates that use
/// them. The result keeps only nodes reachable from an output (plus every
/// input bit and the constant at id 0) and lays them out in topological
/// order, children first.
pub fn dce(orig_fn: &GateFn) -> GateFn {
    let live = orig_fn.live_mask();
    let mut old_to_new = vec![usize::MAX; orig_fn.gates.len()];
    let mut new_gates = Vec::with_capacity(orig_fn.gates.len());

    old_to_new[0] = 0;
    new_gates.push(orig_fn.gates[0].clone());

    for aref in topo_sort_refs(&orig_fn.gates) {
        if !live[aref.id] || aref.id == 0 {
            continue;
        }
        old_to_new[aref.id] = new_gates.len();
        let mut new_node = orig_fn.gates[aref.id].clone();
        for op in new_node.operands_mut() {
            debug_assert_ne!(old_to_new[op.node.id], usize::MAX, "operand not yet remapped");
            op.node.id = old_to_new[op.node.id];
        }
        new_gates.push(new_node);
    }

    let remap = |bv: &AigBitVector| {
        let bits: Vec<AigOperand> = bv
            .iter_lsb_to_msb()
            .map(|bit| AigOperand {
                node: AigRef {
                    id: old_to_new[bit.node.id],
                },
                negated: bit.negated,
            })
            .collect();
        AigBitVector::from_lsb_is_index_0(&bits)
    };

    let result = GateFn {
        name: orig_fn.name.clone(),
        inputs: orig_fn
            .inputs
            .iter()
            .map(|input| Input {
                name: input.name.clone(),
                bit_vector: remap(&input.bit_vector),
            })
            .collect(),
        outputs: orig_fn
            .outputs
            .iter()
            .map(|output| Output {
                name: output.name.clone(),
                bit_vector: remap(&output.bit_vector),
            })
            .collect(),
        gates: new_gates,
    };
    log::debug!(
        "dce: {} -> {} nodes",
        orig_fn.gates.len(),
        result.gates.len()
    );
    result.check_invariants_with_debug_assert();
    result
}
