// SPDX-License-Identifier: Apache-2.0

//! In-place structural edit primitives on a `GateFn`.
//!
//! An AIG gate has a fixed arity, so "remove every fanin then add them back
//! in order" is expressed as a single ordered `set_fanins`.

use crate::aig::fanout::Fanout;
use crate::aig::gate::{AigNode, AigOperand, AigRef, GateFn};

/// Returns the ordered fanin list of a consumer.
pub fn fanins_of(g: &GateFn, fanout: Fanout) -> Result<Vec<AigOperand>, &'static str> {
    match fanout {
        Fanout::Gate(r) => {
            if r.id >= g.gates.len() {
                return Err("Fanout gate ref out of bounds in fanins_of");
            }
            Ok(g.gates[r.id].get_operands())
        }
        Fanout::OutputBit {
            output_idx,
            bit_idx,
        } => {
            let output = g
                .outputs
                .get(output_idx)
                .ok_or("Output index out of bounds in fanins_of")?;
            if bit_idx >= output.get_bit_count() {
                return Err("Output bit index out of bounds in fanins_of");
            }
            Ok(vec![*output.bit_vector.get_lsb(bit_idx)])
        }
    }
}

/// Primitive: overwrites one operand slot of a gate. Returns the previous
/// operand value.
pub fn set_fanin(
    g: &mut GateFn,
    parent: AigRef,
    slot: usize,
    new_op: AigOperand,
) -> Result<AigOperand, &'static str> {
    if parent.id >= g.gates.len() {
        return Err("Parent ref out of bounds in set_fanin");
    }
    if new_op.node.id >= g.gates.len() {
        return Err("New operand out of bounds in set_fanin");
    }
    let mut slots = g.gates[parent.id].operands_mut();
    let target = slots
        .get_mut(slot)
        .ok_or("Operand slot out of range in set_fanin")?;
    let old = **target;
    **target = new_op;
    Ok(old)
}

/// Replaces the whole ordered fanin list of a consumer. The list length must
/// match the consumer's arity.
pub fn set_fanins(g: &mut GateFn, fanout: Fanout, operands: &[AigOperand]) -> Result<(), String> {
    for op in operands {
        if op.node.id >= g.gates.len() {
            return Err(format!("operand {:?} out of bounds in set_fanins", op.node));
        }
    }
    match fanout {
        Fanout::Gate(r) => {
            if r.id >= g.gates.len() {
                return Err(format!("gate {:?} out of bounds in set_fanins", r));
            }
            let mut slots = g.gates[r.id].operands_mut();
            if slots.len() != operands.len() {
                return Err(format!(
                    "gate %{} takes {} fanins, got {}",
                    r.id,
                    slots.len(),
                    operands.len()
                ));
            }
            for (slot, op) in slots.iter_mut().zip(operands) {
                **slot = *op;
            }
            Ok(())
        }
        Fanout::OutputBit {
            output_idx,
            bit_idx,
        } => {
            if operands.len() != 1 {
                return Err(format!(
                    "output bit takes 1 fanin, got {}",
                    operands.len()
                ));
            }
            let output = g
                .outputs
                .get_mut(output_idx)
                .ok_or_else(|| format!("output index {} out of bounds", output_idx))?;
            if bit_idx >= output.get_bit_count() {
                return Err(format!(
                    "bit {} out of bounds for output '{}'",
                    bit_idx, output.name
                ));
            }
            output.bit_vector.set_lsb(bit_idx, operands[0]);
            Ok(())
        }
    }
}

/// Makes `fanout` consume `replacement` wherever it consumed `from`. The
/// polarity of each consuming edge is preserved on top of the replacement's.
/// Returns how many operand slots changed.
pub fn rewire_fanout(
    g: &mut GateFn,
    fanout: Fanout,
    from: AigRef,
    replacement: AigOperand,
) -> Result<usize, String> {
    let mut operands = fanins_of(g, fanout).map_err(|e| e.to_string())?;
    let mut changed = 0;
    for op in operands.iter_mut() {
        if op.node == from {
            *op = AigOperand {
                node: replacement.node,
                negated: op.negated ^ replacement.negated,
            };
            changed += 1;
        }
    }
    if changed > 0 {
        set_fanins(g, fanout, &operands)?;
    }
    Ok(changed)
}

/// Appends an inverter cell driven by `a` and returns it.
pub fn add_inverter(g: &mut GateFn, a: AigOperand) -> AigRef {
    g.validate_ref(a.node);
    let r = AigRef { id: g.gates.len() };
    g.gates.push(AigNode::Inv { a });
    r
}

/// Deletes a node. Only the most recently appended node can be removed, and
/// only once nothing consumes it, so no other id shifts.
pub fn remove_last_gate(g: &mut GateFn, aig_ref: AigRef) -> Result<AigNode, String> {
    if aig_ref.id + 1 != g.gates.len() {
        return Err(format!(
            "can only remove the last node (%{}), asked to remove %{}",
            g.gates.len().saturating_sub(1),
            aig_ref.id
        ));
    }
    if aig_ref.id == 0 {
        return Err("cannot remove the constant node %0".to_string());
    }
    if g.gates.iter().any(|n| n.get_args().contains(&aig_ref))
        || g.output_operands().iter().any(|op| op.node == aig_ref)
    {
        return Err(format!("%{} still has fanouts", aig_ref.id));
    }
    if g.is_primary_input(aig_ref) {
        return Err(format!("%{} is a primary input", aig_ref.id));
    }
    g.gates
        .pop()
        .ok_or_else(|| "gate list unexpectedly empty".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_simple_graph;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_fanin_returns_previous() {
        let mut t = setup_simple_graph();
        let old = set_fanin(&mut t.g, t.o.node, 1, t.c).unwrap();
        assert_eq!(old, t.b);
        assert_eq!(t.g.fanins(t.o.node), vec![t.a, t.c]);
        assert!(set_fanin(&mut t.g, t.o.node, 2, t.c).is_err());
        assert!(set_fanin(&mut t.g, t.i0.node, 0, t.c).is_err());
    }

    #[test]
    fn test_rewire_preserves_edge_polarity() {
        let mut t = setup_simple_graph();
        set_fanin(&mut t.g, t.o.node, 0, t.a.negate()).unwrap();
        let changed = rewire_fanout(&mut t.g, Fanout::Gate(t.o.node), t.a.node, t.c.negate()).unwrap();
        assert_eq!(changed, 1);
        // not(a) with a := not(c) becomes c.
        assert_eq!(t.g.fanins(t.o.node)[0], t.c);
    }

    #[test]
    fn test_rewire_output_bit() {
        let mut t = setup_simple_graph();
        let bit = Fanout::OutputBit {
            output_idx: 1,
            bit_idx: 0,
        };
        assert_eq!(rewire_fanout(&mut t.g, bit, t.c.node, t.b).unwrap(), 1);
        assert_eq!(fanins_of(&t.g, bit).unwrap(), vec![t.b]);
        assert_eq!(rewire_fanout(&mut t.g, bit, t.c.node, t.a).unwrap(), 0);
    }

    #[test]
    fn test_set_fanins_checks_arity() {
        let mut t = setup_simple_graph();
        assert!(set_fanins(&mut t.g, Fanout::Gate(t.o.node), &[t.a]).is_err());
        set_fanins(&mut t.g, Fanout::Gate(t.o.node), &[t.b, t.a]).unwrap();
        assert_eq!(t.g.fanins(t.o.node), vec![t.b, t.a]);
    }

    #[test]
    fn test_inverter_add_and_remove() {
        let mut t = setup_simple_graph();
        let before = t.g.clone();
        let inv = add_inverter(&mut t.g, t.a);
        assert_eq!(t.g.fanins(inv), vec![t.a]);
        set_fanin(&mut t.g, t.o.node, 0, inv.into()).unwrap();
        assert!(remove_last_gate(&mut t.g, inv).is_err());
        set_fanin(&mut t.g, t.o.node, 0, t.a).unwrap();
        assert!(remove_last_gate(&mut t.g, t.o.node).is_err());
        remove_last_gate(&mut t.g, inv).unwrap();
        assert_eq!(t.g, before);
    }
}
