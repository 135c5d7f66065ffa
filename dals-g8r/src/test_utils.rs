// SPDX-License-Identifier: Apache-2.0

//! Shared circuit fixtures for unit tests, integration tests and benches.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::aig::gate::{AigBitVector, AigNode, AigOperand, AigRef, GateFn};
use crate::gate_builder::{GateBuilder, GateBuilderOptions};

pub struct TestGraph {
    pub g: GateFn,
    pub i0: AigOperand,
    pub i1: AigOperand,
    pub i2: AigOperand,
    pub i3: AigOperand,
    pub a: AigOperand,
    pub b: AigOperand,
    pub c: AigOperand,
    pub o: AigOperand,
}

/// Graph:
/// i0 --\
///       AND(a) --\
/// i1 --|          \
///       AND(b) -- AND(o) [output "o"]
/// i2 --|
///       AND(c) [output "c"]
/// i3 --/
pub fn setup_simple_graph() -> TestGraph {
    let mut gb = GateBuilder::new("g".to_string(), GateBuilderOptions::no_opt());
    let i0: AigOperand = gb.add_input("i0".to_string(), 1).try_into().unwrap();
    let i1: AigOperand = gb.add_input("i1".to_string(), 1).try_into().unwrap();
    let i2: AigOperand = gb.add_input("i2".to_string(), 1).try_into().unwrap();
    let i3: AigOperand = gb.add_input("i3".to_string(), 1).try_into().unwrap();

    let a = gb.add_and_binary(i0, i1);
    let b = gb.add_and_binary(i1, i2);
    let c = gb.add_and_binary(i2, i3);

    let o = gb.add_and_binary(a, b);
    gb.add_output("o".to_string(), o.into());
    gb.add_output("c".to_string(), c.into());

    let g = gb.build();
    TestGraph {
        g,
        i0,
        i1,
        i2,
        i3,
        a,
        b,
        c,
        o,
    }
}

pub struct TestChainGraph {
    pub g: GateFn,
    pub x: AigOperand,
    pub y: AigOperand,
    pub z: AigOperand,
    pub w: AigOperand,
    pub n1: AigOperand,
    pub n2: AigOperand,
    pub n3: AigOperand,
}

/// A three-deep AND chain: `n3 = ((x & y) & z) & w`, output `o = n3`.
pub fn setup_chain_graph() -> TestChainGraph {
    let mut gb = GateBuilder::new("chain".to_string(), GateBuilderOptions::no_opt());
    let x: AigOperand = gb.add_input("x".to_string(), 1).try_into().unwrap();
    let y: AigOperand = gb.add_input("y".to_string(), 1).try_into().unwrap();
    let z: AigOperand = gb.add_input("z".to_string(), 1).try_into().unwrap();
    let w: AigOperand = gb.add_input("w".to_string(), 1).try_into().unwrap();
    let n1 = gb.add_and_binary(x, y);
    let n2 = gb.add_and_binary(n1, z);
    let n3 = gb.add_and_binary(n2, w);
    gb.add_output("o".to_string(), n3.into());
    TestChainGraph {
        g: gb.build(),
        x,
        y,
        z,
        w,
        n1,
        n2,
        n3,
    }
}

pub struct TestRedundantChainGraph {
    pub g: GateFn,
    pub x: AigOperand,
    pub y: AigOperand,
    pub z: AigOperand,
    pub n1: AigOperand,
    pub m: AigOperand,
    pub n2: AigOperand,
    pub n3: AigOperand,
}

/// A three-gate critical path whose last gate is redundant:
/// `n1 = x & y`, `n2 = n1 & z`, `m = x | y`, `n3 = n2 & m`, output `o = n3`.
///
/// `n2` implies `m`, so `n3` computes the same function as `n2`, which
/// arrives one unit earlier. That is the only exact substitution on the
/// critical path: every earlier node put in place of `n1` or `n2` changes
/// the output.
pub fn setup_redundant_chain_graph() -> TestRedundantChainGraph {
    let mut gb = GateBuilder::new("redundant_chain".to_string(), GateBuilderOptions::no_opt());
    let x: AigOperand = gb.add_input("x".to_string(), 1).try_into().unwrap();
    let y: AigOperand = gb.add_input("y".to_string(), 1).try_into().unwrap();
    let z: AigOperand = gb.add_input("z".to_string(), 1).try_into().unwrap();
    let n1 = gb.add_and_binary(x, y);
    let m = gb.add_or_binary(x, y);
    let n2 = gb.add_and_binary(n1, z);
    let n3 = gb.add_and_binary(n2, m);
    gb.add_output("o".to_string(), n3.into());
    TestRedundantChainGraph {
        g: gb.build(),
        x,
        y,
        z,
        n1,
        m,
        n2,
        n3,
    }
}

/// A ladder of `depth` rungs over inputs `a` and `b`:
/// `a' = a & b`, `b' = a & !b`, with both final rungs as outputs.
///
/// Every rung reconverges, so the number of maximum-delay paths doubles
/// with each rung while the gate count only grows by two.
pub fn setup_ladder_graph(depth: usize) -> GateFn {
    let mut gb = GateBuilder::new("ladder".to_string(), GateBuilderOptions::no_opt());
    let mut a: AigOperand = gb.add_input("a".to_string(), 1).try_into().unwrap();
    let mut b: AigOperand = gb.add_input("b".to_string(), 1).try_into().unwrap();
    for _ in 0..depth {
        let next_a = gb.add_and_binary(a, b);
        let next_b = gb.add_and_binary(a, b.negate());
        a = next_a;
        b = next_b;
    }
    gb.add_output("a".to_string(), a.into());
    gb.add_output("b".to_string(), b.into());
    gb.build()
}

/// A random acyclic circuit.
///
/// Every gate draws both operands (with random polarity) from the inputs and
/// the gates built before it; the last `output_bits` gates drive a single
/// output bundle, occasionally through an explicit inverter.
pub fn random_gate_fn(seed: u64, input_bits: usize, gate_count: usize, output_bits: usize) -> GateFn {
    assert!(input_bits > 0, "random_gate_fn needs at least one input bit");
    assert!(
        output_bits > 0 && output_bits <= gate_count,
        "random_gate_fn needs 1..=gate_count output bits"
    );
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut gb = GateBuilder::new(format!("random_{}", seed), GateBuilderOptions::no_opt());
    let input = gb.add_input("x".to_string(), input_bits);
    let mut pool: Vec<AigOperand> = input.iter_lsb_to_msb().copied().collect();
    for _ in 0..gate_count {
        let pick = |rng: &mut Xoshiro256PlusPlus| {
            let op = pool[rng.gen_range(0..pool.len())];
            if rng.gen_bool(0.5) { op.negate() } else { op }
        };
        let a = pick(&mut rng);
        let b = pick(&mut rng);
        let gate = if rng.gen_bool(0.1) {
            gb.add_inv(a)
        } else {
            gb.add_and_binary(a, b)
        };
        pool.push(gate);
    }
    let outputs: Vec<AigOperand> = pool[pool.len() - output_bits..].to_vec();
    gb.add_output(
        "o".to_string(),
        AigBitVector::from_lsb_is_index_0(&outputs),
    );
    gb.build()
}

/// True if both functions have the same interface and every output bit is
/// driven by an identically shaped cone, regardless of node numbering.
/// Dangling nodes are ignored.
pub fn structurally_equivalent(lhs: &GateFn, rhs: &GateFn) -> bool {
    if lhs.get_signature() != rhs.get_signature() {
        return false;
    }
    let lhs_inputs: Vec<AigOperand> = lhs
        .inputs
        .iter()
        .flat_map(|i| i.bit_vector.iter_lsb_to_msb().copied())
        .collect();
    let rhs_inputs: Vec<AigOperand> = rhs
        .inputs
        .iter()
        .flat_map(|i| i.bit_vector.iter_lsb_to_msb().copied())
        .collect();
    let mut matched: HashMap<AigRef, AigRef> = lhs_inputs
        .iter()
        .zip(&rhs_inputs)
        .map(|(l, r)| (l.node, r.node))
        .collect();

    fn same_cone(
        lhs: &GateFn,
        rhs: &GateFn,
        l: AigRef,
        r: AigRef,
        matched: &mut HashMap<AigRef, AigRef>,
    ) -> bool {
        if let Some(prev) = matched.get(&l) {
            return *prev == r;
        }
        let same = match (lhs.get(l), rhs.get(r)) {
            (AigNode::Literal(x), AigNode::Literal(y)) => x == y,
            (AigNode::Inv { a: la }, AigNode::Inv { a: ra }) => {
                la.negated == ra.negated && same_cone(lhs, rhs, la.node, ra.node, matched)
            }
            (
                AigNode::And2 { a: la, b: lb, .. },
                AigNode::And2 { a: ra, b: rb, .. },
            ) => {
                la.negated == ra.negated
                    && lb.negated == rb.negated
                    && same_cone(lhs, rhs, la.node, ra.node, matched)
                    && same_cone(lhs, rhs, lb.node, rb.node, matched)
            }
            _ => false,
        };
        if same {
            matched.insert(l, r);
        }
        same
    }

    lhs.output_operands()
        .iter()
        .zip(rhs.output_operands().iter())
        .all(|(l, r)| l.negated == r.negated && same_cone(lhs, rhs, l.node, r.node, &mut matched))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::topo::topo_order_and_cycle_check;

    #[test]
    fn test_random_gate_fn_is_acyclic_and_deterministic() {
        let g = random_gate_fn(7, 6, 40, 3);
        assert_eq!(g.output_bit_count(), 3);
        assert_eq!(g.input_bit_count(), 6);
        let (_, cycle) = topo_order_and_cycle_check(&g.gates);
        assert!(cycle.is_none());
        assert_eq!(g, random_gate_fn(7, 6, 40, 3));
    }

    #[test]
    fn test_structurally_equivalent_compares_cones() {
        let t = setup_simple_graph();
        assert!(structurally_equivalent(&t.g, &t.g.clone()));
        let other = setup_chain_graph().g;
        assert!(!structurally_equivalent(&t.g, &other));
    }
}
