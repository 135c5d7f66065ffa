// SPDX-License-Identifier: Apache-2.0

use anyhow::{Result, anyhow};

use crate::aig::gate::{AigNode, AigOperand, AigRef, GateFn};
use crate::aig::topo::topo_sort_refs;
use crate::aig_sim::stimulus::Stimulus;

/// Simulated value words of every node, indexed by node id.
#[derive(Debug, Clone)]
pub struct TruthVectors {
    words: Vec<Vec<u64>>,
    sample_words: usize,
}

impl TruthVectors {
    pub fn node_words(&self, aig_ref: AigRef) -> &[u64] {
        &self.words[aig_ref.id]
    }

    pub fn word(&self, aig_ref: AigRef, index: usize) -> u64 {
        self.words[aig_ref.id][index]
    }

    /// Words of an operand, with its edge polarity applied.
    pub fn operand_words(&self, op: AigOperand) -> Vec<u64> {
        let mask = polarity_mask(op);
        self.words[op.node.id].iter().map(|w| w ^ mask).collect()
    }

    pub fn sample_words(&self) -> usize {
        self.sample_words
    }

    pub fn node_count(&self) -> usize {
        self.words.len()
    }
}

fn polarity_mask(op: AigOperand) -> u64 {
    if op.negated { u64::MAX } else { 0 }
}

/// Evaluates every node of the arena, live or not, in topological order.
pub fn simulate(gate_fn: &GateFn, stimulus: &Stimulus) -> Result<TruthVectors> {
    if stimulus.input_bit_count() != gate_fn.input_bit_count() {
        return Err(anyhow!(
            "stimulus drives {} input bits but {} has {}",
            stimulus.input_bit_count(),
            gate_fn.name,
            gate_fn.input_bit_count()
        ));
    }
    let sample_words = stimulus.sample_words();

    let mut input_row: Vec<Option<usize>> = vec![None; gate_fn.gates.len()];
    let mut flat = 0;
    for input in &gate_fn.inputs {
        for bit in input.bit_vector.iter_lsb_to_msb() {
            input_row[bit.node.id] = Some(flat);
            flat += 1;
        }
    }

    let mut words: Vec<Vec<u64>> = vec![Vec::new(); gate_fn.gates.len()];
    for r in topo_sort_refs(&gate_fn.gates) {
        let value: Vec<u64> = match gate_fn.get(r) {
            AigNode::Input { name, lsb_index } => {
                let row = input_row[r.id].ok_or_else(|| {
                    anyhow!(
                        "input node %{} ({}[{}]) is not part of any input bundle",
                        r.id,
                        name,
                        lsb_index
                    )
                })?;
                stimulus.words_for_bit(row).to_vec()
            }
            AigNode::Literal(value) => vec![if *value { u64::MAX } else { 0 }; sample_words],
            AigNode::And2 { a, b, .. } => {
                let (ma, mb) = (polarity_mask(*a), polarity_mask(*b));
                words[a.node.id]
                    .iter()
                    .zip(&words[b.node.id])
                    .map(|(x, y)| (x ^ ma) & (y ^ mb))
                    .collect()
            }
            AigNode::Inv { a } => {
                let ma = polarity_mask(*a);
                words[a.node.id].iter().map(|x| !(x ^ ma)).collect()
            }
        };
        words[r.id] = value;
    }
    log::trace!(
        "simulated {} nodes x {} words for {}",
        words.len(),
        sample_words,
        gate_fn.name
    );
    Ok(TruthVectors {
        words,
        sample_words,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::edit::add_inverter;
    use crate::test_utils::setup_simple_graph;

    #[test]
    fn test_simulate_simple_graph() {
        let mut t = setup_simple_graph();
        let inv = add_inverter(&mut t.g, t.c.negate());
        let stim = Stimulus::from_words(vec![
            vec![0b1010, 0],
            vec![0b1100, u64::MAX],
            vec![0b0110, u64::MAX],
            vec![0b0011, 0],
        ]);
        let tv = simulate(&t.g, &stim).unwrap();
        assert_eq!(tv.sample_words(), 2);
        assert_eq!(tv.node_words(t.a.node), &[0b1000, 0]);
        assert_eq!(tv.node_words(t.b.node), &[0b0100, u64::MAX]);
        assert_eq!(tv.node_words(t.c.node), &[0b0010, 0]);
        assert_eq!(tv.node_words(t.o.node), &[0, 0]);
        // inv(not(c)) == c
        assert_eq!(tv.node_words(inv), tv.node_words(t.c.node));
        assert_eq!(tv.operand_words(t.c.negate()), vec![!0b0010, u64::MAX]);
    }

    #[test]
    fn test_simulate_rejects_wrong_input_count() {
        let t = setup_simple_graph();
        let stim = Stimulus::from_words(vec![vec![0]; 3]);
        assert!(simulate(&t.g, &stim).is_err());
    }
}
