// SPDX-License-Identifier: Apache-2.0

//! Incremental construction of a `GateFn`.
//!
//! With `GateBuilderOptions::opt()` trivial ANDs are folded away and repeated
//! ANDs are shared. `no_opt()` keeps every requested gate, which is what test
//! circuits want when the exact shape decides which nodes are critical.
//!
//! ```
//! use dals_g8r::gate_builder::{GateBuilder, GateBuilderOptions};
//!
//! let mut gb = GateBuilder::new("and2".to_string(), GateBuilderOptions::opt());
//! let a = *gb.add_input("a".to_string(), 1).get_lsb(0);
//! let b = *gb.add_input("b".to_string(), 1).get_lsb(0);
//! let o = gb.add_and_binary(a, b);
//! gb.add_output("o".to_string(), o.into());
//! let gate_fn = gb.build();
//! assert_eq!(gate_fn.gate_count(), 1);
//! ```

use std::collections::HashMap;

use crate::aig::gate::{AigBitVector, AigNode, AigOperand, AigRef, GateFn, Input, Output};

#[derive(Debug, Clone, Copy)]
pub struct GateBuilderOptions {
    /// Simplify ANDs with a constant, repeated or complementary operand.
    pub fold: bool,
    /// Reuse an existing AND over the same operand pair.
    pub hash: bool,
}

impl GateBuilderOptions {
    pub fn opt() -> Self {
        GateBuilderOptions {
            fold: true,
            hash: true,
        }
    }

    pub fn no_opt() -> Self {
        GateBuilderOptions {
            fold: false,
            hash: false,
        }
    }
}

pub struct GateBuilder {
    pub name: String,
    pub gates: Vec<AigNode>,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub options: GateBuilderOptions,
    /// Existing ANDs keyed by their operand pair, smaller operand first.
    and_table: HashMap<(AigOperand, AigOperand), AigRef>,
}

const FALSE: AigOperand = AigOperand {
    node: AigRef { id: 0 },
    negated: false,
};

fn ordered_pair(lhs: AigOperand, rhs: AigOperand) -> (AigOperand, AigOperand) {
    if (lhs.node.id, lhs.negated) <= (rhs.node.id, rhs.negated) {
        (lhs, rhs)
    } else {
        (rhs, lhs)
    }
}

impl GateBuilder {
    pub fn new(name: String, options: GateBuilderOptions) -> Self {
        GateBuilder {
            name,
            gates: vec![AigNode::Literal(false)],
            inputs: Vec::new(),
            outputs: Vec::new(),
            options,
            and_table: HashMap::new(),
        }
    }

    pub fn build(self) -> GateFn {
        let gate_fn = GateFn {
            name: self.name,
            inputs: self.inputs,
            outputs: self.outputs,
            gates: self.gates,
        };
        gate_fn.check_invariants_with_debug_assert();
        gate_fn
    }

    fn push_node(&mut self, node: AigNode) -> AigRef {
        let r = AigRef {
            id: self.gates.len(),
        };
        self.gates.push(node);
        r
    }

    pub fn get_false(&self) -> AigOperand {
        FALSE
    }

    pub fn get_true(&self) -> AigOperand {
        FALSE.negate()
    }

    pub fn is_known_false(&self, operand: AigOperand) -> bool {
        operand == FALSE
    }

    pub fn is_known_true(&self, operand: AigOperand) -> bool {
        operand == FALSE.negate()
    }

    /// Adds a named input bundle of `bit_count` fresh input nodes.
    pub fn add_input(&mut self, name: String, bit_count: usize) -> AigBitVector {
        let bits: Vec<AigOperand> = (0..bit_count)
            .map(|lsb_index| {
                self.push_node(AigNode::Input {
                    name: name.clone(),
                    lsb_index,
                })
                .into()
            })
            .collect();
        let bit_vector = AigBitVector::from_lsb_is_index_0(&bits);
        self.inputs.push(Input {
            name,
            bit_vector: bit_vector.clone(),
        });
        bit_vector
    }

    pub fn add_output(&mut self, name: String, bit_vector: AigBitVector) {
        debug_assert!(
            bit_vector
                .iter_lsb_to_msb()
                .all(|bit| bit.node.id < self.gates.len()),
            "output '{}' references a node that does not exist yet",
            name
        );
        self.outputs.push(Output { name, bit_vector });
    }

    fn fold_and(&self, lhs: AigOperand, rhs: AigOperand) -> Option<AigOperand> {
        if lhs == FALSE || rhs == FALSE || lhs == rhs.negate() {
            Some(FALSE)
        } else if self.is_known_true(lhs) || lhs == rhs {
            Some(rhs)
        } else if self.is_known_true(rhs) {
            Some(lhs)
        } else {
            None
        }
    }

    pub fn add_and_binary(&mut self, lhs: AigOperand, rhs: AigOperand) -> AigOperand {
        if self.options.fold {
            if let Some(folded) = self.fold_and(lhs, rhs) {
                return folded;
            }
        }
        let key = ordered_pair(lhs, rhs);
        if self.options.hash {
            if let Some(existing) = self.and_table.get(&key) {
                return (*existing).into();
            }
        }
        let r = self.push_node(AigNode::And2 {
            a: lhs,
            b: rhs,
            tags: None,
        });
        if self.options.hash {
            self.and_table.insert(key, r);
        }
        r.into()
    }

    /// Complemented edge; creates no node and costs no delay.
    pub fn add_not(&mut self, arg: AigOperand) -> AigOperand {
        arg.negate()
    }

    /// Explicit inverter cell with a delay of its own. Never folded.
    pub fn add_inv(&mut self, arg: AigOperand) -> AigOperand {
        self.push_node(AigNode::Inv { a: arg }).into()
    }

    pub fn add_or_binary(&mut self, lhs: AigOperand, rhs: AigOperand) -> AigOperand {
        self.add_and_binary(lhs.negate(), rhs.negate()).negate()
    }

    pub fn add_xor_binary(&mut self, lhs: AigOperand, rhs: AigOperand) -> AigOperand {
        let only_rhs = self.add_and_binary(lhs.negate(), rhs);
        let only_lhs = self.add_and_binary(lhs, rhs.negate());
        self.add_or_binary(only_rhs, only_lhs)
    }

    pub fn add_mux2(
        &mut self,
        selector: AigOperand,
        on_true: AigOperand,
        on_false: AigOperand,
    ) -> AigOperand {
        let take_true = self.add_and_binary(selector, on_true);
        let take_false = self.add_and_binary(selector.negate(), on_false);
        self.add_or_binary(take_true, take_false)
    }

    /// ANDs `args` together as a balanced tree, so `n` operands are
    /// `ceil(log2(n))` levels deep.
    pub fn add_and_tree(&mut self, args: &[AigOperand]) -> AigOperand {
        match args {
            [] => self.get_true(),
            [single] => *single,
            _ => {
                let (lo, hi) = args.split_at(args.len() / 2);
                let lo = self.add_and_tree(lo);
                let hi = self.add_and_tree(hi);
                self.add_and_binary(lo, hi)
            }
        }
    }
}
