// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::aig::topo::topo_sort_refs;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct AigRef {
    pub id: usize,
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct AigOperand {
    pub node: AigRef,
    pub negated: bool,
}

impl AigOperand {
    #[must_use]
    pub fn negate(&self) -> Self {
        Self {
            node: self.node,
            negated: !self.negated,
        }
    }
}

impl From<AigRef> for AigOperand {
    fn from(node: AigRef) -> Self {
        AigOperand {
            node,
            negated: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AigNode {
    Input {
        name: String,
        /// Index where 0 is the least significant bit of the input.
        lsb_index: usize,
    },
    Literal(bool),
    And2 {
        a: AigOperand,
        b: AigOperand,
        tags: Option<Vec<String>>,
    },
    /// An explicit inverter cell. Unlike a negated edge it is a gate of its
    /// own and contributes a gate delay.
    Inv { a: AigOperand },
}

impl AigNode {
    pub fn get_operands(&self) -> Vec<AigOperand> {
        match self {
            AigNode::Input { .. } | AigNode::Literal(_) => vec![],
            AigNode::And2 { a, b, .. } => vec![*a, *b],
            AigNode::Inv { a } => vec![*a],
        }
    }

    pub fn get_args(&self) -> Vec<AigRef> {
        self.get_operands().iter().map(|op| op.node).collect()
    }

    /// Mutable access to the operand slots, in the same order as
    /// `get_operands`.
    pub fn operands_mut(&mut self) -> Vec<&mut AigOperand> {
        match self {
            AigNode::Input { .. } | AigNode::Literal(_) => vec![],
            AigNode::And2 { a, b, .. } => vec![a, b],
            AigNode::Inv { a } => vec![a],
        }
    }

    /// Inputs and literals: nodes with no fanins, arriving at time zero.
    pub fn is_source(&self) -> bool {
        matches!(self, AigNode::Input { .. } | AigNode::Literal(_))
    }

    pub fn is_gate(&self) -> bool {
        !self.is_source()
    }

    pub fn get_tags(&self) -> Option<&[String]> {
        match self {
            AigNode::And2 {
                tags: Some(tags), ..
            } => Some(tags.as_slice()),
            _ => None,
        }
    }
}

/// Ordered bits of a named input or output; index 0 is the LSb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AigBitVector {
    bits: Vec<AigOperand>,
}

impl From<AigOperand> for AigBitVector {
    fn from(bit: AigOperand) -> Self {
        AigBitVector { bits: vec![bit] }
    }
}

impl TryFrom<AigBitVector> for AigOperand {
    type Error = String;

    fn try_from(bit_vector: AigBitVector) -> Result<Self, Self::Error> {
        match bit_vector.bits.as_slice() {
            [bit] => Ok(*bit),
            bits => Err(format!("expected a 1-bit vector, got {} bits", bits.len())),
        }
    }
}

impl AigBitVector {
    pub fn from_lsb_is_index_0(bits: &[AigOperand]) -> Self {
        AigBitVector {
            bits: bits.to_vec(),
        }
    }

    pub fn iter_lsb_to_msb(&self) -> impl DoubleEndedIterator<Item = &AigOperand> {
        self.bits.iter()
    }

    pub fn get_lsb(&self, index: usize) -> &AigOperand {
        &self.bits[index]
    }

    pub fn set_lsb(&mut self, index: usize, operand: AigOperand) {
        self.bits[index] = operand;
    }

    pub fn get_bit_count(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

impl fmt::Display for AigBitVector {
    /// `bits[w] = [%3, not(%4)]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bits[{}] = [", self.bits.len())?;
        for (i, bit) in self.bits.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if bit.negated {
                write!(f, "not(%{})", bit.node.id)?;
            } else {
                write!(f, "%{}", bit.node.id)?;
            }
        }
        f.write_str("]")
    }
}

/// A named input bundle. Every bit is a distinct `AigNode::Input`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub name: String,
    pub bit_vector: AigBitVector,
}

impl Input {
    pub fn get_bit_count(&self) -> usize {
        self.bit_vector.get_bit_count()
    }
}

/// A named output bundle; its bits may be complemented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub name: String,
    pub bit_vector: AigBitVector,
}

impl Output {
    pub fn get_bit_count(&self) -> usize {
        self.bit_vector.get_bit_count()
    }
}

/// A combinational circuit: named input and output bundles over a flat node
/// arena. Node ids index `gates`; id 0 is always `Literal(false)`.
///
/// Cloning yields a fully independent copy, which is how the golden and
/// working circuits are kept apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateFn {
    pub name: String,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub gates: Vec<AigNode>,
}

impl fmt::Display for GateFn {
    /// Emits every non-input node in topological order, including nodes that
    /// no output reaches anymore, so the text parses back to the same arena.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.check_invariants_with_debug_assert();
        let bundles = |named: Vec<(&str, &AigBitVector)>| {
            named
                .into_iter()
                .map(|(name, bits)| format!("{}: {}", name, bits))
                .collect::<Vec<_>>()
                .join(", ")
        };
        writeln!(
            f,
            "fn {}({}) -> ({}) {{",
            self.name,
            bundles(self.inputs.iter().map(|i| (i.name.as_str(), &i.bit_vector)).collect()),
            bundles(self.outputs.iter().map(|o| (o.name.as_str(), &o.bit_vector)).collect()),
        )?;

        let operand = |op: &AigOperand| {
            let node = self.node_name(op.node);
            if op.negated {
                format!("not({})", node)
            } else {
                node
            }
        };
        for r in topo_sort_refs(&self.gates) {
            match self.get(r) {
                AigNode::Input { .. } => {}
                AigNode::Literal(value) => writeln!(f, "  %{} = literal({})", r.id, value)?,
                AigNode::Inv { a } => writeln!(f, "  %{} = inv({})", r.id, operand(a))?,
                AigNode::And2 { a, b, tags } => {
                    write!(f, "  %{} = and({}, {}", r.id, operand(a), operand(b))?;
                    if let Some(tags) = tags {
                        write!(f, ", tags=[{}]", tags.join(", "))?;
                    }
                    writeln!(f, ")")?;
                }
            }
        }
        for output in &self.outputs {
            for (i, bit) in output.bit_vector.iter_lsb_to_msb().enumerate() {
                let node = format!("%{}", bit.node.id);
                if bit.negated {
                    writeln!(f, "  {}[{}] = not({})", output.name, i, node)?;
                } else {
                    writeln!(f, "  {}[{}] = {}", output.name, i, node)?;
                }
            }
        }
        f.write_str("}")
    }
}

impl GateFn {
    pub fn get(&self, aig_ref: AigRef) -> &AigNode {
        &self.gates[aig_ref.id]
    }

    /// Ordered fanin operands of a node.
    pub fn fanins(&self, aig_ref: AigRef) -> Vec<AigOperand> {
        self.get(aig_ref).get_operands()
    }

    pub fn is_primary_input(&self, aig_ref: AigRef) -> bool {
        matches!(self.get(aig_ref), AigNode::Input { .. })
    }

    pub fn is_source(&self, aig_ref: AigRef) -> bool {
        self.get(aig_ref).is_source()
    }

    /// Returns true if the node drives at least one primary output bit.
    pub fn drives_output(&self, aig_ref: AigRef) -> bool {
        self.output_operands().iter().any(|op| op.node == aig_ref)
    }

    pub fn node_name(&self, aig_ref: AigRef) -> String {
        match self.get(aig_ref) {
            AigNode::Input { name, lsb_index } => format!("{}[{}]", name, lsb_index),
            _ => format!("%{}", aig_ref.id),
        }
    }

    pub fn output_operands(&self) -> Vec<AigOperand> {
        self.outputs
            .iter()
            .flat_map(|output| output.bit_vector.iter_lsb_to_msb().copied())
            .collect()
    }

    pub fn output_bit_count(&self) -> usize {
        self.outputs.iter().map(|o| o.get_bit_count()).sum()
    }

    pub fn input_bit_count(&self) -> usize {
        self.inputs.iter().map(|i| i.get_bit_count()).sum()
    }

    /// Marks nodes reachable from the outputs. Input bits are always live.
    pub fn live_mask(&self) -> Vec<bool> {
        let mut live = vec![false; self.gates.len()];
        for input in &self.inputs {
            for bit in input.bit_vector.iter_lsb_to_msb() {
                live[bit.node.id] = true;
            }
        }
        let mut stack: Vec<AigRef> = self.output_operands().iter().map(|op| op.node).collect();
        let mut visited = vec![false; self.gates.len()];
        while let Some(current) = stack.pop() {
            if visited[current.id] {
                continue;
            }
            visited[current.id] = true;
            live[current.id] = true;
            stack.extend(self.get(current).get_args());
        }
        live
    }

    /// Number of live `And2`/`Inv` nodes.
    pub fn gate_count(&self) -> usize {
        self.live_mask()
            .iter()
            .zip(self.gates.iter())
            .filter(|(live, node)| **live && node.is_gate())
            .count()
    }

    /// `fn name(a: bits[2], b: bits[1]) -> (o: bits[1])`, names and widths
    /// only. Two circuits with equal signatures can share a stimulus.
    pub fn get_signature(&self) -> String {
        let widths = |named: Vec<(&str, usize)>| {
            named
                .iter()
                .map(|(name, width)| format!("{}: bits[{}]", name, width))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "fn {}({}) -> ({})",
            self.name,
            widths(self.inputs.iter().map(|i| (i.name.as_str(), i.get_bit_count())).collect()),
            widths(self.outputs.iter().map(|o| (o.name.as_str(), o.get_bit_count())).collect()),
        )
    }

    /// Returns true if both functions take and produce the same bit shapes,
    /// ignoring names.
    pub fn same_io_shape(&self, other: &GateFn) -> bool {
        let input_widths =
            |g: &GateFn| g.inputs.iter().map(|i| i.get_bit_count()).collect::<Vec<_>>();
        let output_widths =
            |g: &GateFn| g.outputs.iter().map(|o| o.get_bit_count()).collect::<Vec<_>>();
        input_widths(self) == input_widths(other) && output_widths(self) == output_widths(other)
    }

    /// Panics in debug builds if any input, output or fanin names a node id
    /// outside the arena.
    pub fn check_invariants_with_debug_assert(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        let io_bits = self
            .inputs
            .iter()
            .map(|i| &i.bit_vector)
            .chain(self.outputs.iter().map(|o| &o.bit_vector))
            .flat_map(|bv| bv.iter_lsb_to_msb().copied());
        for bit in io_bits {
            self.validate_ref(bit.node);
        }
        for node in &self.gates {
            for arg in node.get_args() {
                self.validate_ref(arg);
            }
        }
    }

    pub fn validate_ref(&self, aig_ref: AigRef) {
        assert!(
            aig_ref.id < self.gates.len(),
            "%{} is outside the {}-node arena of {}",
            aig_ref.id,
            self.gates.len(),
            self.name
        );
    }
}
