// SPDX-License-Identifier: Apache-2.0

//! Parser for the textual `GateFn` format emitted by `GateFn::to_string`:
//!
//! ```text
//! fn f(a: bits[2] = [%1, %2]) -> (o: bits[1] = [%4]) {
//!   %3 = and(a[0], not(a[1]))
//!   %4 = inv(%3)
//!   o[0] = %4
//! }
//! ```

use std::collections::HashMap;

use crate::aig::gate::{AigBitVector, AigNode, AigOperand, AigRef, GateFn, Input, Output};
use crate::aig::topo::topo_order_and_cycle_check;

/// Parse failure, with the line and column when it was tied to a position in
/// the text.
#[derive(Debug)]
pub struct ParseError {
    msg: String,
    position: Option<(usize, usize)>,
}

impl ParseError {
    fn new(msg: String) -> Self {
        ParseError {
            msg,
            position: None,
        }
    }

    fn at(msg: String, text: &str, offset: usize) -> Self {
        let consumed = &text[..offset];
        let line = consumed.matches('\n').count() + 1;
        let line_start = consumed.rfind('\n').map_or(0, |i| i + 1);
        let column = consumed[line_start..].chars().count() + 1;
        ParseError {
            msg,
            position: Some((line, column)),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.position {
            Some((line, column)) => write!(
                f,
                "gate fn parse error at line {}, column {}: {}",
                line, column, self.msg
            ),
            None => write!(f, "gate fn parse error: {}", self.msg),
        }
    }
}

impl std::error::Error for ParseError {}

struct Parser<'a> {
    text: &'a str,
    offset: usize,
    /// `(bundle name, bit index)` to node id for every declared input bit.
    input_ids: HashMap<(String, usize), usize>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Parser {
            text,
            offset: 0,
            input_ids: HashMap::new(),
        }
    }

    fn remaining(&self) -> &'a str {
        &self.text[self.offset..]
    }

    fn skip_ws(&mut self) {
        let rest = self.remaining();
        self.offset += rest.len() - rest.trim_start().len();
    }

    fn error(&self, msg: String) -> ParseError {
        ParseError::at(msg, self.text, self.offset)
    }

    /// Consumes `token` if it comes next, ignoring leading whitespace.
    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        let matched = self.remaining().starts_with(token);
        if matched {
            self.offset += token.len();
        }
        matched
    }

    fn expect(&mut self, token: &str) -> Result<(), ParseError> {
        if self.eat(token) {
            return Ok(());
        }
        let found: String = self.remaining().chars().take(12).collect();
        Err(self.error(format!("expected '{}', found '{}'", token, found)))
    }

    /// Consumes the longest prefix whose chars satisfy `pred`.
    fn take_while(&mut self, pred: impl Fn(usize, char) -> bool) -> &'a str {
        self.skip_ws();
        let rest = self.remaining();
        let len: usize = rest
            .char_indices()
            .take_while(|(i, c)| pred(*i, *c))
            .map(|(_, c)| c.len_utf8())
            .sum();
        self.offset += len;
        &rest[..len]
    }

    fn identifier(&mut self) -> Result<String, ParseError> {
        let word = self.take_while(|i, c| c == '_' || c.is_alphabetic() || (i > 0 && c.is_alphanumeric()));
        if word.is_empty() {
            return Err(self.error("expected an identifier".to_string()));
        }
        Ok(word.to_string())
    }

    fn number(&mut self) -> Result<usize, ParseError> {
        let digits = self.take_while(|_, c| c.is_ascii_digit());
        if digits.is_empty() {
            return Err(self.error("expected a number".to_string()));
        }
        digits
            .parse()
            .map_err(|e| self.error(format!("number '{}' out of range: {}", digits, e)))
    }

    /// Parses `item (, item)* close`, or just `close`. The opening
    /// delimiter has already been consumed.
    fn list<T>(
        &mut self,
        close: &str,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(item(self)?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(",")?;
        }
    }

    /// `%id`, `name[bit]` or either wrapped in `not(...)`.
    fn operand(&mut self) -> Result<AigOperand, ParseError> {
        let negated = self.eat("not(");
        let id = if self.eat("%") {
            self.number()?
        } else {
            let name = self.identifier()?;
            self.expect("[")?;
            let bit = self.number()?;
            self.expect("]")?;
            *self
                .input_ids
                .get(&(name.clone(), bit))
                .ok_or_else(|| self.error(format!("{}[{}] is not an input bit", name, bit)))?
        };
        if negated {
            self.expect(")")?;
        }
        Ok(AigOperand {
            node: AigRef { id },
            negated,
        })
    }

    /// `name: bits[w] = [operands]`
    fn io_entry(&mut self) -> Result<(String, AigBitVector), ParseError> {
        let name = self.identifier()?;
        self.expect(":")?;
        self.expect("bits[")?;
        let width = self.number()?;
        self.expect("]")?;
        self.expect("=")?;
        self.expect("[")?;
        let bits = self.list("]", Self::operand)?;
        if bits.len() != width {
            return Err(self.error(format!(
                "'{}' is declared {} bits wide but lists {} bits",
                name,
                width,
                bits.len()
            )));
        }
        Ok((name, AigBitVector::from_lsb_is_index_0(&bits)))
    }

    fn io_list(&mut self) -> Result<Vec<(String, AigBitVector)>, ParseError> {
        self.expect("(")?;
        self.list(")", Self::io_entry)
    }

    /// The right-hand side of `%id = ...`.
    fn node_body(&mut self) -> Result<AigNode, ParseError> {
        if self.eat("and(") {
            let a = self.operand()?;
            self.expect(",")?;
            let b = self.operand()?;
            let tags = if self.eat(",") {
                self.expect("tags=[")?;
                Some(self.list("]", Self::identifier)?)
            } else {
                None
            };
            self.expect(")")?;
            Ok(AigNode::And2 { a, b, tags })
        } else if self.eat("inv(") {
            let a = self.operand()?;
            self.expect(")")?;
            Ok(AigNode::Inv { a })
        } else if self.eat("literal(") {
            let value = if self.eat("true") {
                true
            } else if self.eat("false") {
                false
            } else {
                self.number()? != 0
            };
            self.expect(")")?;
            Ok(AigNode::Literal(value))
        } else {
            Err(self.error("expected and(, inv( or literal(".to_string()))
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_ws();
        self.remaining().is_empty()
    }
}

pub fn parse_gate_fn(text: &str) -> Result<GateFn, ParseError> {
    let mut p = Parser::new(text);
    p.expect("fn")?;
    let name = p.identifier()?;
    let declared_inputs = p.io_list()?;
    p.expect("->")?;
    let declared_outputs = p.io_list()?;
    p.expect("{")?;

    let mut defined: HashMap<usize, AigNode> = HashMap::from([(0, AigNode::Literal(false))]);
    let mut inputs = Vec::with_capacity(declared_inputs.len());
    for (input_name, bit_vector) in declared_inputs {
        for (lsb_index, bit) in bit_vector.iter_lsb_to_msb().enumerate() {
            if bit.negated {
                return Err(ParseError::new(format!(
                    "input bit {}[{}] is negated",
                    input_name, lsb_index
                )));
            }
            p.input_ids
                .insert((input_name.clone(), lsb_index), bit.node.id);
            defined.insert(
                bit.node.id,
                AigNode::Input {
                    name: input_name.clone(),
                    lsb_index,
                },
            );
        }
        inputs.push(Input {
            name: input_name,
            bit_vector,
        });
    }

    loop {
        if p.eat("}") {
            break;
        }
        if p.at_end() {
            return Err(p.error("body is not closed by '}'".to_string()));
        }
        if p.eat("%") {
            let id = p.number()?;
            p.expect("=")?;
            let node = p.node_body()?;
            if let Some(AigNode::Input { name, lsb_index }) = defined.get(&id) {
                return Err(p.error(format!("%{} is already the input bit {}[{}]", id, name, lsb_index)));
            }
            defined.insert(id, node);
        } else {
            // `name[i] = operand` restates what the signature already says.
            p.identifier()?;
            p.expect("[")?;
            p.number()?;
            p.expect("]")?;
            p.expect("=")?;
            p.operand()?;
        }
    }

    let node_count = defined.keys().max().map_or(1, |max| max + 1);
    let gates = (0..node_count)
        .map(|id| {
            defined
                .remove(&id)
                .ok_or_else(|| ParseError::new(format!("node %{} is never defined", id)))
        })
        .collect::<Result<Vec<AigNode>, ParseError>>()?;

    let outputs: Vec<Output> = declared_outputs
        .into_iter()
        .map(|(name, bit_vector)| Output { name, bit_vector })
        .collect();

    let undefined = |op: &&AigOperand| op.node.id >= node_count;
    for (id, node) in gates.iter().enumerate() {
        if let Some(op) = node.get_operands().iter().find(undefined) {
            return Err(ParseError::new(format!(
                "%{} uses undefined node %{}",
                id, op.node.id
            )));
        }
    }
    for output in &outputs {
        if let Some(op) = output.bit_vector.iter_lsb_to_msb().find(undefined) {
            return Err(ParseError::new(format!(
                "output '{}' uses undefined node %{}",
                output.name, op.node.id
            )));
        }
    }
    if let (_, Some(stuck)) = topo_order_and_cycle_check(&gates) {
        return Err(ParseError::new(format!(
            "nodes {:?} form a cycle",
            stuck
        )));
    }

    Ok(GateFn {
        name,
        inputs,
        outputs,
        gates,
    })
}

impl GateFn {
    pub fn from_str(text: &str) -> Result<Self, ParseError> {
        parse_gate_fn(text)
    }
}
