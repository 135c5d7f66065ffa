// SPDX-License-Identifier: Apache-2.0

pub mod dce;
pub mod edit;
pub mod fanout;
pub mod gate;
pub mod topo;

pub use crate::aig::fanout::{Fanout, FanoutIndex};
pub use crate::aig::gate::{AigBitVector, AigNode, AigOperand, AigRef, GateFn, Input, Output};
pub use crate::gate_builder::{GateBuilder, GateBuilderOptions};
