// SPDX-License-Identifier: Apache-2.0

pub mod aig;
pub mod aig_sim;
pub mod alc;
pub mod candidates;
pub mod dals;
pub mod gate_builder;
pub mod gate_parser;
pub mod selector;
pub mod test_utils;
pub mod timing;
