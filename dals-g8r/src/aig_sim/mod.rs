// SPDX-License-Identifier: Apache-2.0

//! Word-parallel simulation: every node carries one `u64` per sample word, so
//! a single pass evaluates 64 input patterns per word.

pub mod error_rate;
pub mod stimulus;
pub mod truth_vec;

pub use error_rate::{ErrorMetric, OutputSamples, global_error_rate};
pub use stimulus::Stimulus;
pub use truth_vec::{TruthVectors, simulate};
