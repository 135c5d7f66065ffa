// SPDX-License-Identifier: Apache-2.0

use anyhow::{Result, anyhow};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::aig::gate::GateFn;
use crate::aig_sim::stimulus::Stimulus;
use crate::aig_sim::truth_vec::simulate;

/// How disagreement between two circuits' outputs is scored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMetric {
    /// Fraction of simulated output bits that differ.
    #[default]
    BitFlip,
    /// Fraction of input patterns on which any output bit differs.
    Pattern,
}

/// The output words of one circuit under a stimulus.
#[derive(Debug, Clone)]
pub struct OutputSamples {
    /// One row per output bit, in signature order, polarity applied.
    bits: Vec<Vec<u64>>,
    sample_words: usize,
}

impl OutputSamples {
    pub fn capture(gate_fn: &GateFn, stimulus: &Stimulus) -> Result<Self> {
        let tv = simulate(gate_fn, stimulus)?;
        let bits = gate_fn
            .output_operands()
            .into_iter()
            .map(|op| tv.operand_words(op))
            .collect();
        Ok(OutputSamples {
            bits,
            sample_words: stimulus.sample_words(),
        })
    }

    pub fn output_bit_count(&self) -> usize {
        self.bits.len()
    }

    /// Error of `other` measured against `self` as the reference.
    pub fn error_rate(&self, other: &OutputSamples, metric: ErrorMetric) -> Result<f64> {
        if self.bits.len() != other.bits.len() || self.sample_words != other.sample_words {
            return Err(anyhow!(
                "cannot compare {} output bits x {} words against {} x {}",
                other.bits.len(),
                other.sample_words,
                self.bits.len(),
                self.sample_words
            ));
        }
        let patterns = 64 * self.sample_words as u64;
        match metric {
            ErrorMetric::BitFlip => {
                let total = patterns * self.bits.len() as u64;
                if total == 0 {
                    return Ok(0.0);
                }
                let differing: u64 = self
                    .bits
                    .iter()
                    .zip(&other.bits)
                    .map(|(x, y)| popcount_xor(x, y))
                    .sum();
                Ok(differing as f64 / total as f64)
            }
            ErrorMetric::Pattern => {
                if patterns == 0 || self.bits.is_empty() {
                    return Ok(0.0);
                }
                let mut differing = 0u64;
                for w in 0..self.sample_words {
                    let any = self
                        .bits
                        .iter()
                        .zip(&other.bits)
                        .fold(0u64, |acc, (x, y)| acc | (x[w] ^ y[w]));
                    differing += u64::from(any.count_ones());
                }
                Ok(differing as f64 / patterns as f64)
            }
        }
    }
}

/// Number of positions where two equally long word slices differ.
pub fn popcount_xor(x: &[u64], y: &[u64]) -> u64 {
    debug_assert_eq!(x.len(), y.len());
    x.iter()
        .zip(y)
        .map(|(a, b)| u64::from((a ^ b).count_ones()))
        .sum()
}

/// Error of `approx` relative to `golden` under a shared stimulus. The two
/// circuits must have the same input and output shapes.
pub fn global_error_rate(
    golden: &GateFn,
    approx: &GateFn,
    stimulus: &Stimulus,
    metric: ErrorMetric,
) -> Result<f64> {
    if !golden.same_io_shape(approx) {
        return Err(anyhow!(
            "signature mismatch: {} vs {}",
            golden.get_signature(),
            approx.get_signature()
        ));
    }
    let reference = OutputSamples::capture(golden, stimulus)?;
    let measured = OutputSamples::capture(approx, stimulus)?;
    reference.error_rate(&measured, metric)
}
