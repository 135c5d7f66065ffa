// SPDX-License-Identifier: Apache-2.0

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

use crate::aig::gate::GateFn;

/// Fixed input words for every primary-input bit, in signature order (first
/// input's LSb first). Both circuits under comparison are driven by the same
/// stimulus so their outputs line up pattern for pattern.
#[derive(Debug, Clone)]
pub struct Stimulus {
    input_words: Vec<Vec<u64>>,
    sample_words: usize,
}

impl Stimulus {
    pub fn random(gate_fn: &GateFn, sample_words: usize, seed: u64) -> Self {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let input_words = (0..gate_fn.input_bit_count())
            .map(|_| (0..sample_words).map(|_| rng.r#gen::<u64>()).collect())
            .collect();
        log::debug!(
            "stimulus: {} input bits x {} words (seed {})",
            gate_fn.input_bit_count(),
            sample_words,
            seed
        );
        Stimulus {
            input_words,
            sample_words,
        }
    }

    /// Explicit stimulus; every row must have the same number of words.
    pub fn from_words(input_words: Vec<Vec<u64>>) -> Self {
        let sample_words = input_words.first().map_or(0, |w| w.len());
        assert!(
            input_words.iter().all(|w| w.len() == sample_words),
            "all stimulus rows must have {} words",
            sample_words
        );
        Stimulus {
            input_words,
            sample_words,
        }
    }

    pub fn sample_words(&self) -> usize {
        self.sample_words
    }

    /// Number of simulated patterns.
    pub fn sample_bits(&self) -> usize {
        64 * self.sample_words
    }

    pub fn input_bit_count(&self) -> usize {
        self.input_words.len()
    }

    pub fn words_for_bit(&self, flat_bit_index: usize) -> &[u64] {
        &self.input_words[flat_bit_index]
    }
}
