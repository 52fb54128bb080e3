// ============================================================
// Layer 4 — Unknown-Word Policy
// ============================================================
// The parser always receives two parallel id streams:
//
//   raw ids   true vocabulary ids, used for pretrained lookup
//   ids       the same ids with some words replaced by UNK,
//             used for the learned embedding table
//
// Training:   each singleton (a word seen exactly once in the
//             training corpus) becomes UNK with probability
//             `probability`, drawn independently per occurrence.
// Evaluation: every word outside the training vocabulary
//             becomes UNK.

use rand::Rng;
use std::collections::HashSet;

use crate::data::vocab::UNK_ID;

#[derive(Debug, Clone)]
pub struct UnkPolicy {
    training_vocab: HashSet<usize>,
    singletons:     HashSet<usize>,
    probability:    f64,
}

impl UnkPolicy {
    pub fn new(training_vocab: HashSet<usize>, singletons: HashSet<usize>, probability: f64) -> Self {
        debug_assert!((0.0..=1.0).contains(&probability));
        Self { training_vocab, singletons, probability }
    }

    /// Stochastic singleton replacement for a training step
    pub fn for_training<R: Rng + ?Sized>(&self, raw: &[usize], rng: &mut R) -> Vec<usize> {
        raw.iter()
            .map(|&id| {
                if self.singletons.contains(&id) && rng.gen::<f64>() < self.probability {
                    UNK_ID
                } else {
                    id
                }
            })
            .collect()
    }

    /// Deterministic replacement of out-of-vocabulary words
    pub fn for_evaluation(&self, raw: &[usize]) -> Vec<usize> {
        raw.iter()
            .map(|&id| if self.training_vocab.contains(&id) { id } else { UNK_ID })
            .collect()
    }

    pub fn is_singleton(&self, id: usize) -> bool {
        self.singletons.contains(&id)
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}
