// ============================================================
// Layer 3 — Passage Domain Type
// ============================================================
// One sentence-like unit to parse. The raw ids identify each
// token in the full vocabulary (training words plus words that
// only have a pretrained vector). The UNK-substituted stream is
// derived from these by data::oov right before parsing, so both
// streams always reach the parser together.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Surface forms, kept for output
    pub tokens: Vec<String>,

    /// Vocabulary ids of the surface forms
    pub raw_ids: Vec<usize>,

    /// Reference derivation as indices into the ActionSet.
    /// Present for training and held-out data, absent for raw input.
    pub reference: Option<Vec<usize>>,
}

impl Passage {
    pub fn new(tokens: Vec<String>, raw_ids: Vec<usize>, reference: Option<Vec<usize>>) -> Self {
        debug_assert_eq!(tokens.len(), raw_ids.len());
        Self { tokens, raw_ids, reference }
    }

    pub fn len(&self) -> usize {
        self.raw_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_ids.is_empty()
    }
}
