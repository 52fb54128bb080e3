// ============================================================
// Layer 3 — Parse Results and Attachment Scoring
// ============================================================
// A ParseResult is what replaying a finished action sequence
// produces: for every token, the index of its head (None for
// the root) and the relation label of the arc attaching it.
//
// Attachment scoring compares a predicted ParseResult with a
// reference one. Tokens whose reference head is None are the
// roots and are left out of the denominator.
//
//   UAS = tokens with the correct head          / non-root tokens
//   LAS = tokens with correct head AND label    / non-root tokens

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    heads:     Vec<Option<usize>>,
    relations: Vec<Option<String>>,
}

impl ParseResult {
    /// A result for `token_count` tokens with nothing attached yet
    pub fn unattached(token_count: usize) -> Self {
        Self {
            heads:     vec![None; token_count],
            relations: vec![None; token_count],
        }
    }

    pub fn from_parts(heads: Vec<Option<usize>>, relations: Vec<Option<String>>) -> Self {
        debug_assert_eq!(heads.len(), relations.len());
        Self { heads, relations }
    }

    pub fn attach(&mut self, dependent: usize, head: usize, relation: &str) {
        self.heads[dependent] = Some(head);
        self.relations[dependent] = Some(relation.to_string());
    }

    pub fn head(&self, token: usize) -> Option<usize> {
        self.heads.get(token).copied().flatten()
    }

    pub fn relation(&self, token: usize) -> Option<&str> {
        self.relations.get(token).and_then(|r| r.as_deref())
    }

    pub fn heads(&self) -> &[Option<usize>] {
        &self.heads
    }

    pub fn relations(&self) -> &[Option<String>] {
        &self.relations
    }

    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// Tokens left without a head
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.heads
            .iter()
            .enumerate()
            .filter(|(_, h)| h.is_none())
            .map(|(i, _)| i)
    }
}

// ─── AttachmentScore ──────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttachmentScore {
    /// Non-root tokens whose predicted head is correct
    pub correct: usize,
    /// ... whose head and relation label are both correct
    pub labeled: usize,
    /// Non-root tokens in the reference
    pub total:   usize,
}

impl AttachmentScore {
    pub fn compare(reference: &ParseResult, predicted: &ParseResult) -> Self {
        let mut score = Self::default();
        for token in 0..reference.len() {
            let Some(gold_head) = reference.head(token) else {
                continue;
            };
            score.total += 1;
            if predicted.head(token) == Some(gold_head) {
                score.correct += 1;
                if predicted.relation(token) == reference.relation(token) {
                    score.labeled += 1;
                }
            }
        }
        score
    }

    pub fn merge(&mut self, other: AttachmentScore) {
        self.correct += other.correct;
        self.labeled += other.labeled;
        self.total += other.total;
    }

    pub fn uas(&self) -> f64 {
        ratio(self.correct, self.total)
    }

    pub fn las(&self) -> f64 {
        ratio(self.labeled, self.total)
    }
}

fn ratio(n: usize, d: usize) -> f64 {
    if d == 0 { 0.0 } else { n as f64 / d as f64 }
}
