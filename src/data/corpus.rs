// ============================================================
// Layer 4 — Corpus
// ============================================================
// Turns raw passages into id-based Passages and owns the
// tables every later stage needs:
//
//   vocab           word <-> id (training words, then pretrained words)
//   actions         the ActionSet, in first-seen training order
//   training_vocab  ids seen in training passages
//   singletons      ids seen exactly once in training passages
//
// Build order matters and mirrors how ids must be assigned:
//   1. Corpus::from_training       (training words + actions)
//   2. Corpus::attach_pretrained   (words that only have vectors)
//   3. Corpus::intern              (held-out / test passages)
// After step 2 the vocabulary size is final and the model can
// be constructed.

use anyhow::{bail, Context, Result};
use std::collections::{HashMap, HashSet};

use crate::data::{
    oov::UnkPolicy,
    pretrained::{PretrainedTable, PretrainedVectors},
    vocab::Vocabulary,
};
use crate::domain::{
    action::{Action, ActionSet},
    passage::Passage,
    traits::RawPassage,
    transition::replay_legal,
};

pub struct Corpus {
    vocab:          Vocabulary,
    actions:        ActionSet,
    train:          Vec<Passage>,
    training_vocab: HashSet<usize>,
    singletons:     HashSet<usize>,
}

impl Corpus {
    /// Build vocabulary and action set from labeled training passages.
    /// Every reference must be a legal derivation that ends terminal.
    pub fn from_training(raw: Vec<RawPassage>) -> Result<Self> {
        if raw.is_empty() {
            bail!("training corpus is empty");
        }

        let mut vocab = Vocabulary::new();
        let mut actions = ActionSet::new();
        let mut counts: HashMap<usize, usize> = HashMap::new();
        let mut train = Vec::with_capacity(raw.len());

        for (i, passage) in raw.into_iter().enumerate() {
            if passage.actions.is_empty() {
                bail!("training passage {i} has no reference actions");
            }
            let raw_ids: Vec<usize> = passage
                .tokens
                .iter()
                .map(|w| vocab.get_or_insert(w))
                .collect();
            for &id in &raw_ids {
                *counts.entry(id).or_default() += 1;
            }

            let mut reference = Vec::with_capacity(passage.actions.len());
            for text in &passage.actions {
                let action: Action = text
                    .parse()
                    .with_context(|| format!("training passage {i}"))?;
                reference.push(actions.get_or_insert(action));
            }
            let sequence = actions.resolve(&reference)?;
            replay_legal(raw_ids.len(), sequence)
                .with_context(|| format!("training passage {i}: reference is not a legal derivation"))?;

            train.push(Passage::new(passage.tokens, raw_ids, Some(reference)));
        }

        let training_vocab: HashSet<usize> = counts.keys().copied().collect();
        let singletons = counts
            .iter()
            .filter(|(_, &c)| c == 1)
            .map(|(&id, _)| id)
            .collect();

        tracing::info!(
            "Training corpus: {} passages, {} word types, {} actions",
            train.len(),
            vocab.len(),
            actions.len()
        );
        Ok(Self { vocab, actions, train, training_vocab, singletons })
    }

    /// Add pretrained-only words to the vocabulary and key the vectors by id
    pub fn attach_pretrained(&mut self, vectors: PretrainedVectors) -> PretrainedTable {
        let before = self.vocab.len();
        let table = vectors.intern(&mut self.vocab);
        tracing::info!(
            "Pretrained vectors added {} word types ({} total)",
            self.vocab.len() - before,
            self.vocab.len()
        );
        table
    }

    /// Map held-out passages onto the frozen vocabulary and action set.
    /// Unknown words get the UNK id; unknown actions and illegal
    /// references are an error.
    pub fn intern(&self, raw: Vec<RawPassage>) -> Result<Vec<Passage>> {
        raw.into_iter()
            .enumerate()
            .map(|(i, passage)| -> Result<Passage> {
                let raw_ids = passage.tokens.iter().map(|w| self.vocab.get_or_unk(w)).collect();
                let reference = if passage.actions.is_empty() {
                    None
                } else {
                    let ids = passage
                        .actions
                        .iter()
                        .map(|a| self.actions.lookup(a))
                        .collect::<Result<Vec<_>, _>>()
                        .with_context(|| format!("passage {i}"))?;
                    replay_legal(passage.tokens.len(), self.actions.resolve(&ids)?)
                        .with_context(|| format!("passage {i}: reference is not a legal derivation"))?;
                    Some(ids)
                };
                Ok(Passage::new(passage.tokens, raw_ids, reference))
            })
            .collect()
    }

    pub fn unk_policy(&self, probability: f64) -> UnkPolicy {
        UnkPolicy::new(self.training_vocab.clone(), self.singletons.clone(), probability)
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    pub fn train(&self) -> &[Passage] {
        &self.train
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::vocab::UNK_ID;
    use crate::domain::error::ParseError;
    use std::io::Cursor;

    fn raw(tokens: &[&str], actions: &[&str]) -> RawPassage {
        RawPassage {
            tokens:  tokens.iter().map(|s| s.to_string()).collect(),
            actions: actions.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn toy() -> Corpus {
        Corpus::from_training(vec![
            raw(&["the", "cat", "sat"], &["SHIFT", "SHIFT", "LEFT-ARC(det)", "SHIFT", "LEFT-ARC(root)"]),
            raw(&["the", "dog"], &["SHIFT", "SHIFT", "LEFT-ARC(det)"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_builds_vocab_actions_and_singletons() {
        let corpus = toy();
        assert_eq!(corpus.vocab().len(), 5); // <unk> the cat sat dog
        assert_eq!(corpus.actions().len(), 3);
        assert_eq!(corpus.train()[1].reference, Some(vec![0, 0, 1]));

        let policy = corpus.unk_policy(0.2);
        let the = corpus.vocab().get("the").unwrap();
        let cat = corpus.vocab().get("cat").unwrap();
        assert!(!policy.is_singleton(the));
        assert!(policy.is_singleton(cat));
    }

    #[test]
    fn test_rejects_reference_that_does_not_replay() {
        let err = Corpus::from_training(vec![raw(&["a", "b"], &["SHIFT", "LEFT-ARC(x)"])])
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("training passage 0"));
        assert_eq!(
            err.downcast_ref::<ParseError>(),
            Some(&ParseError::IllegalReference { step: 1, action: "LEFT-ARC(x)".into() })
        );
    }

    #[test]
    fn test_rejects_replayable_reference_with_illegal_step() {
        // replays fine, but the final RIGHT-ARC is taken with an empty buffer
        let err = Corpus::from_training(vec![
            raw(&["a", "b"], &["SHIFT", "SHIFT", "LEFT-ARC(x)"]),
            raw(&["the", "cat", "sat"], &["SHIFT", "SHIFT", "LEFT-ARC(det)", "SHIFT", "RIGHT-ARC(root)"]),
        ])
        .err()
        .unwrap();
        assert!(format!("{err:#}").contains("training passage 1"));
        assert_eq!(
            err.downcast_ref::<ParseError>(),
            Some(&ParseError::IllegalReference { step: 4, action: "RIGHT-ARC(root)".into() })
        );
    }

    #[test]
    fn test_rejects_reference_that_stops_early() {
        let err = Corpus::from_training(vec![raw(&["a", "b"], &["SHIFT", "SHIFT"])])
            .err()
            .unwrap();
        assert_eq!(
            err.downcast_ref::<ParseError>(),
            Some(&ParseError::Unfinished { stack: 2, buffer: 0 })
        );
    }

    #[test]
    fn test_intern_rejects_illegal_held_out_reference() {
        let corpus = toy();
        let err = corpus
            .intern(vec![raw(&["the", "dog"], &["SHIFT", "SHIFT", "SHIFT"])])
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("passage 0"));
        assert_eq!(
            err.downcast_ref::<ParseError>(),
            Some(&ParseError::IllegalReference { step: 2, action: "SHIFT".into() })
        );
    }

    #[test]
    fn test_rejects_unlabeled_training_passage() {
        assert!(Corpus::from_training(vec![raw(&["a"], &[])]).is_err());
    }

    #[test]
    fn test_intern_maps_unknown_words_to_unk() {
        let corpus = toy();
        let passages = corpus
            .intern(vec![raw(&["the", "bird"], &["SHIFT", "SHIFT", "LEFT-ARC(det)"])])
            .unwrap();
        assert_eq!(passages[0].raw_ids[1], UNK_ID);
        assert_eq!(passages[0].reference, Some(vec![0, 0, 1]));
    }

    #[test]
    fn test_intern_rejects_unknown_actions() {
        let corpus = toy();
        assert!(corpus.intern(vec![raw(&["a"], &["SWAP"])]).is_err());
    }

    #[test]
    fn test_pretrained_words_get_ids_before_held_out_lookup() {
        let mut corpus = toy();
        let vectors = PretrainedVectors::from_reader(Cursor::new("bird 1 2\n"), 2).unwrap();
        let table = corpus.attach_pretrained(vectors);

        let passages = corpus.intern(vec![raw(&["bird"], &[])]).unwrap();
        let bird = passages[0].raw_ids[0];
        assert_ne!(bird, UNK_ID);
        assert!(table.contains(bird));
        assert!(passages[0].reference.is_none());

        // still OOV for the learned table
        let policy = corpus.unk_policy(0.2);
        assert_eq!(policy.for_evaluation(&[bird]), vec![UNK_ID]);
    }
}
