// ============================================================
// Layer 5 — Held-out Evaluation
// ============================================================
// Greedy-decodes a list of passages with deterministic UNK
// replacement and scores every passage that has a reference:
//
//   reference maps = replay(reference actions)
//   predicted maps = replay(greedy actions)
//
// Both replays check legality at every step, so a greedy
// derivation the transition system would reject fails loudly.
//
// Root tokens of the reference are not counted.

use anyhow::{Context, Result};
use burn::prelude::*;
use std::time::{Duration, Instant};

use crate::data::oov::UnkPolicy;
use crate::domain::{
    action::ActionSet,
    parse::{AttachmentScore, ParseResult},
    passage::Passage,
    transition::replay_legal,
};
use crate::ml::{model::ParserModel, parser::DecodeMode};

pub struct EvalReport {
    pub score:       AttachmentScore,
    /// One entry per input passage, same order
    pub predictions: Vec<ParseResult>,
    pub elapsed:     Duration,
}

impl EvalReport {
    pub fn uas(&self) -> f64 {
        self.score.uas()
    }

    pub fn las(&self) -> f64 {
        self.score.las()
    }
}

pub fn evaluate<B: Backend>(
    model:    &ParserModel<B>,
    actions:  &ActionSet,
    policy:   &UnkPolicy,
    passages: &[Passage],
) -> Result<EvalReport> {
    let start = Instant::now();
    let mut score = AttachmentScore::default();
    let mut predictions = Vec::with_capacity(passages.len());

    for (i, passage) in passages.iter().enumerate() {
        let ids = policy.for_evaluation(&passage.raw_ids);
        let outcome = model
            .parse(actions, &ids, &passage.raw_ids, DecodeMode::Greedy)
            .with_context(|| format!("Decoding passage {i}"))?;

        let predicted = replay_legal(passage.len(), actions.resolve(&outcome.actions)?)
            .with_context(|| format!("Replaying prediction for passage {i}"))?;
        if let Some(reference) = &passage.reference {
            let gold = replay_legal(passage.len(), actions.resolve(reference)?)
                .with_context(|| format!("Replaying reference of passage {i}"))?;
            score.merge(AttachmentScore::compare(&gold, &predicted));
        }
        predictions.push(predicted);
    }

    let elapsed = start.elapsed();
    tracing::debug!(
        "Evaluated {} passages in {:.2}s ({} / {} heads correct)",
        passages.len(),
        elapsed.as_secs_f64(),
        score.correct,
        score.total
    );
    Ok(EvalReport { score, predictions, elapsed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{corpus::Corpus, vocab::UNK_ID};
    use crate::domain::traits::RawPassage;
    use crate::ml::model::ParserModelConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn raw(tokens: &[&str], actions: &[&str]) -> RawPassage {
        RawPassage {
            tokens:  tokens.iter().map(|s| s.to_string()).collect(),
            actions: actions.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_scores_labeled_and_skips_unlabeled_passages() {
        let corpus = Corpus::from_training(vec![
            raw(&["the", "cat", "sat"], &["SHIFT", "SHIFT", "LEFT-ARC(det)", "SHIFT", "LEFT-ARC(nsubj)"]),
        ])
        .unwrap();
        let held_out = corpus
            .intern(vec![
                raw(&["the", "dog", "sat"], &["SHIFT", "SHIFT", "LEFT-ARC(det)", "SHIFT", "LEFT-ARC(nsubj)"]),
                raw(&["cat"], &[]),
            ])
            .unwrap();
        assert_eq!(held_out[0].raw_ids[1], UNK_ID);

        let device = Default::default();
        let model = ParserModelConfig::new(corpus.vocab().len(), corpus.actions().len())
            .with_hidden_dim(8)
            .with_lstm_input_dim(6)
            .init::<TestBackend>(&device, None);
        let report = evaluate(&model, corpus.actions(), &corpus.unk_policy(0.2), &held_out).unwrap();

        assert_eq!(report.predictions.len(), 2);
        // one root in the three-token reference, none counted for the unlabeled one
        assert_eq!(report.score.total, 2);
        assert!(report.uas() <= 1.0);
        assert!(report.las() <= report.uas());
        assert_eq!(report.predictions[1].len(), 1);
    }

    #[test]
    fn test_predictions_match_the_decoded_derivation() {
        let corpus = Corpus::from_training(vec![
            raw(&["a", "dog", "barks"], &[
                "SHIFT", "SHIFT", "SWAP", "SHIFT", "RIGHT-ARC(x)", "SHIFT", "LEFT-ARC(y)",
            ]),
        ])
        .unwrap();
        let held_out = corpus.train().to_vec();

        let device = Default::default();
        let model = ParserModelConfig::new(corpus.vocab().len(), corpus.actions().len())
            .with_hidden_dim(8)
            .with_lstm_input_dim(6)
            .init::<TestBackend>(&device, None);
        let policy = corpus.unk_policy(0.2);
        let report = evaluate(&model, corpus.actions(), &policy, &held_out).unwrap();

        let ids = policy.for_evaluation(&held_out[0].raw_ids);
        let outcome = model
            .parse(corpus.actions(), &ids, &held_out[0].raw_ids, DecodeMode::Greedy)
            .unwrap();
        assert_eq!(report.predictions[0], outcome.result);
        assert_eq!(report.predictions[0].roots().count(), 1);
    }
}
