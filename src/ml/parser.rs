// ============================================================
// Layer 5 — Configuration Loop
// ============================================================
// One passage, one run of the transition system with the
// neural model choosing (or scoring) each action.
//
// Setup
//   stack encoder   ← stack guard
//   buffer encoder  ← buffer guard, then tokens last → first
//   action encoder  ← learned start vector
//
// Each step
//   1. legal set from the symbolic configuration
//   2. log p over the legal set from the three encoder tops
//   3. Greedy: first arg-max. Forced: the next reference action,
//      counting agreement with the arg-max
//   4. push the action embedding through the action encoder
//   5. apply the action and mirror it into the encoders:
//
//        SHIFT   buffer.undo, stack.push(moved token)
//        SWAP    stack.undo ×2, buffer.push(returned),
//                stack.push(top, which stays on the stack)
//        ARC     stack.undo ×2, stack.push(composition)
//
// The loop stops when the configuration is terminal. In forced
// mode the reference must be consumed exactly.

use anyhow::{anyhow, Result};
use burn::prelude::*;

use crate::domain::{
    action::ActionSet,
    error::ParseError,
    parse::ParseResult,
    transition::{Applied, Configuration},
};
use crate::ml::{
    embedding::TokenEmbedding,
    encoder::EncoderState,
    model::ParserModel,
    scorer::best_position,
};

/// How the next action is selected
#[derive(Debug, Clone, Copy)]
pub enum DecodeMode<'a> {
    /// Arg-max over the legal actions
    Greedy,
    /// Follow these action ids (teacher forcing)
    Forced(&'a [usize]),
}

pub struct ParseOutcome<B: Backend> {
    /// Chosen action ids, in order
    pub actions:      Vec<usize>,
    /// −Σ log p(chosen action), shape `[1]`
    pub neg_log_prob: Tensor<B, 1>,
    /// Steps where the forced action was also the arg-max
    pub agreed:       usize,
    /// Heads and relations built by the derivation
    pub result:       ParseResult,
}

impl<B: Backend> ParserModel<B> {
    /// Run the configuration loop over one passage.
    ///
    /// `ids` feed the learned embedding table (UNK-substituted),
    /// `raw_ids` feed the pretrained table.
    pub fn parse(
        &self,
        actions: &ActionSet,
        ids:     &[usize],
        raw_ids: &[usize],
        mode:    DecodeMode<'_>,
    ) -> Result<ParseOutcome<B>> {
        let device = self.device();
        let n = ids.len();
        if n == 0 {
            return Ok(ParseOutcome {
                actions:      Vec::new(),
                neg_log_prob: Tensor::zeros([1], &device),
                agreed:       0,
                result:       ParseResult::unattached(0),
            });
        }

        // ── Initial encoder states ────────────────────────────────────────────
        let embedded = self.embedding.embed_passage(ids, raw_ids, &device);
        let tokens: Vec<Tensor<B, 2>> = (0..n).map(|i| TokenEmbedding::row(&embedded, i)).collect();
        let stack_guard = self.stack_guard.val();
        let buffer_guard = self.buffer_guard.val();

        let mut stack_enc = EncoderState::new(&self.stack_lstm, &device);
        let mut buffer_enc = EncoderState::new(&self.buffer_lstm, &device);
        let mut action_enc = EncoderState::new(&self.action_lstm, &device);

        stack_enc.push(stack_guard.clone());
        buffer_enc.push(buffer_guard.clone());
        for token in tokens.iter().rev() {
            buffer_enc.push(token.clone());
        }
        action_enc.push(self.action_start.val());

        let mut config = Configuration::new(stack_guard, buffer_guard, tokens);

        // ── Transition loop ───────────────────────────────────────────────────
        let mut chosen = Vec::with_capacity(2 * n);
        let mut log_terms = Vec::with_capacity(2 * n);
        let mut agreed = 0;

        while !config.is_terminal() {
            let step = chosen.len();
            let legal = config.legal_actions(actions);
            if legal.is_empty() {
                return Err(ParseError::NoLegalAction {
                    step,
                    stack:  config.stack_size(),
                    buffer: config.buffer_size(),
                }
                .into());
            }

            let log_p = self
                .scorer
                .log_distribution(stack_enc.top(), buffer_enc.top(), action_enc.top(), &legal);
            let values = log_p
                .clone()
                .into_data()
                .to_vec::<f32>()
                .map_err(|e| anyhow!("Cannot read action scores: {e:?}"))?;
            let best = best_position(&values).ok_or(ParseError::NoLegalAction {
                step,
                stack:  config.stack_size(),
                buffer: config.buffer_size(),
            })?;

            let position = match mode {
                DecodeMode::Greedy => best,
                DecodeMode::Forced(reference) => {
                    let wanted = *reference.get(step).ok_or(ParseError::ReferenceExhausted(step))?;
                    let position = legal.iter().position(|&a| a == wanted).ok_or_else(|| {
                        ParseError::IllegalReference {
                            step,
                            action: actions
                                .get(wanted)
                                .map(|a| a.to_string())
                                .unwrap_or_else(|| format!("#{wanted}")),
                        }
                    })?;
                    if position == best {
                        agreed += 1;
                    }
                    position
                }
            };
            log_terms.push(log_p.slice([position..position + 1]));

            let action_id = legal[position];
            let action = actions
                .get(action_id)
                .ok_or_else(|| ParseError::UnknownAction(format!("#{action_id}")))?;
            action_enc.push(self.action_row(action_id, &device));

            let applied = config.apply(action, |head, dependent| {
                self.composition.forward(
                    head.clone(),
                    dependent.clone(),
                    self.relation_row(action_id, &device),
                )
            })?;

            match applied {
                Applied::Shift => {
                    buffer_enc.undo()?;
                    stack_enc.push(config.stack_top().clone());
                }
                Applied::Swap { .. } => {
                    stack_enc.undo()?;
                    stack_enc.undo()?;
                    buffer_enc.push(config.buffer_top().clone());
                    stack_enc.push(config.stack_top().clone());
                }
                Applied::Arc { .. } => {
                    stack_enc.undo()?;
                    stack_enc.undo()?;
                    stack_enc.push(config.stack_top().clone());
                }
            }
            debug_assert_eq!(stack_enc.depth(), config.stack_size() + 1);
            debug_assert_eq!(buffer_enc.depth(), config.buffer_size() + 1);

            chosen.push(action_id);
        }

        if let DecodeMode::Forced(reference) = mode {
            if chosen.len() != reference.len() {
                return Err(ParseError::ReferenceUnconsumed {
                    used:  chosen.len(),
                    total: reference.len(),
                }
                .into());
            }
        }

        let neg_log_prob = Tensor::cat(log_terms, 0).sum().neg();
        Ok(ParseOutcome {
            actions: chosen,
            neg_log_prob,
            agreed,
            result: config.into_result(),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{action::Action, transition::replay};
    use crate::ml::model::ParserModelConfig;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray;

    fn action_set() -> ActionSet {
        ["SHIFT", "LEFT-ARC(det)", "RIGHT-ARC(root)", "SWAP", "RIGHT-ARC(obj)"]
            .into_iter()
            .collect()
    }

    fn small_model<B: Backend>(actions: &ActionSet, device: &B::Device) -> ParserModel<B> {
        ParserModelConfig::new(8, actions.len())
            .with_hidden_dim(8)
            .with_input_dim(4)
            .with_lstm_input_dim(6)
            .with_action_dim(3)
            .with_rel_dim(2)
            .with_layers(1)
            .init(device, None)
    }

    fn loss_value<B: Backend>(outcome: &ParseOutcome<B>) -> f64 {
        outcome.neg_log_prob.clone().into_scalar().elem::<f64>()
    }

    #[test]
    fn test_forced_follows_reference() {
        let device = Default::default();
        let actions = action_set();
        let model = small_model::<TestBackend>(&actions, &device);

        // the cat sat: SHIFT SHIFT LEFT-ARC(det) SHIFT LEFT-ARC(det)
        let reference = [0, 0, 1, 0, 1];
        let outcome = model
            .parse(&actions, &[1, 2, 3], &[1, 2, 3], DecodeMode::Forced(&reference))
            .unwrap();

        assert_eq!(outcome.actions, reference);
        assert!(outcome.agreed <= reference.len());
        assert!(loss_value(&outcome) >= 0.0);
        assert_eq!(outcome.result.head(0), Some(1));
        assert_eq!(outcome.result.head(1), Some(2));
        assert_eq!(outcome.result.head(2), None);
    }

    #[test]
    fn test_greedy_terminates_with_valid_derivation() {
        let device = Default::default();
        let actions = action_set();
        let model = small_model::<TestBackend>(&actions, &device);

        for n in 1..6 {
            let ids: Vec<usize> = (0..n).map(|i| i % 8).collect();
            let outcome = model.parse(&actions, &ids, &ids, DecodeMode::Greedy).unwrap();

            let sequence: Vec<&Action> = actions.resolve(&outcome.actions).unwrap();
            let replayed = replay(n, sequence.iter().copied()).unwrap();
            assert_eq!(replayed, outcome.result);
            assert_eq!(outcome.result.roots().count(), 1);

            let arcs = sequence.iter().filter(|a| a.is_arc()).count();
            assert_eq!(arcs, n - 1);
        }
    }

    #[test]
    fn test_greedy_is_deterministic() {
        let device = Default::default();
        let actions = action_set();
        let model = small_model::<TestBackend>(&actions, &device);
        let a = model.parse(&actions, &[3, 1, 4, 1], &[3, 1, 4, 1], DecodeMode::Greedy).unwrap();
        let b = model.parse(&actions, &[3, 1, 4, 1], &[3, 1, 4, 1], DecodeMode::Greedy).unwrap();
        assert_eq!(a.actions, b.actions);
    }

    #[test]
    fn test_single_token_is_one_shift() {
        let device = Default::default();
        let actions = action_set();
        let model = small_model::<TestBackend>(&actions, &device);
        let outcome = model.parse(&actions, &[5], &[5], DecodeMode::Greedy).unwrap();
        assert_eq!(outcome.actions, vec![0]);
        // the only legal action is certain
        assert!(loss_value(&outcome).abs() < 1e-6);
    }

    #[test]
    fn test_empty_passage_has_empty_outcome() {
        let device = Default::default();
        let actions = action_set();
        let model = small_model::<TestBackend>(&actions, &device);
        let outcome = model.parse(&actions, &[], &[], DecodeMode::Forced(&[])).unwrap();
        assert!(outcome.actions.is_empty());
        assert_eq!(loss_value(&outcome), 0.0);
    }

    #[test]
    fn test_illegal_reference_is_fatal() {
        let device = Default::default();
        let actions = action_set();
        let model = small_model::<TestBackend>(&actions, &device);
        // LEFT-ARC with an empty stack
        let err = model
            .parse(&actions, &[1, 2], &[1, 2], DecodeMode::Forced(&[1]))
            .err()
            .unwrap();
        assert_eq!(
            err.downcast_ref::<ParseError>(),
            Some(&ParseError::IllegalReference { step: 0, action: "LEFT-ARC(det)".into() })
        );
    }

    #[test]
    fn test_greedy_without_legal_action_is_fatal() {
        let device = Default::default();
        let actions: ActionSet = ["SHIFT", "RIGHT-ARC(x)"].into_iter().collect();
        let model = small_model::<TestBackend>(&actions, &device);

        // SHIFT SHIFT drains the buffer; RIGHT-ARC may not attach the root
        let err = model
            .parse(&actions, &[1, 2], &[1, 2], DecodeMode::Greedy)
            .err()
            .unwrap();
        assert_eq!(
            err.downcast_ref::<ParseError>(),
            Some(&ParseError::NoLegalAction { step: 2, stack: 2, buffer: 0 })
        );
    }

    #[test]
    fn test_short_and_long_references_are_fatal() {
        let device = Default::default();
        let actions = action_set();
        let model = small_model::<TestBackend>(&actions, &device);

        let err = model
            .parse(&actions, &[1, 2], &[1, 2], DecodeMode::Forced(&[0, 0]))
            .err()
            .unwrap();
        assert_eq!(err.downcast_ref::<ParseError>(), Some(&ParseError::ReferenceExhausted(2)));

        let err = model
            .parse(&actions, &[1], &[1], DecodeMode::Forced(&[0, 0]))
            .err()
            .unwrap();
        assert_eq!(
            err.downcast_ref::<ParseError>(),
            Some(&ParseError::ReferenceUnconsumed { used: 1, total: 2 })
        );
    }

    #[test]
    fn test_swap_derivation_is_followed() {
        let device = Default::default();
        let actions = action_set();
        let model = small_model::<TestBackend>(&actions, &device);

        // SHIFT SHIFT SWAP SHIFT RIGHT-ARC(obj) SHIFT LEFT-ARC(det)
        let reference = [0, 0, 3, 0, 4, 0, 1];
        let outcome = model
            .parse(&actions, &[1, 2, 3], &[1, 2, 3], DecodeMode::Forced(&reference))
            .unwrap();
        let expected = replay(3, actions.resolve(&reference).unwrap().iter().copied()).unwrap();
        assert_eq!(outcome.result, expected);
        assert_eq!(outcome.result.head(0), Some(1));
        assert_eq!(outcome.result.head(1), Some(2));
        assert_eq!(outcome.result.head(2), None);
    }

    #[test]
    fn test_loss_backpropagates() {
        let device = Default::default();
        let actions = action_set();
        let model = small_model::<Autodiff<TestBackend>>(&actions, &device);
        let outcome = model
            .parse(&actions, &[1, 2, 3], &[1, 2, 3], DecodeMode::Forced(&[0, 0, 1, 0, 1]))
            .unwrap();
        let grads = outcome.neg_log_prob.backward();
        assert!(model.scorer.output.weight.val().grad(&grads).is_some());
        assert!(model.stack_guard.val().grad(&grads).is_some());
    }
}
