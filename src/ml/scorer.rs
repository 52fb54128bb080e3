// ============================================================
// Layer 5 — Action Scorer
// ============================================================
//   state  = relu(b + S · stackTop + B · bufferTop + A · actionTop)
//   scores = b' + W · state                      [1, action_count]
//
// Only legal actions are normalised: the score row is narrowed
// to the legal indices with select() and log_softmax runs over
// that subset. Illegal actions never appear in the distribution.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{log_softmax, relu},
};

#[derive(Config, Debug)]
pub struct ScorerConfig {
    pub hidden_dim:   usize,
    pub action_count: usize,
}

impl ScorerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Scorer<B> {
        let h = self.hidden_dim;
        Scorer {
            stack:  LinearConfig::new(h, h).init(device),
            buffer: LinearConfig::new(h, h).with_bias(false).init(device),
            action: LinearConfig::new(h, h).with_bias(false).init(device),
            output: LinearConfig::new(h, self.action_count).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct Scorer<B: Backend> {
    pub stack:  Linear<B>,
    pub buffer: Linear<B>,
    pub action: Linear<B>,
    pub output: Linear<B>,
}

impl<B: Backend> Scorer<B> {
    /// Raw scores over every action, `[1, action_count]`
    pub fn scores(&self, stack: Tensor<B, 2>, buffer: Tensor<B, 2>, action: Tensor<B, 2>) -> Tensor<B, 2> {
        let state = relu(
            self.stack.forward(stack) + self.buffer.forward(buffer) + self.action.forward(action),
        );
        self.output.forward(state)
    }

    /// Log-probabilities over `legal` only, in the order given
    pub fn log_distribution(
        &self,
        stack:  Tensor<B, 2>,
        buffer: Tensor<B, 2>,
        action: Tensor<B, 2>,
        legal:  &[usize],
    ) -> Tensor<B, 1> {
        let scores = self.scores(stack, buffer, action);
        let indices: Vec<i32> = legal.iter().map(|&i| i as i32).collect();
        let indices = Tensor::<B, 1, Int>::from_ints(indices.as_slice(), &scores.device());
        log_softmax(scores.select(1, indices), 1).reshape([legal.len()])
    }
}

/// Position of the first maximum, `None` for an empty slice
pub fn best_position(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
