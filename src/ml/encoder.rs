// ============================================================
// Layer 5 — Retractable LSTM Encoders
// ============================================================
// The parser runs three of these: over the stack, over the
// buffer and over the action history. Each must be able to
// forget its most recent input, because arc and swap actions
// take items off the stack/buffer and the encoder has to look
// exactly as if they had never been pushed.
//
// StackLstm holds the parameters (a stack of LSTM layers).
// EncoderState holds one sequence's hidden states as a plain
// array indexed by push count:
//
//   history[0]   initial all-zero state, never removed
//   history[k]   state after the k-th push
//
//   push(x)  → compute from history.last(), append
//   undo()   → pop
//   top()    → hidden output of the last layer at history.last()
//
// Undo is an array pop, never a change to a cell in place.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{sigmoid, tanh},
};

use crate::domain::error::ParseError;

#[derive(Config, Debug)]
pub struct StackLstmConfig {
    pub input_dim:  usize,
    pub hidden_dim: usize,
    #[config(default = 2)]
    pub layers:     usize,
}

impl StackLstmConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> StackLstm<B> {
        let layers = (0..self.layers)
            .map(|l| {
                let input_dim = if l == 0 { self.input_dim } else { self.hidden_dim };
                LstmCell {
                    input:      LinearConfig::new(input_dim, 4 * self.hidden_dim).init(device),
                    hidden:     LinearConfig::new(self.hidden_dim, 4 * self.hidden_dim)
                        .with_bias(false)
                        .init(device),
                    hidden_dim: self.hidden_dim,
                }
            })
            .collect();
        StackLstm { layers, hidden_dim: self.hidden_dim }
    }
}

// ─── LSTM cell ────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct LstmCell<B: Backend> {
    /// x → [input | forget | candidate | output] pre-activations
    pub input:      Linear<B>,
    /// h → same four blocks, no bias
    pub hidden:     Linear<B>,
    pub hidden_dim: usize,
}

#[derive(Debug, Clone)]
pub struct CellState<B: Backend> {
    pub hidden: Tensor<B, 2>,
    pub cell:   Tensor<B, 2>,
}

impl<B: Backend> LstmCell<B> {
    /// One step. `x`: [1, input_dim] → new state with [1, hidden_dim] tensors.
    pub fn forward(&self, x: Tensor<B, 2>, prev: &CellState<B>) -> CellState<B> {
        let gates = self.input.forward(x) + self.hidden.forward(prev.hidden.clone());
        let [batch, _] = gates.dims();
        let h = self.hidden_dim;
        let block = |k: usize| gates.clone().slice([0..batch, k * h..(k + 1) * h]);

        let input_gate = sigmoid(block(0));
        let forget_gate = sigmoid(block(1));
        let candidate = tanh(block(2));
        let output_gate = sigmoid(block(3));

        let cell = forget_gate * prev.cell.clone() + input_gate * candidate;
        let hidden = output_gate * tanh(cell.clone());
        CellState { hidden, cell }
    }
}

// ─── Multi-layer LSTM ─────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct StackLstm<B: Backend> {
    pub layers:     Vec<LstmCell<B>>,
    pub hidden_dim: usize,
}

impl<B: Backend> StackLstm<B> {
    pub fn initial_state(&self, device: &B::Device) -> Vec<CellState<B>> {
        self.layers
            .iter()
            .map(|_| CellState {
                hidden: Tensor::zeros([1, self.hidden_dim], device),
                cell:   Tensor::zeros([1, self.hidden_dim], device),
            })
            .collect()
    }

    /// Feed `x` through every layer, starting from `prev`
    pub fn step(&self, x: Tensor<B, 2>, prev: &[CellState<B>]) -> Vec<CellState<B>> {
        let mut input = x;
        let mut next = Vec::with_capacity(self.layers.len());
        for (layer, state) in self.layers.iter().zip(prev) {
            let out = layer.forward(input, state);
            input = out.hidden.clone();
            next.push(out);
        }
        next
    }
}

// ─── Versioned encoder state ──────────────────────────────────────────────────
pub struct EncoderState<'m, B: Backend> {
    lstm:    &'m StackLstm<B>,
    history: Vec<Vec<CellState<B>>>,
    device:  B::Device,
}

impl<'m, B: Backend> EncoderState<'m, B> {
    pub fn new(lstm: &'m StackLstm<B>, device: &B::Device) -> Self {
        Self { lstm, history: vec![lstm.initial_state(device)], device: device.clone() }
    }

    /// Start a new sequence
    pub fn reset(&mut self) {
        self.history.truncate(1);
    }

    /// Append an input and return the new top hidden state
    pub fn push(&mut self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let next = self.lstm.step(x, self.last());
        self.history.push(next);
        self.top()
    }

    /// Hidden output of the last layer after the most recent push
    /// (the initial state when nothing has been pushed)
    pub fn top(&self) -> Tensor<B, 2> {
        self.last()
            .last()
            .map(|s| s.hidden.clone())
            .unwrap_or_else(|| Tensor::zeros([1, self.lstm.hidden_dim], &self.device))
    }

    /// Forget the most recent push
    pub fn undo(&mut self) -> Result<(), ParseError> {
        if self.history.len() <= 1 {
            return Err(ParseError::EncoderUnderflow);
        }
        self.history.pop();
        Ok(())
    }

    /// Number of pushes currently remembered
    pub fn depth(&self) -> usize {
        self.history.len() - 1
    }

    fn last(&self) -> &[CellState<B>] {
        &self.history[self.history.len() - 1]
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn values(t: Tensor<TestBackend, 2>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    fn input(v: f32, dim: usize) -> Tensor<TestBackend, 2> {
        Tensor::ones([1, dim], &Default::default()) * v
    }

    #[test]
    fn test_top_starts_at_zero() {
        let device = Default::default();
        let lstm = StackLstmConfig::new(3, 4).init::<TestBackend>(&device);
        let state = EncoderState::new(&lstm, &device);
        assert_eq!(state.depth(), 0);
        assert_eq!(values(state.top()), vec![0.0; 4]);
    }

    #[test]
    fn test_undo_restores_previous_state() {
        let device = Default::default();
        let lstm = StackLstmConfig::new(3, 4).init::<TestBackend>(&device);
        let mut state = EncoderState::new(&lstm, &device);

        let after_a = values(state.push(input(0.5, 3)));
        let after_b = values(state.push(input(-1.0, 3)));
        assert_ne!(after_a, after_b);
        assert_eq!(state.depth(), 2);

        state.undo().unwrap();
        assert_eq!(values(state.top()), after_a);
        assert_eq!(state.depth(), 1);
    }

    #[test]
    fn test_push_after_undo_matches_fresh_push() {
        let device = Default::default();
        let lstm = StackLstmConfig::new(3, 4).with_layers(1).init::<TestBackend>(&device);

        let mut retracted = EncoderState::new(&lstm, &device);
        retracted.push(input(0.5, 3));
        retracted.push(input(2.0, 3));
        retracted.undo().unwrap();
        let a = values(retracted.push(input(-0.3, 3)));

        let mut fresh = EncoderState::new(&lstm, &device);
        fresh.push(input(0.5, 3));
        let b = values(fresh.push(input(-0.3, 3)));
        assert_eq!(a, b);
    }

    #[test]
    fn test_undo_without_push_fails() {
        let device = Default::default();
        let lstm = StackLstmConfig::new(2, 2).init::<TestBackend>(&device);
        let mut state = EncoderState::new(&lstm, &device);
        assert_eq!(state.undo(), Err(ParseError::EncoderUnderflow));
    }

    #[test]
    fn test_reset_forgets_everything() {
        let device = Default::default();
        let lstm = StackLstmConfig::new(2, 2).init::<TestBackend>(&device);
        let mut state = EncoderState::new(&lstm, &device);
        state.push(input(1.0, 2));
        state.push(input(1.0, 2));
        state.reset();
        assert_eq!(state.depth(), 0);
        assert_eq!(values(state.top()), vec![0.0; 2]);
    }
}
