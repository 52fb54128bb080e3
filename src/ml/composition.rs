// ============================================================
// Layer 5 — Composition Function
// ============================================================
// After an arc the two stack items collapse into one subtree
// whose representation replaces them on the stack:
//
//   c = tanh(b + H · head + D · dependent + R · relation)
//
// head/dependent are lstm_input_dim rows, relation is a
// rel_dim row. The output has the head's width so it can be
// pushed through the stack encoder like a token.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::tanh,
};

#[derive(Config, Debug)]
pub struct CompositionConfig {
    pub lstm_input_dim: usize,
    pub rel_dim:        usize,
}

impl CompositionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Composition<B> {
        let d = self.lstm_input_dim;
        Composition {
            head:      LinearConfig::new(d, d).init(device),
            dependent: LinearConfig::new(d, d).with_bias(false).init(device),
            relation:  LinearConfig::new(self.rel_dim, d).with_bias(false).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct Composition<B: Backend> {
    /// H, carries the shared bias b
    pub head:      Linear<B>,
    pub dependent: Linear<B>,
    pub relation:  Linear<B>,
}

impl<B: Backend> Composition<B> {
    pub fn forward(&self, head: Tensor<B, 2>, dependent: Tensor<B, 2>, relation: Tensor<B, 2>) -> Tensor<B, 2> {
        tanh(
            self.head.forward(head)
                + self.dependent.forward(dependent)
                + self.relation.forward(relation),
        )
    }
}
