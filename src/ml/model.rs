// ============================================================
// Layer 5 — Parser Parameter Bundle
// ============================================================
// Every trainable (and the one frozen) parameter of the parser
// lives in ParserModel, so a single CompactRecorder record holds
// the whole model and a single Adam optimizer updates it.
//
//   embedding          token rows (learned + optional pretrained)
//   composition        subtree builder for arcs
//   stack_lstm         encoder over the stack
//   buffer_lstm        encoder over the buffer
//   action_lstm        encoder over the action history
//   scorer             state → masked action distribution
//   action_embedding   one row per action, fed to action_lstm
//   relation_embedding one row per action, fed to composition
//   action_start       primes action_lstm before the first step
//   stack_guard        pushed under every stack
//   buffer_guard       pushed under every buffer
//
// Relation rows are indexed by action id rather than by label,
// so LEFT-ARC(x) and RIGHT-ARC(x) get distinct relation vectors.

use burn::{
    module::Param,
    nn::{Embedding, EmbeddingConfig},
    prelude::*,
    tensor::Distribution,
};

use crate::data::pretrained::PretrainedTable;
use crate::domain::error::ParseError;
use crate::ml::{
    composition::{Composition, CompositionConfig},
    embedding::{TokenEmbedding, TokenEmbeddingConfig},
    encoder::{StackLstm, StackLstmConfig},
    scorer::{Scorer, ScorerConfig},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct ParserModelConfig {
    pub vocab_size:     usize,
    pub action_count:   usize,
    #[config(default = 2)]
    pub layers:         usize,
    #[config(default = 32)]
    pub input_dim:      usize,
    #[config(default = 64)]
    pub hidden_dim:     usize,
    #[config(default = 16)]
    pub action_dim:     usize,
    #[config(default = 50)]
    pub pretrained_dim: usize,
    #[config(default = 10)]
    pub rel_dim:        usize,
    #[config(default = 60)]
    pub lstm_input_dim: usize,
    #[config(default = false)]
    pub use_pretrained: bool,
}

impl ParserModelConfig {
    pub fn init<B: Backend>(
        &self,
        device:     &B::Device,
        pretrained: Option<&PretrainedTable>,
    ) -> ParserModel<B> {
        let embedding = TokenEmbeddingConfig::new(
            self.vocab_size,
            self.input_dim,
            self.pretrained_dim,
            self.lstm_input_dim,
        )
        .with_use_pretrained(self.use_pretrained)
        .init(device, pretrained);

        let lstm = |input_dim: usize| {
            StackLstmConfig::new(input_dim, self.hidden_dim)
                .with_layers(self.layers)
                .init(device)
        };

        ParserModel {
            embedding,
            composition:        CompositionConfig::new(self.lstm_input_dim, self.rel_dim).init(device),
            stack_lstm:         lstm(self.lstm_input_dim),
            buffer_lstm:        lstm(self.lstm_input_dim),
            action_lstm:        lstm(self.action_dim),
            scorer:             ScorerConfig::new(self.hidden_dim, self.action_count).init(device),
            action_embedding:   EmbeddingConfig::new(self.action_count, self.action_dim).init(device),
            relation_embedding: EmbeddingConfig::new(self.action_count, self.rel_dim).init(device),
            action_start:       learned_row(self.action_dim, device),
            stack_guard:        learned_row(self.lstm_input_dim, device),
            buffer_guard:       learned_row(self.lstm_input_dim, device),
        }
    }

    /// Compare a stored shape descriptor with this one, field by field.
    pub fn ensure_compatible(&self, saved: &ParserModelConfig) -> Result<(), ParseError> {
        let fields: [(&'static str, usize, usize); 10] = [
            ("vocab_size", saved.vocab_size, self.vocab_size),
            ("action_count", saved.action_count, self.action_count),
            ("layers", saved.layers, self.layers),
            ("input_dim", saved.input_dim, self.input_dim),
            ("hidden_dim", saved.hidden_dim, self.hidden_dim),
            ("action_dim", saved.action_dim, self.action_dim),
            ("pretrained_dim", saved.pretrained_dim, self.pretrained_dim),
            ("rel_dim", saved.rel_dim, self.rel_dim),
            ("lstm_input_dim", saved.lstm_input_dim, self.lstm_input_dim),
            ("use_pretrained", saved.use_pretrained as usize, self.use_pretrained as usize),
        ];
        for (field, saved, configured) in fields {
            if saved != configured {
                return Err(ParseError::ShapeMismatch { field, saved, configured });
            }
        }
        Ok(())
    }
}

fn learned_row<B: Backend>(dim: usize, device: &B::Device) -> Param<Tensor<B, 2>> {
    Param::from_tensor(Tensor::random([1, dim], Distribution::Uniform(-0.1, 0.1), device))
}

#[derive(Module, Debug)]
pub struct ParserModel<B: Backend> {
    pub embedding:          TokenEmbedding<B>,
    pub composition:        Composition<B>,
    pub stack_lstm:         StackLstm<B>,
    pub buffer_lstm:        StackLstm<B>,
    pub action_lstm:        StackLstm<B>,
    pub scorer:             Scorer<B>,
    pub action_embedding:   Embedding<B>,
    pub relation_embedding: Embedding<B>,
    pub action_start:       Param<Tensor<B, 2>>,
    pub stack_guard:        Param<Tensor<B, 2>>,
    pub buffer_guard:       Param<Tensor<B, 2>>,
}

impl<B: Backend> ParserModel<B> {
    /// Action embedding row for action `id`, `[1, action_dim]`
    pub fn action_row(&self, id: usize, device: &B::Device) -> Tensor<B, 2> {
        table_row(&self.action_embedding, id, device)
    }

    /// Relation embedding row for arc action `id`, `[1, rel_dim]`
    pub fn relation_row(&self, id: usize, device: &B::Device) -> Tensor<B, 2> {
        table_row(&self.relation_embedding, id, device)
    }

    pub fn device(&self) -> B::Device {
        self.stack_guard.val().device()
    }
}

fn table_row<B: Backend>(table: &Embedding<B>, id: usize, device: &B::Device) -> Tensor<B, 2> {
    let index = Tensor::<B, 1, Int>::from_ints([id as i32], device);
    table.weight.val().select(0, index)
}
