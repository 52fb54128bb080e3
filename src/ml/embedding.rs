// ============================================================
// Layer 5 — Token Embedding Layer
// ============================================================
// Every token enters the parser as one lstm_input_dim row:
//
//   x = relu(b + W · learned[id] + W_pre · pretrained[raw])
//
//   id   UNK-substituted id → learned table (trained)
//   raw  true vocabulary id → pretrained table (frozen)
//
// The pretrained table is optional. When present it is held as
// a parameter so it travels with the checkpoint, but every read
// goes through detach(), so no gradient ever reaches it and the
// optimizer never moves it. Ids without a pretrained vector
// (UNK included) hold a zero row.

use burn::{
    module::Param,
    nn::{Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

use crate::data::pretrained::PretrainedTable;

#[derive(Config, Debug)]
pub struct TokenEmbeddingConfig {
    pub vocab_size:     usize,
    pub input_dim:      usize,
    pub pretrained_dim: usize,
    pub lstm_input_dim: usize,
    #[config(default = false)]
    pub use_pretrained: bool,
}

impl TokenEmbeddingConfig {
    pub fn init<B: Backend>(
        &self,
        device:     &B::Device,
        pretrained: Option<&PretrainedTable>,
    ) -> TokenEmbedding<B> {
        let learned = EmbeddingConfig::new(self.vocab_size, self.input_dim).init(device);
        let word_proj = LinearConfig::new(self.input_dim, self.lstm_input_dim).init(device);

        let (pretrained, pretrained_proj) = if self.use_pretrained {
            let matrix = match pretrained {
                Some(table) => Tensor::<B, 1>::from_floats(
                    table.to_matrix(self.vocab_size).as_slice(),
                    device,
                )
                .reshape([self.vocab_size, self.pretrained_dim]),
                // restored from a checkpoint right after construction
                None => Tensor::zeros([self.vocab_size, self.pretrained_dim], device),
            };
            let proj = LinearConfig::new(self.pretrained_dim, self.lstm_input_dim)
                .with_bias(false)
                .init(device);
            (Some(Param::from_tensor(matrix)), Some(proj))
        } else {
            (None, None)
        };

        TokenEmbedding { learned, pretrained, word_proj, pretrained_proj }
    }
}

#[derive(Module, Debug)]
pub struct TokenEmbedding<B: Backend> {
    pub learned:         Embedding<B>,
    pub pretrained:      Option<Param<Tensor<B, 2>>>,
    pub word_proj:       Linear<B>,
    pub pretrained_proj: Option<Linear<B>>,
}

impl<B: Backend> TokenEmbedding<B> {
    /// Embed a whole passage. Returns `[n, lstm_input_dim]`.
    pub fn embed_passage(&self, ids: &[usize], raw_ids: &[usize], device: &B::Device) -> Tensor<B, 2> {
        let n = ids.len();
        let ids = Tensor::<B, 1, Int>::from_ints(as_ints(ids).as_slice(), device);

        let [_, input_dim] = self.learned.weight.val().dims();
        let words = self.learned.forward(ids.reshape([1, n])).reshape([n, input_dim]);
        let mut x = self.word_proj.forward(words);

        if let (Some(table), Some(proj)) = (&self.pretrained, &self.pretrained_proj) {
            let raw = Tensor::<B, 1, Int>::from_ints(as_ints(raw_ids).as_slice(), device);
            let vectors = table.val().detach().select(0, raw);
            x = x + proj.forward(vectors);
        }
        relu(x)
    }

    /// Row `i` of an embedded passage as `[1, lstm_input_dim]`
    pub fn row(embedded: &Tensor<B, 2>, i: usize) -> Tensor<B, 2> {
        let [_, d] = embedded.dims();
        embedded.clone().slice([i..i + 1, 0..d])
    }
}

fn as_ints(ids: &[usize]) -> Vec<i32> {
    ids.iter().map(|&id| id as i32).collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{pretrained::PretrainedVectors, vocab::Vocabulary};
    use burn::backend::{Autodiff, NdArray};
    use std::io::Cursor;

    type TestBackend = NdArray;

    fn config(use_pretrained: bool) -> TokenEmbeddingConfig {
        TokenEmbeddingConfig::new(4, 3, 2, 5).with_use_pretrained(use_pretrained)
    }

    #[test]
    fn test_passage_shape_and_relu() {
        let device = Default::default();
        let emb = config(false).init::<TestBackend>(&device, None);
        let out = emb.embed_passage(&[1, 2, 0], &[1, 2, 3], &device);
        assert_eq!(out.dims(), [3, 5]);

        let values = out.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_row_extracts_one_token() {
        let device = Default::default();
        let emb = config(false).init::<TestBackend>(&device, None);
        let out = emb.embed_passage(&[1, 2], &[1, 2], &device);
        let second = TokenEmbedding::row(&out, 1);
        assert_eq!(second.dims(), [1, 5]);
        assert_eq!(
            second.into_data().to_vec::<f32>().unwrap(),
            out.slice([1..2, 0..5]).into_data().to_vec::<f32>().unwrap()
        );
    }

    #[test]
    fn test_pretrained_only_depends_on_raw_id() {
        let device = Default::default();
        let mut vocab = Vocabulary::new();
        vocab.get_or_insert("a");
        let vectors = PretrainedVectors::from_reader(Cursor::new("a 1 2\nb 3 4\n"), 2).unwrap();
        let table = vectors.intern(&mut vocab);
        assert_eq!(vocab.len(), 3);

        let emb = TokenEmbeddingConfig::new(3, 3, 2, 16)
            .with_use_pretrained(true)
            .init::<TestBackend>(&device, Some(&table));

        // same learned id, different raw ids → different rows
        let a = emb.embed_passage(&[0], &[1], &device).into_data().to_vec::<f32>().unwrap();
        let b = emb.embed_passage(&[0], &[2], &device).into_data().to_vec::<f32>().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_pretrained_table_receives_no_gradient() {
        let device = Default::default();
        let mut vocab = Vocabulary::new();
        let vectors = PretrainedVectors::from_reader(Cursor::new("a 1 2\n"), 2).unwrap();
        let table = vectors.intern(&mut vocab);

        let emb = TokenEmbeddingConfig::new(2, 3, 2, 4)
            .with_use_pretrained(true)
            .init::<Autodiff<TestBackend>>(&device, Some(&table));
        let loss = emb.embed_passage(&[1], &[1], &device).sum();
        let grads = loss.backward();

        let frozen = emb.pretrained.as_ref().unwrap().val();
        assert!(frozen.grad(&grads).is_none());
        assert!(emb.learned.weight.val().grad(&grads).is_some());
    }
}
