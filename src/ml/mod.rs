// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All tensor code lives here. The domain layer runs the same
// transition system symbolically; this layer drives it with
// learned representations.
//
//   embedding.rs   token rows from learned + pretrained tables
//   encoder.rs     multi-layer LSTM with push / undo history
//   composition.rs subtree representation after an arc
//   scorer.rs      encoder tops → masked action distribution
//   model.rs       the parameter bundle and its shape config
//   parser.rs      the configuration loop (greedy / forced)
//   evaluator.rs   held-out decoding and attachment scores
//   trainer.rs     teacher-forced training with Adam

/// Token embedding layer
pub mod embedding;

/// Retractable LSTM encoders
pub mod encoder;

/// Composition function
pub mod composition;

/// Action scorer
pub mod scorer;

/// Parser parameters and shape configuration
pub mod model;

/// Configuration loop
pub mod parser;

/// Held-out evaluation
pub mod evaluator;

/// Training loop with evaluation and checkpointing
pub mod trainer;

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;
#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<InferBackend>;

pub type Device = <InferBackend as burn::tensor::backend::Backend>::Device;
