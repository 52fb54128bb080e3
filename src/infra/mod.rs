// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the training and parsing
// workflows:
//
//   checkpoint.rs   configs, weights and best.json in the
//                   model directory (CompactRecorder + JSON)
//   metrics.rs      CSV row per held-out evaluation
//   signal.rs       Ctrl-C → cooperative stop flag

/// Model directory persistence
pub mod checkpoint;

/// Evaluation metrics CSV logger
pub mod metrics;

/// Stop flag set from SIGINT
pub mod signal;
