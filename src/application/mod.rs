// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: these use cases call into the
// data, ml and infra layers in order and report a summary back
// to the CLI. No tensor code and no printing here.

/// Training workflow
pub mod train_use_case;

/// Decoding workflow
pub mod parse_use_case;
