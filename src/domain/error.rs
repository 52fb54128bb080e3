// ============================================================
// Layer 3 — Parser Errors
// ============================================================
// Every variant here is an internal-consistency failure: the
// legality predicate, the scorer mask or the stored model do
// not agree with each other. None of them are recoverable, so
// callers propagate them straight up to `main`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("stack underflow applying {action}: {size} item(s) on the stack")]
    StackUnderflow { action: String, size: usize },

    #[error("buffer underflow applying SHIFT")]
    BufferUnderflow,

    #[error("derivation finished with {buffer} item(s) left on the buffer")]
    Incomplete { buffer: usize },

    #[error("derivation ended with {stack} item(s) on the stack and {buffer} on the buffer")]
    Unfinished { stack: usize, buffer: usize },

    #[error("no legal action at step {step} (stack={stack}, buffer={buffer})")]
    NoLegalAction {
        step:   usize,
        stack:  usize,
        buffer: usize,
    },

    #[error("reference action {action} is illegal at step {step}")]
    IllegalReference { step: usize, action: String },

    #[error("reference sequence exhausted after {0} step(s)")]
    ReferenceExhausted(usize),

    #[error("parse finished after {used} step(s) but the reference has {total}")]
    ReferenceUnconsumed { used: usize, total: usize },

    #[error("negative log-likelihood {value} on passage {passage}")]
    NegativeLoss { passage: usize, value: f64 },

    #[error("unknown action `{0}`")]
    UnknownAction(String),

    #[error("encoder undo without a matching push")]
    EncoderUnderflow,

    #[error("checkpoint shape mismatch: {field} is {saved} in the checkpoint but {configured} is configured")]
    ShapeMismatch {
        field:      &'static str,
        saved:      usize,
        configured: usize,
    },
}
