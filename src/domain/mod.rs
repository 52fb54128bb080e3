// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums and traits describing the parser's
// symbolic world: actions, configurations, parse maps, scores.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Everything here is deterministic and unit-testable
//
// The transition system is generic over the representation
// carried by each stack/buffer slot, so the same code drives
// symbolic replay (slot = ()) and the neural parser
// (slot = tensor row, see ml::parser).

/// Parsing actions and the corpus-derived action vocabulary
pub mod action;

/// Typed errors for invariant violations
pub mod error;

/// Passages: tokens, raw ids and reference actions
pub mod passage;

/// Head/relation maps and attachment scoring
pub mod parse;

/// Legality predicate, configurations and replay
pub mod transition;

/// Collaborator abstractions (corpus sources, parse sinks)
pub mod traits;
