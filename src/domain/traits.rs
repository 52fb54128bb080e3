// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The parser core only talks to its collaborators through
// these traits:
//
//   PassageSource   anything that yields raw passages
//                   (implemented by data::loader::JsonlCorpus)
//   ParseSink       anything that consumes predicted
//                   head/relation maps
//                   (implemented by data::writer::JsonlParseWriter)
//
// The exchange/document format of the final graph is the
// sink's concern; the core never serialises a parse itself.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::{parse::ParseResult, passage::Passage};

/// A passage as read from disk, before vocabulary lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPassage {
    pub tokens: Vec<String>,

    /// Reference actions in text form; empty for unlabeled input
    #[serde(default)]
    pub actions: Vec<String>,
}

// ─── PassageSource ────────────────────────────────────────────────────────────
pub trait PassageSource {
    /// Read every passage this source holds, in order
    fn read_passages(&self) -> Result<Vec<RawPassage>>;
}

// ─── ParseSink ────────────────────────────────────────────────────────────────
pub trait ParseSink {
    /// Consume the prediction for one passage
    fn write(&mut self, passage: &Passage, result: &ParseResult) -> Result<()>;

    /// Flush anything buffered; called once after the last passage
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
