// ============================================================
// Layer 4 — Parse Writer
// ============================================================
// Writes one JSON object per parsed passage:
//
//   {"tokens": ["the", "cat", "sat"],
//    "heads": [1, null, 1],
//    "relations": ["det", null, "root"]}
//
// A null head marks a root.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

use crate::domain::{parse::ParseResult, passage::Passage, traits::ParseSink};

#[derive(Serialize)]
struct ParseRecord<'a> {
    tokens:    &'a [String],
    heads:     &'a [Option<usize>],
    relations: &'a [Option<String>],
}

pub struct JsonlParseWriter<W: Write> {
    out:     W,
    written: usize,
}

impl<W: Write> JsonlParseWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ParseSink for JsonlParseWriter<W> {
    fn write(&mut self, passage: &Passage, result: &ParseResult) -> Result<()> {
        let record = ParseRecord {
            tokens:    &passage.tokens,
            heads:     result.heads(),
            relations: result.relations(),
        };
        serde_json::to_writer(&mut self.out, &record)?;
        writeln!(self.out).context("Cannot write parse output")?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush().context("Cannot flush parse output")
    }
}
