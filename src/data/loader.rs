// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads passages from a JSON-lines file, one passage per line:
//
//   {"tokens": ["the", "cat", "sat"],
//    "actions": ["SHIFT", "SHIFT", "LEFT-ARC(det)", "SHIFT", "LEFT-ARC(root)"]}
//
// "actions" may be omitted for input that only needs parsing.
// Blank lines are skipped. A malformed line fails the whole
// load and reports its line number.

use anyhow::{bail, Context, Result};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::domain::traits::{PassageSource, RawPassage};

/// A JSON-lines corpus file
pub struct JsonlCorpus {
    path: PathBuf,
}

impl JsonlCorpus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PassageSource for JsonlCorpus {
    fn read_passages(&self) -> Result<Vec<RawPassage>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Cannot open corpus '{}'", self.path.display()))?;
        let passages = read_jsonl(BufReader::new(file))
            .with_context(|| format!("Cannot read corpus '{}'", self.path.display()))?;
        tracing::debug!("Read {} passages from '{}'", passages.len(), self.path.display());
        Ok(passages)
    }
}

/// Parse JSON-lines passages from any reader
pub fn read_jsonl<R: BufRead>(reader: R) -> Result<Vec<RawPassage>> {
    let mut passages = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let passage: RawPassage = serde_json::from_str(&line)
            .with_context(|| format!("line {}: not a passage object", line_no + 1))?;
        if passage.tokens.is_empty() {
            bail!("line {}: passage has no tokens", line_no + 1);
        }
        passages.push(passage);
    }
    Ok(passages)
}
