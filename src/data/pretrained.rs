// ============================================================
// Layer 4 — Pretrained Word Vectors
// ============================================================
// Reads word vectors in the plain-text word2vec/GloVe layout:
//
//   400000 50                      <- optional "count dim" header
//   the 0.418 0.24968 -0.41242 ...
//   cat 0.45281 -0.50108 ...
//
// Every word in the file is added to the vocabulary, so the
// raw id of a held-out word that only has a pretrained vector
// still finds it. The resulting PretrainedTable is keyed by
// vocabulary id and is frozen inside the model.

use anyhow::{bail, Context, Result};
use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::data::vocab::{Vocabulary, UNK_ID};

/// Vectors as read from disk, in file order
#[derive(Debug, Clone)]
pub struct PretrainedVectors {
    dim:     usize,
    entries: Vec<(String, Vec<f32>)>,
}

impl PretrainedVectors {
    pub fn load(path: &Path, dim: usize) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Cannot open word vectors '{}'", path.display()))?;
        let vectors = Self::from_reader(BufReader::new(file), dim)
            .with_context(|| format!("Cannot read word vectors '{}'", path.display()))?;
        tracing::info!(
            "Loaded {} pretrained vectors of dimension {} from '{}'",
            vectors.len(),
            dim,
            path.display()
        );
        Ok(vectors)
    }

    pub fn from_reader<R: BufRead>(reader: R, dim: usize) -> Result<Self> {
        let mut entries = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let values: Vec<&str> = fields.collect();
            if line_no == 0 && is_header(word, &values) {
                continue;
            }
            if values.len() != dim {
                bail!(
                    "line {}: expected {} values for '{}', found {}",
                    line_no + 1,
                    dim,
                    word,
                    values.len()
                );
            }
            let vector = values
                .iter()
                .map(|v| v.parse::<f32>())
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("line {}: bad number", line_no + 1))?;
            entries.push((word.to_string(), vector));
        }
        Ok(Self { dim, entries })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register every word in `vocab` and key the vectors by id.
    /// UNK gets an all-zero vector.
    pub fn intern(self, vocab: &mut Vocabulary) -> PretrainedTable {
        let mut rows = HashMap::with_capacity(self.entries.len() + 1);
        rows.insert(UNK_ID, vec![0.0; self.dim]);
        for (word, vector) in self.entries {
            rows.insert(vocab.get_or_insert(&word), vector);
        }
        PretrainedTable { dim: self.dim, rows }
    }
}

fn is_header(first: &str, rest: &[&str]) -> bool {
    rest.len() == 1 && first.parse::<usize>().is_ok() && rest[0].parse::<usize>().is_ok()
}

// ─── PretrainedTable ──────────────────────────────────────────────────────────
/// Fixed vectors keyed by vocabulary id
#[derive(Debug, Clone, Default)]
pub struct PretrainedTable {
    dim:  usize,
    rows: HashMap<usize, Vec<f32>>,
}

impl PretrainedTable {
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn contains(&self, id: usize) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn get(&self, id: usize) -> Option<&[f32]> {
        self.rows.get(&id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row-major `[vocab_size, dim]` matrix. Ids without a vector get
    /// zeros, so they contribute nothing once projected.
    pub fn to_matrix(&self, vocab_size: usize) -> Vec<f32> {
        let mut flat = vec![0.0; vocab_size * self.dim];
        for (&id, vector) in &self.rows {
            if id < vocab_size {
                flat[id * self.dim..(id + 1) * self.dim].copy_from_slice(vector);
            }
        }
        flat
    }
}
