// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Everything a later `parse` run needs to rebuild the model:
//
//   {model_dir}/
//     train_config.json   run configuration (paths, hyperparameters)
//     model_config.json   shape descriptor of the stored weights
//     parser_best.*       weights with the best held-out UAS
//                         (CompactRecorder picks the extension)
//     best.json           iteration / UAS / LAS of those weights
//
// Weights are only loaded after the configured shape has been
// compared with model_config.json, so a mismatch is reported by
// field name instead of as a record decoding failure.

use anyhow::{bail, Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::{ParserModel, ParserModelConfig};

const WEIGHTS: &str = "parser_best";

/// Which weights are stored and how good they were
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestModel {
    pub iteration: usize,
    pub uas:       f64,
    pub las:       f64,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Use `dir` for writing, creating it if needed
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create model directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Use an existing model directory for reading
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            bail!("Model directory '{}' does not exist. Have you run 'train' first?", dir.display());
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // ─── Weights ──────────────────────────────────────────────────────────────
    /// Overwrite the stored weights and their best.json descriptor
    pub fn save_best<B: Backend>(&self, model: &ParserModel<B>, best: &BestModel) -> Result<()> {
        let path = self.dir.join(WEIGHTS);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;
        self.write_json("best.json", best)?;
        tracing::debug!("Saved weights from iteration {}", best.iteration);
        Ok(())
    }

    /// Load the stored weights into a model of the same shape
    pub fn load_model<B: Backend>(&self, model: ParserModel<B>, device: &B::Device) -> Result<ParserModel<B>> {
        let path = self.dir.join(WEIGHTS);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?", path.display())
            })?;
        Ok(model.load_record(record))
    }

    /// best.json, if weights have been stored
    pub fn best(&self) -> Result<Option<BestModel>> {
        let path = self.dir.join("best.json");
        if !path.exists() {
            return Ok(None);
        }
        self.read_json("best.json").map(Some)
    }

    // ─── Configs ──────────────────────────────────────────────────────────────
    pub fn save_train_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json("train_config.json", cfg)
    }

    pub fn load_train_config(&self) -> Result<TrainConfig> {
        self.read_json("train_config.json")
    }

    pub fn save_model_config(&self, cfg: &ParserModelConfig) -> Result<()> {
        self.write_json("model_config.json", cfg)
    }

    pub fn load_model_config(&self) -> Result<ParserModelConfig> {
        self.read_json("model_config.json")
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).with_context(|| format!("Cannot write '{}'", path.display()))
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Malformed '{}'", path.display()))
    }
}
