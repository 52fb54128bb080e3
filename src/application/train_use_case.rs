// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Check the training file exists    (before anything else)
//   Step 2: Load + validate training corpus   (Layer 4 - data)
//   Step 3: Pretrained vectors (optional)     (Layer 4 - data)
//   Step 4: Load held-out passages            (Layer 4 - data)
//   Step 5: Save configs                      (Layer 6 - infra)
//   Step 6: Build / warm-start the model      (Layer 5 - ml)
//   Step 7: Run training loop                 (Layer 5 - ml)
//   Step 8: Final held-out evaluation with    (Layer 5 - ml)
//           the best stored weights

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::{corpus::Corpus, loader::JsonlCorpus, pretrained::PretrainedVectors};
use crate::domain::traits::PassageSource;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger, signal::StopFlag};
use crate::ml::{
    evaluator::evaluate,
    model::ParserModelConfig,
    trainer::{run_training, StopReason},
    Device, InferBackend, TrainBackend,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Saved as train_config.json so `parse` can rebuild the same
// vocabulary and model shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub training_data:  String,
    pub dev_data:       String,
    /// Pretrained word vectors (text format), optional
    pub words:          Option<String>,
    pub model_dir:      String,
    /// Warm-start from the weights in this model directory
    pub init_model:     Option<String>,
    pub layers:         usize,
    pub input_dim:      usize,
    pub hidden_dim:     usize,
    pub action_dim:     usize,
    pub pretrained_dim: usize,
    pub rel_dim:        usize,
    pub lstm_input_dim: usize,
    pub unk_prob:       f64,
    pub max_iterations: usize,
    /// Stop when consecutive held-out UAS differ by less than this
    pub tolerance:      Option<f64>,
    pub lr:             f64,
    pub lr_decay:       f64,
    pub batch_size:     usize,
    pub eval_every:     usize,
    pub seed:           u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            training_data:  String::new(),
            dev_data:       String::new(),
            words:          None,
            model_dir:      "model".to_string(),
            init_model:     None,
            layers:         2,
            input_dim:      32,
            hidden_dim:     64,
            action_dim:     16,
            pretrained_dim: 50,
            rel_dim:        10,
            lstm_input_dim: 60,
            unk_prob:       0.2,
            max_iterations: 8000,
            tolerance:      None,
            lr:             1e-3,
            lr_decay:       0.08,
            batch_size:     100,
            eval_every:     25,
            seed:           42,
        }
    }
}

impl TrainConfig {
    /// Shape descriptor once the vocabulary and action set are known
    pub fn model_config(&self, vocab_size: usize, action_count: usize) -> ParserModelConfig {
        ParserModelConfig::new(vocab_size, action_count)
            .with_layers(self.layers)
            .with_input_dim(self.input_dim)
            .with_hidden_dim(self.hidden_dim)
            .with_action_dim(self.action_dim)
            .with_pretrained_dim(self.pretrained_dim)
            .with_rel_dim(self.rel_dim)
            .with_lstm_input_dim(self.lstm_input_dim)
            .with_use_pretrained(self.words.is_some())
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.unk_prob) {
            bail!("unk_prob must be within [0, 1], got {}", self.unk_prob);
        }
        if self.batch_size == 0 || self.eval_every == 0 {
            bail!("batch_size and eval_every must be positive");
        }
        Ok(())
    }
}

/// What a finished run reports back to the CLI
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub iterations: usize,
    pub reason:     StopReason,
    /// Held-out (UAS, LAS) of the best stored weights
    pub final_dev:  Option<(f64, f64)>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
    stop:   StopFlag,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig, stop: StopFlag) -> Self {
        Self { config, stop }
    }

    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Training file must exist ──────────────────────────────────
        if !Path::new(&cfg.training_data).is_file() {
            bail!("Training data '{}' not found", cfg.training_data);
        }

        // ── Step 2: Training corpus ───────────────────────────────────────────
        tracing::info!("Loading training passages from '{}'", cfg.training_data);
        let raw_train = JsonlCorpus::new(&cfg.training_data).read_passages()?;
        let mut corpus = Corpus::from_training(raw_train)?;

        // ── Step 3: Pretrained vectors ────────────────────────────────────────
        let pretrained = match &cfg.words {
            Some(path) => {
                let vectors = PretrainedVectors::load(Path::new(path), cfg.pretrained_dim)?;
                tracing::info!("Loaded {} pretrained vectors from '{}'", vectors.len(), path);
                Some(corpus.attach_pretrained(vectors))
            }
            None => None,
        };

        // ── Step 4: Held-out passages ─────────────────────────────────────────
        let raw_dev = JsonlCorpus::new(&cfg.dev_data).read_passages()?;
        let dev = corpus
            .intern(raw_dev)
            .with_context(|| format!("Held-out data '{}'", cfg.dev_data))?;
        tracing::info!("Loaded {} held-out passages", dev.len());

        // ── Step 5: Save configs for `parse` ──────────────────────────────────
        let model_cfg = cfg.model_config(corpus.vocab().len(), corpus.actions().len());
        let ckpt = CheckpointManager::create(&cfg.model_dir)?;
        ckpt.save_train_config(cfg)?;
        ckpt.save_model_config(&model_cfg)?;

        // ── Step 6: Model ─────────────────────────────────────────────────────
        let device = Device::default();
        let mut model = model_cfg.init::<TrainBackend>(&device, pretrained.as_ref());
        if let Some(init_dir) = &cfg.init_model {
            let init = CheckpointManager::open(init_dir)?;
            model_cfg.ensure_compatible(&init.load_model_config()?)?;
            model = init.load_model(model, &device)?;
            tracing::info!("Warm start from '{}'", init_dir);
        }
        tracing::info!(
            "Model ready: {} layers, hidden={}, {} actions, vocab={}",
            model_cfg.layers,
            model_cfg.hidden_dim,
            model_cfg.action_count,
            model_cfg.vocab_size
        );

        // ── Step 7: Training loop ─────────────────────────────────────────────
        let metrics = MetricsLogger::new(ckpt.dir())?;
        let outcome = run_training(cfg, &corpus, &dev, model, &ckpt, &metrics, &self.stop)?;

        // ── Step 8: Final evaluation with the best weights ────────────────────
        let final_dev = match outcome.best {
            Some(best) => {
                let model = model_cfg.init::<InferBackend>(&device, pretrained.as_ref());
                let model = ckpt.load_model(model, &device)?;
                let report = evaluate(&model, corpus.actions(), &corpus.unk_policy(cfg.unk_prob), &dev)?;
                tracing::info!(
                    "Best weights (iteration {}): held-out UAS {:.4} LAS {:.4}",
                    best.iteration,
                    report.uas(),
                    report.las()
                );
                Some((report.uas(), report.las()))
            }
            None => None,
        };

        Ok(TrainSummary { iterations: outcome.iterations, reason: outcome.reason, final_dev })
    }
}
