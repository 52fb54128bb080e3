// ============================================================
// Layer 2 — ParseUseCase
// ============================================================
// Decodes new passages with stored weights:
//
//   Step 1: Open the model directory, read both configs
//   Step 2: Rebuild vocabulary + action set from the training
//           corpus (and the same pretrained vectors), so ids
//           match the ones the weights were trained with
//   Step 3: Check the shape, load the weights
//   Step 4: Greedy-decode every input passage
//   Step 5: Write head/relation maps as JSON lines
//
// Input passages that carry reference actions are also scored.

use anyhow::{bail, Context, Result};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use crate::data::{
    corpus::Corpus,
    loader::JsonlCorpus,
    pretrained::PretrainedVectors,
    writer::JsonlParseWriter,
};
use crate::domain::{
    parse::AttachmentScore,
    traits::{ParseSink, PassageSource},
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{evaluator::evaluate, Device, InferBackend};

#[derive(Debug, Clone)]
pub struct ParseConfig {
    pub training_data: String,
    /// Defaults to the vectors used at training time
    pub words:         Option<String>,
    pub model_dir:     String,
    pub input:         String,
    /// JSON-lines output; stdout when absent
    pub output:        Option<String>,
}

#[derive(Debug, Clone)]
pub struct ParseSummary {
    pub passages: usize,
    /// Present when at least one input passage had a reference
    pub score:    Option<AttachmentScore>,
}

pub struct ParseUseCase {
    config: ParseConfig,
}

impl ParseUseCase {
    pub fn new(config: ParseConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<ParseSummary> {
        let cfg = &self.config;
        if !Path::new(&cfg.training_data).is_file() {
            bail!("Training data '{}' not found", cfg.training_data);
        }

        // ── Step 1: Configs ───────────────────────────────────────────────────
        let ckpt = CheckpointManager::open(&cfg.model_dir)?;
        let train_cfg = ckpt.load_train_config()?;
        let saved_shape = ckpt.load_model_config()?;

        // ── Step 2: Vocabulary and action set ─────────────────────────────────
        let raw_train = JsonlCorpus::new(&cfg.training_data).read_passages()?;
        let mut corpus = Corpus::from_training(raw_train)?;
        let words = cfg.words.as_ref().or(train_cfg.words.as_ref());
        let pretrained = match words {
            Some(path) if saved_shape.use_pretrained => {
                let vectors = PretrainedVectors::load(Path::new(path), saved_shape.pretrained_dim)?;
                Some(corpus.attach_pretrained(vectors))
            }
            _ => None,
        };

        // ── Step 3: Shape check + weights ─────────────────────────────────────
        let model_cfg = train_cfg
            .model_config(corpus.vocab().len(), corpus.actions().len())
            .with_use_pretrained(pretrained.is_some());
        model_cfg.ensure_compatible(&saved_shape)?;

        let device = Device::default();
        let model = model_cfg.init::<InferBackend>(&device, pretrained.as_ref());
        let model = ckpt.load_model(model, &device)?;

        // ── Step 4: Decode ────────────────────────────────────────────────────
        let raw_input = JsonlCorpus::new(&cfg.input).read_passages()?;
        let passages = corpus
            .intern(raw_input)
            .with_context(|| format!("Input '{}'", cfg.input))?;
        let policy = corpus.unk_policy(train_cfg.unk_prob);
        let report = evaluate(&model, corpus.actions(), &policy, &passages)?;
        tracing::info!(
            "Parsed {} passages in {:.2}s",
            passages.len(),
            report.elapsed.as_secs_f64()
        );

        // ── Step 5: Output ────────────────────────────────────────────────────
        let out: Box<dyn Write> = match &cfg.output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path).with_context(|| format!("Cannot create '{path}'"))?,
            )),
            None => Box::new(BufWriter::new(io::stdout())),
        };
        let mut writer = JsonlParseWriter::new(out);
        for (passage, result) in passages.iter().zip(&report.predictions) {
            writer.write(passage, result)?;
        }
        writer.finish()?;

        let labeled = passages.iter().any(|p| p.reference.is_some());
        Ok(ParseSummary {
            passages: writer.written(),
            score:    labeled.then_some(report.score),
        })
    }
}
