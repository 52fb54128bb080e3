// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Teacher-forced training, one passage per optimizer step.
//
//   iteration  = status_every passages (batch_size, capped at
//                the corpus size), then a status line
//   evaluation = every eval_every iterations, starting with
//                iteration 0, on the held-out passages
//
// Per passage:
//   ids   ← raw ids with singletons randomly replaced by UNK
//   loss  ← −Σ log p(reference action)   (must be ≥ 0)
//   Adam step on the gradients of that one graph
//
// Per pass over the corpus: reshuffle, and after every pass but
// the first decay the learning rate:
//   lr = lr0 / (1 + lr_decay · passes_completed)
//
// Training stops on max_iterations, on the stop flag (checked
// between passages), or when two consecutive held-out UAS values
// differ by less than the configured tolerance. Weights are
// checkpointed whenever held-out UAS strictly improves.
//
// Key Burn 0.20 insight:
//   - Training runs on TrainBackend (Autodiff) for gradients
//   - model.valid() gives the same weights on InferBackend
//     for held-out decoding without building graphs

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::application::train_use_case::TrainConfig;
use crate::data::corpus::Corpus;
use crate::domain::{error::ParseError, passage::Passage};
use crate::infra::{
    checkpoint::{BestModel, CheckpointManager},
    metrics::{EvalMetrics, MetricsLogger},
    signal::StopFlag,
};
use crate::ml::{evaluator::evaluate, model::ParserModel, parser::DecodeMode, TrainBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxIterations,
    Interrupted,
    Converged,
}

pub struct TrainingOutcome {
    pub model:      ParserModel<TrainBackend>,
    pub iterations: usize,
    pub reason:     StopReason,
    pub best:       Option<BestModel>,
}

// ─── Convergence ──────────────────────────────────────────────────────────────
/// Tracks consecutive held-out scores against a tolerance
#[derive(Debug, Clone)]
pub struct Convergence {
    tolerance: Option<f64>,
    previous:  Option<f64>,
}

impl Convergence {
    pub fn new(tolerance: Option<f64>) -> Self {
        Self { tolerance, previous: None }
    }

    /// Record a new score; true once it is within tolerance of the last one
    pub fn observe(&mut self, score: f64) -> bool {
        let converged = match (self.tolerance, self.previous) {
            (Some(tol), Some(prev)) => (prev - score).abs() < tol,
            _ => false,
        };
        self.previous = Some(score);
        converged
    }
}

// ─── Status window ────────────────────────────────────────────────────────────
#[derive(Debug, Default)]
struct Window {
    llh:     f64,
    steps:   usize,
    correct: usize,
}

impl Window {
    fn perplexity(&self) -> f64 {
        if self.steps == 0 { f64::NAN } else { (self.llh / self.steps as f64).exp() }
    }

    fn error_rate(&self) -> f64 {
        if self.steps == 0 { f64::NAN } else { 1.0 - self.correct as f64 / self.steps as f64 }
    }
}

/// Cursor over the training corpus that reshuffles at every wrap
struct Epochs {
    order:     Vec<usize>,
    cursor:    usize,
    completed: usize,
    started:   bool,
    seen:      usize,
}

impl Epochs {
    fn new(len: usize) -> Self {
        Self { order: (0..len).collect(), cursor: len, completed: 0, started: false, seen: 0 }
    }

    /// Next passage index; the bool is true when a pass was just completed
    fn next(&mut self, rng: &mut StdRng) -> (usize, bool) {
        let mut finished_pass = false;
        if self.cursor == self.order.len() {
            self.cursor = 0;
            if self.started {
                self.completed += 1;
                finished_pass = true;
            }
            self.started = true;
            self.order.shuffle(rng);
        }
        let index = self.order[self.cursor];
        self.cursor += 1;
        self.seen += 1;
        (index, finished_pass)
    }

    fn fraction(&self) -> f64 {
        self.seen as f64 / self.order.len() as f64
    }
}

// ─── Training loop ────────────────────────────────────────────────────────────
pub fn run_training(
    cfg:     &TrainConfig,
    corpus:  &Corpus,
    dev:     &[Passage],
    model:   ParserModel<TrainBackend>,
    ckpt:    &CheckpointManager,
    metrics: &MetricsLogger,
    stop:    &StopFlag,
) -> Result<TrainingOutcome> {
    let mut model = model;
    let train = corpus.train();
    let actions = corpus.actions();
    let policy = corpus.unk_policy(cfg.unk_prob);

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();
    let mut lr = cfg.lr;

    let status_every = cfg.batch_size.min(train.len()).max(1);
    let eval_every = cfg.eval_every.max(1);
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut epochs = Epochs::new(train.len());
    let mut convergence = Convergence::new(cfg.tolerance);
    let mut best: Option<BestModel> = None;
    let mut iteration = 0;

    tracing::info!(
        "Training on {} passages, {} held-out, status every {} passages",
        train.len(),
        dev.len(),
        status_every
    );

    let reason = loop {
        if iteration >= cfg.max_iterations {
            break StopReason::MaxIterations;
        }

        // ── One status window of single-passage updates ───────────────────────
        let mut window = Window::default();
        for _ in 0..status_every {
            if stop.is_set() {
                break;
            }
            let (index, finished_pass) = epochs.next(&mut rng);
            if finished_pass {
                lr = cfg.lr / (1.0 + cfg.lr_decay * epochs.completed as f64);
                tracing::info!("Completed pass {} over the corpus, lr = {:.6}", epochs.completed, lr);
            }

            let passage = &train[index];
            let reference = passage
                .reference
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("Training passage {index} has no reference actions"))?;
            let ids = policy.for_training(&passage.raw_ids, &mut rng);

            let outcome = model.parse(actions, &ids, &passage.raw_ids, DecodeMode::Forced(reference))?;
            let loss: f64 = outcome.neg_log_prob.clone().into_scalar().elem::<f64>();
            if loss < 0.0 {
                return Err(ParseError::NegativeLoss { passage: index, value: loss }.into());
            }

            // Backward pass + Adam update
            let grads = outcome.neg_log_prob.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);

            window.llh += loss;
            window.steps += outcome.actions.len();
            window.correct += outcome.agreed;
        }
        if stop.is_set() {
            break StopReason::Interrupted;
        }

        tracing::info!(
            "update #{} (epoch {:.3}) |lr = {:.6}| llh: {:.3} ppl: {:.3} err: {:.4}",
            iteration,
            epochs.fraction(),
            lr,
            window.llh,
            window.perplexity(),
            window.error_rate()
        );

        // ── Held-out evaluation ───────────────────────────────────────────────
        let mut converged = false;
        if iteration % eval_every == 0 {
            let report = evaluate(&model.valid(), actions, &policy, dev)?;
            let row = EvalMetrics {
                iteration,
                epoch:     epochs.fraction(),
                train_llh: window.llh,
                train_ppl: window.perplexity(),
                train_err: window.error_rate(),
                uas:       report.uas(),
                las:       report.las(),
                eval_ms:   report.elapsed.as_millis(),
            };
            metrics.log(&row)?;
            tracing::info!(
                "  **dev (iter={} epoch={:.3}) uas: {:.4} las: {:.4} [{} passages in {}ms]",
                iteration,
                row.epoch,
                row.uas,
                row.las,
                dev.len(),
                row.eval_ms
            );

            if row.is_improvement(best.map(|b| b.uas)) {
                let record = BestModel { iteration, uas: row.uas, las: row.las };
                ckpt.save_best(&model, &record)?;
                best = Some(record);
                tracing::info!("  new best held-out UAS, weights saved");
            }
            converged = convergence.observe(row.uas);
        }

        iteration += 1;
        if converged {
            break StopReason::Converged;
        }
    };

    tracing::info!("Training stopped after {} iterations: {:?}", iteration, reason);
    Ok(TrainingOutcome { model, iterations: iteration, reason, best })
}
