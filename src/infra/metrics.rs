// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// One CSV row per held-out evaluation during training:
//
//   iteration,epoch,train_llh,train_ppl,train_err,uas,las,eval_ms
//   0,0.0300,412.551000,9.620000,0.910000,0.183000,0.021000,41
//   25,0.7800,...
//
// train_* columns describe the status window that ended right
// before the evaluation. Appends across runs; the header is only
// written when the file is new.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub iteration: usize,
    /// Passages seen / training corpus size
    pub epoch:     f64,
    /// Summed −log p over the status window
    pub train_llh: f64,
    pub train_ppl: f64,
    /// Fraction of forced actions that were not the arg-max
    pub train_err: f64,
    pub uas:       f64,
    pub las:       f64,
    pub eval_ms:   u128,
}

impl EvalMetrics {
    /// Strictly better held-out UAS than `best`. The first
    /// evaluation of a run always counts.
    pub fn is_improvement(&self, best: Option<f64>) -> bool {
        match best {
            Some(best) => self.uas > best,
            None => true,
        }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;
        let csv_path = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "iteration,epoch,train_llh,train_ppl,train_err,uas,las,eval_ms")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }
        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EvalMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        writeln!(
            f,
            "{},{:.4},{:.6},{:.6},{:.6},{:.6},{:.6},{}",
            m.iteration, m.epoch, m.train_llh, m.train_ppl, m.train_err, m.uas, m.las, m.eval_ms,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
