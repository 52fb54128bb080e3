// ============================================================
// Layer 6 — Cooperative Stop Flag
// ============================================================
// The first Ctrl-C asks training to stop after the current
// passage; the second one exits the process with status 1.

use anyhow::{Context, Result};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the training loop to stop. Returns true if a stop had
    /// already been requested.
    pub fn request(&self) -> bool {
        self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Route SIGINT to this flag
    pub fn install_ctrlc(&self) -> Result<()> {
        let flag = self.clone();
        ctrlc::set_handler(move || {
            if flag.request() {
                eprintln!("\nSecond interrupt, exiting.");
                std::process::exit(1);
            }
            tracing::warn!("Interrupt received: stopping after the current passage (Ctrl-C again to exit)");
        })
        .context("Failed to set Ctrl+C handler")
    }
}
