// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes to Layer 2. Printing
// of final results happens here; everything else logs through
// tracing.
//
//   1. `train`   teacher-forced training with held-out evaluation
//   2. `parse`   greedy decoding with stored weights

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, ParseArgs, TrainArgs};

use crate::infra::signal::StopFlag;

#[derive(Parser, Debug)]
#[command(
    name = "stack-lstm-parser",
    version,
    about = "Transition-based parser with stack-LSTM state encoders."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Parse(args) => run_parse(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on: {}", args.training_data);
    let stop = StopFlag::new();
    stop.install_ctrlc()?;

    let summary = TrainUseCase::new(args.into(), stop).execute()?;
    println!(
        "Training stopped after {} iterations ({:?}).",
        summary.iterations, summary.reason
    );
    if let Some((uas, las)) = summary.final_dev {
        println!("Held-out UAS: {:.4}  LAS: {:.4}", uas, las);
    }
    Ok(())
}

fn run_parse(args: ParseArgs) -> Result<()> {
    use crate::application::parse_use_case::ParseUseCase;

    let summary = ParseUseCase::new(args.into()).execute()?;
    eprintln!("Parsed {} passages.", summary.passages);
    if let Some(score) = summary.score {
        eprintln!("UAS: {:.4}  LAS: {:.4}", score.uas(), score.las());
    }
    Ok(())
}
