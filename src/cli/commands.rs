// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Two subcommands: `train` and `parse`.
//
// clap's derive macros generate help text, missing-argument
// errors and type conversion. The training corpus is required
// by both commands; clap exits non-zero when it is absent.

use clap::{Args, Subcommand};

use crate::application::{parse_use_case::ParseConfig, train_use_case::TrainConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the parser with teacher forcing on reference derivations
    Train(TrainArgs),

    /// Parse passages with a trained model
    Parse(ParseArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON-lines training corpus with reference actions
    #[arg(short = 'T', long)]
    pub training_data: String,

    /// JSON-lines held-out corpus, evaluated during training
    #[arg(short = 'd', long)]
    pub dev_data: String,

    /// Pretrained word vectors, one "word v1 .. vd" per line
    #[arg(short = 'w', long)]
    pub words: Option<String>,

    /// Directory for configs, weights and metrics
    #[arg(short = 'm', long, default_value = "model")]
    pub model_dir: String,

    /// Warm-start from the weights in this model directory
    #[arg(long)]
    pub init_model: Option<String>,

    /// LSTM layers in each encoder
    #[arg(long, default_value_t = 2)]
    pub layers: usize,

    /// Learned word embedding width
    #[arg(long, default_value_t = 32)]
    pub input_dim: usize,

    /// Encoder hidden width
    #[arg(long, default_value_t = 64)]
    pub hidden_dim: usize,

    /// Action embedding width
    #[arg(long, default_value_t = 16)]
    pub action_dim: usize,

    /// Width of the pretrained vectors
    #[arg(long, default_value_t = 50)]
    pub pretrained_dim: usize,

    /// Relation embedding width
    #[arg(long, default_value_t = 10)]
    pub rel_dim: usize,

    /// Token representation width fed to the stack and buffer encoders
    #[arg(long, default_value_t = 60)]
    pub lstm_input_dim: usize,

    /// Probability of replacing a singleton word by UNK during training
    #[arg(long, default_value_t = 0.2)]
    pub unk_prob: f64,

    /// Stop after this many iterations
    #[arg(long, default_value_t = 8000)]
    pub max_iterations: usize,

    /// Stop once consecutive held-out UAS differ by less than this
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Initial Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// lr = lr0 / (1 + lr_decay * passes)
    #[arg(long, default_value_t = 0.08)]
    pub lr_decay: f64,

    /// Passages per iteration (one status line each)
    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,

    /// Evaluate on the held-out corpus every N iterations
    #[arg(long, default_value_t = 25)]
    pub eval_every: usize,

    /// Seed for shuffling and UNK replacement
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Boundary between Layer 1 and Layer 2: the application layer
/// never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            training_data:  a.training_data,
            dev_data:       a.dev_data,
            words:          a.words,
            model_dir:      a.model_dir,
            init_model:     a.init_model,
            layers:         a.layers,
            input_dim:      a.input_dim,
            hidden_dim:     a.hidden_dim,
            action_dim:     a.action_dim,
            pretrained_dim: a.pretrained_dim,
            rel_dim:        a.rel_dim,
            lstm_input_dim: a.lstm_input_dim,
            unk_prob:       a.unk_prob,
            max_iterations: a.max_iterations,
            tolerance:      a.tolerance,
            lr:             a.lr,
            lr_decay:       a.lr_decay,
            batch_size:     a.batch_size,
            eval_every:     a.eval_every,
            seed:           a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// The training corpus the model was trained on (rebuilds the vocabulary)
    #[arg(short = 'T', long)]
    pub training_data: String,

    /// Pretrained vectors; defaults to the ones recorded at training time
    #[arg(short = 'w', long)]
    pub words: Option<String>,

    /// Directory written by `train`
    #[arg(short = 'm', long, default_value = "model")]
    pub model_dir: String,

    /// JSON-lines passages to parse
    #[arg(short = 'i', long)]
    pub input: String,

    /// Output file (stdout when omitted)
    #[arg(short = 'o', long)]
    pub output: Option<String>,
}

impl From<ParseArgs> for ParseConfig {
    fn from(a: ParseArgs) -> Self {
        ParseConfig {
            training_data: a.training_data,
            words:         a.words,
            model_dir:     a.model_dir,
            input:         a.input,
            output:        a.output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from(["parser", "train", "-T", "t.jsonl", "-d", "d.jsonl"]).unwrap();
        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.training_data, "t.jsonl");
        assert_eq!(cfg.batch_size, 100);
        assert_eq!(cfg.lstm_input_dim, 60);
        assert_eq!(cfg.tolerance, None);
        assert!((cfg.unk_prob - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_training_data_is_required() {
        assert!(Cli::try_parse_from(["parser", "train", "-d", "d.jsonl"]).is_err());
        assert!(Cli::try_parse_from(["parser", "parse", "-i", "x.jsonl"]).is_err());
    }
}
