//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! adverb-trainer train config.yaml
//! adverb-trainer train config.yaml --pretrain-action --adverb-start 20
//! adverb-trainer train config.yaml --resume checkpoints/ckpt_E_40.json
//! adverb-trainer validate config.yaml
//! adverb-trainer evaluate config.yaml --checkpoint checkpoints/ckpt_E_40.json
//! ```

use super::TrainSpec;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Two-stage training and action-conditioned retrieval evaluation
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "adverb-trainer")]
#[command(version)]
#[command(about = "Train and evaluate compositional (adverb, action) embeddings")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Train a model from YAML configuration
    Train(TrainArgs),

    /// Validate a configuration file without training
    Validate(ValidateArgs),

    /// Run one evaluation pass on a restored checkpoint
    Evaluate(EvaluateArgs),
}

/// Arguments for the train command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct TrainArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Override base learning rate
    #[arg(short, long)]
    pub lr: Option<f32>,

    /// Override number of epochs
    #[arg(short, long)]
    pub epochs: Option<usize>,

    /// Override batch size
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Resume training from checkpoint
    #[arg(short, long)]
    pub resume: Option<PathBuf>,

    /// Override checkpoint directory
    #[arg(long)]
    pub checkpoint_dir: Option<PathBuf>,

    /// Freeze the action modifiers until the adverb start epoch
    #[arg(long)]
    pub pretrain_action: bool,

    /// Override the epoch at which adverb training starts
    #[arg(long)]
    pub adverb_start: Option<usize>,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

/// Arguments for the evaluate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct EvaluateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Checkpoint to evaluate
    #[arg(short, long)]
    pub checkpoint: PathBuf,
}

/// Parse CLI arguments (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to a TrainSpec
pub fn apply_overrides(spec: &mut TrainSpec, args: &TrainArgs) {
    if let Some(lr) = args.lr {
        spec.optimizer.lr = lr;
    }
    if let Some(epochs) = args.epochs {
        spec.schedule.max_epochs = epochs;
    }
    if let Some(batch_size) = args.batch_size {
        spec.data.batch_size = batch_size;
    }
    if let Some(resume) = &args.resume {
        spec.checkpoint.resume = Some(resume.clone());
    }
    if let Some(dir) = &args.checkpoint_dir {
        spec.checkpoint.dir = dir.clone();
    }
    if args.pretrain_action {
        spec.schedule.pretrain_action = true;
    }
    if let Some(adverb_start) = args.adverb_start {
        spec.schedule.adverb_start = adverb_start;
    }
    if let Some(seed) = args.seed {
        spec.model.seed = seed;
    }
}
