//! adverb-trainer CLI
//!
//! # Usage
//!
//! ```bash
//! # Train from config
//! adverb-trainer train config.yaml
//!
//! # Two-stage training with overrides
//! adverb-trainer train config.yaml --pretrain-action --adverb-start 20 --lr 0.001
//!
//! # Validate config
//! adverb-trainer validate config.yaml
//!
//! # Evaluate a checkpoint
//! adverb-trainer evaluate config.yaml --checkpoint checkpoints/ckpt_E_40.json
//! ```

use adverb_trainer::config::{
    apply_overrides, load_config, validate_config, validate_paths, Cli, Command, EvaluateArgs,
    TrainArgs, ValidateArgs,
};
use adverb_trainer::run::{evaluate_checkpoint, run_from_spec};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match cli.command {
        Command::Train(args) => run_train(args),
        Command::Validate(args) => run_validate(args),
        Command::Evaluate(args) => run_evaluate(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run_train(args: TrainArgs) -> Result<(), String> {
    tracing::info!("Training from {}", args.config.display());

    let mut spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    apply_overrides(&mut spec, &args);
    validate_config(&spec).map_err(|e| format!("Validation failed: {e}"))?;
    validate_paths(&spec).map_err(|e| format!("Validation failed: {e}"))?;

    let summary = run_from_spec(&spec).map_err(|e| format!("Training error: {e}"))?;

    tracing::info!(
        start_epoch = summary.start_epoch,
        final_epoch = summary.final_epoch,
        checkpoints = summary.checkpoints.len(),
        "Training complete! Video-to-Adverb Antonym P@1: {:.3}",
        summary.last_accuracy
    );
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    tracing::info!("Validating config: {}", args.config.display());

    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    validate_paths(&spec).map_err(|e| format!("Validation failed: {e}"))?;

    println!("Configuration is valid");
    println!();
    println!("  Features: {}", spec.data.path.display());
    println!("  Modalities: {:?}", spec.data.modality);
    println!("  Temporal window: {}", spec.data.temporal_window);
    if !spec.data.adverb_filter.is_empty() {
        println!("  Adverb filter: {:?}", spec.data.adverb_filter);
    }
    println!("  Batch size: {}", spec.data.batch_size);
    println!();
    println!("  Learning rate: {}", spec.optimizer.lr);
    println!("  Weight decay: {}", spec.optimizer.weight_decay);
    println!("  Epochs: {}", spec.schedule.max_epochs);
    if spec.schedule.pretrain_action {
        println!("  Action pretraining until epoch {}", spec.schedule.adverb_start);
    }
    println!("  Checkpoints: {}", spec.checkpoint.dir.display());
    if let Some(resume) = &spec.checkpoint.resume {
        println!("  Resume from: {}", resume.display());
    }

    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<(), String> {
    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    validate_paths(&spec).map_err(|e| format!("Validation failed: {e}"))?;

    let accuracy =
        evaluate_checkpoint(&spec, &args.checkpoint).map_err(|e| format!("Evaluation error: {e}"))?;
    println!("Video-to-Adverb Antonym P@1: {accuracy:.3}");
    Ok(())
}
