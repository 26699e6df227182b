//! Declarative YAML configuration
//!
//! # Example
//!
//! ```yaml
//! data:
//!   path: features.json
//!   modality: [rgb, flow]
//!   batch_size: 64
//!
//! optimizer:
//!   lr: 1e-4
//!
//! schedule:
//!   max_epochs: 100
//!   pretrain_action: true
//!   adverb_start: 20
//! ```

mod cli;
mod load;
mod schema;
mod validate;



pub use cli::{
    apply_overrides, parse_args, Cli, Command, EvaluateArgs, TrainArgs, ValidateArgs,
};
pub use load::{load_config, save_config};
pub use schema::{CheckpointSpec, DataSpec, ModelSpec, OptimSpec, ScheduleSpec, TrainSpec};
pub use validate::{validate_config, validate_paths, ValidationError};
