//! # adverb-trainer: two-stage training for compositional video embeddings
//!
//! Learns a joint embedding of video features and (adverb, action) pairs,
//! then scores adverbs by retrieval restricted to the ground-truth action.
//!
//! ## Architecture
//!
//! - **autograd**: Tape-based automatic differentiation
//! - **optim**: Adam, tagged parameter groups and the two-stage schedule
//! - **data**: Feature files, vocabularies, pair table and batch loaders
//! - **model**: The `EmbeddingModel` contract and the action-modifier model
//! - **train**: One training epoch over a loader
//! - **eval**: Action-conditioned retrieval and top-1 adverb accuracy
//! - **metrics**: Scalar sinks (in-memory, JSONL)
//! - **checkpoint**: Save/load of parameter snapshots (JSON, YAML, SafeTensors)
//! - **config**: Declarative YAML configuration and CLI
//! - **run**: Epoch orchestration, resume and periodic checkpoints

pub mod autograd;
pub mod checkpoint;
pub mod config;
pub mod data;
pub mod eval;
pub mod metrics;
pub mod model;
pub mod optim;
pub mod run;
pub mod train;

pub mod error;

// Re-export commonly used types
pub use autograd::{backward, Context, Tensor};
pub use error::{Error, Result};
