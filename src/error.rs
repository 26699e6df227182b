//! Error types for adverb-trainer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Shape mismatch for {what}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Loss contract violated: {0}")]
    LossContract(String),

    #[error("Data loader produced no batches")]
    EmptyLoader,

    #[error("Cannot compute accuracy on an empty batch")]
    EmptyBatch,

    #[error("No candidate pairs share action index {action}")]
    NoCandidates { action: usize },

    #[error("Non-finite score for pair {pair} under action index {action}")]
    NonFiniteScore { action: usize, pair: usize },

    #[error("Index {index} out of range for {what} (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Unknown {kind} label: {label}")]
    UnknownLabel { kind: &'static str, label: String },

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Duplicate parameter name: {0}")]
    DuplicateParameter(String),

    #[error("Checkpoint already exists: {0}")]
    CheckpointExists(String),

    #[error("Checkpoint does not match model: missing {missing:?}, unexpected {unexpected:?}")]
    CheckpointMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;
