//! Checkpoint serialization formats

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported checkpoint formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointFormat {
    /// JSON (human-readable, larger files)
    #[default]
    Json,

    /// YAML (human-readable)
    Yaml,

    /// SafeTensors (HuggingFace compatible binary)
    SafeTensors,
}

impl CheckpointFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            CheckpointFormat::Json => "json",
            CheckpointFormat::Yaml => "yaml",
            CheckpointFormat::SafeTensors => "safetensors",
        }
    }

    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(CheckpointFormat::Json),
            "yaml" | "yml" => Some(CheckpointFormat::Yaml),
            "safetensors" => Some(CheckpointFormat::SafeTensors),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|s| s.to_str())
            .and_then(Self::from_extension)
    }
}
