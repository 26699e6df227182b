//! Checkpoint persistence
//!
//! A checkpoint is a snapshot of every model parameter plus the epoch it was
//! taken at, written once to `<dir>/ckpt_E_<epoch>.<ext>`. Loading intersects
//! the stored names with the live model's parameters; [`LoadMode`] decides
//! whether any difference between the two is tolerated.

mod format;
mod load;
mod save;
mod state;

#[cfg(test)]
mod tests;

pub use format::CheckpointFormat;
pub use load::read_snapshot;
pub use save::write_snapshot;
pub use state::{ModelMetadata, ModelState, ParameterInfo, Snapshot, SnapshotTensor, EPOCH_KEY};

use crate::model::EmbeddingModel;
use crate::optim::{ParameterRegistry, ParameterState};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a checkpoint whose keys differ from the live model is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Any missing or unexpected key is an error
    #[default]
    Strict,
    /// Unknown keys are dropped, missing parameters keep their values;
    /// must be requested explicitly
    Partial,
}

/// Entries of a checkpoint that apply to the live model
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedCheckpoint {
    pub epoch: usize,
    /// Stored values for names the live model has
    pub state: ParameterState,
    /// Stored names the live model does not have
    pub dropped: Vec<String>,
    /// Live names the checkpoint does not cover
    pub missing: Vec<String>,
}

/// Saves and restores checkpoints in one directory
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
    format: CheckpointFormat,
    mode: LoadMode,
    architecture: String,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>, format: CheckpointFormat, mode: LoadMode) -> Self {
        Self {
            dir: dir.into(),
            format,
            mode,
            architecture: "action_modifiers".to_string(),
        }
    }

    /// Architecture tag written into metadata
    pub fn with_architecture(mut self, architecture: impl Into<String>) -> Self {
        self.architecture = architecture.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn format(&self) -> CheckpointFormat {
        self.format
    }

    pub fn mode(&self) -> LoadMode {
        self.mode
    }

    /// Where the checkpoint for `epoch` is written
    pub fn path_for(&self, epoch: usize) -> PathBuf {
        self.dir
            .join(format!("ckpt_E_{epoch}.{}", self.format.extension()))
    }

    /// Snapshot every parameter of `model` with `epoch`
    pub fn save<M: EmbeddingModel + ?Sized>(&self, model: &M, epoch: usize) -> Result<PathBuf> {
        self.save_registry(model.parameters(), epoch)
    }

    pub fn save_registry(&self, registry: &ParameterRegistry, epoch: usize) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(epoch);
        let metadata = ModelMetadata::new(
            format!("ckpt_E_{epoch}"),
            self.architecture.clone(),
        )
        .with_epoch(epoch);
        let snapshot = Snapshot::from_registry(registry, metadata);
        write_snapshot(&snapshot, &path, self.format)?;

        tracing::info!(path = %path.display(), epoch, "saved checkpoint");
        Ok(path)
    }

    /// Read `path` and keep the entries matching `live`.
    ///
    /// A shared name whose stored shape differs from the live one is always
    /// an error.
    pub fn load(&self, path: impl AsRef<Path>, live: &ParameterRegistry) -> Result<LoadedCheckpoint> {
        let path = path.as_ref();
        let snapshot = read_snapshot(path)?;
        let epoch = snapshot.epoch()?;

        let mut state = ParameterState::new();
        let mut dropped = Vec::new();
        for tensor in snapshot.tensors {
            match live.shape(&tensor.name) {
                Some(shape) if shape != tensor.shape.as_slice() => {
                    return Err(Error::ShapeMismatch {
                        what: tensor.name,
                        expected: shape.to_vec(),
                        got: tensor.shape,
                    });
                }
                Some(_) => {
                    state.insert(tensor.name, tensor.data);
                }
                None => dropped.push(tensor.name),
            }
        }
        let missing: Vec<String> = live
            .names()
            .filter(|name| !state.contains_key(*name))
            .map(str::to_string)
            .collect();

        if self.mode == LoadMode::Strict && (!dropped.is_empty() || !missing.is_empty()) {
            return Err(Error::CheckpointMismatch {
                missing,
                unexpected: dropped,
            });
        }
        for name in &dropped {
            tracing::warn!(name = %name, "checkpoint parameter not in model, dropped");
        }
        for name in &missing {
            tracing::info!(name = %name, "model parameter not in checkpoint, keeping current value");
        }
        tracing::info!(
            path = %path.display(),
            epoch,
            loaded = state.len(),
            "loaded checkpoint"
        );

        Ok(LoadedCheckpoint {
            epoch,
            state,
            dropped,
            missing,
        })
    }

    /// Load `path` and merge the matching entries into `model`
    pub fn restore<M: EmbeddingModel + ?Sized>(
        &self,
        path: impl AsRef<Path>,
        model: &mut M,
    ) -> Result<LoadedCheckpoint> {
        let loaded = self.load(path, model.parameters())?;
        model.load_state(&loaded.state)?;
        Ok(loaded)
    }
}
