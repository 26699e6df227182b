//! Checkpoint writing

use super::format::CheckpointFormat;
use super::state::{Snapshot, EPOCH_KEY};
use crate::{Error, Result};
use safetensors::tensor::{Dtype, TensorView};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::Path;

/// Write `snapshot` to `path`, refusing to replace an existing file
pub fn write_snapshot(snapshot: &Snapshot, path: &Path, format: CheckpointFormat) -> Result<()> {
    let bytes = match format {
        CheckpointFormat::SafeTensors => encode_safetensors(snapshot)?,
        CheckpointFormat::Json => serde_json::to_vec_pretty(&snapshot.to_state())
            .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?,
        CheckpointFormat::Yaml => serde_yaml::to_string(&snapshot.to_state())
            .map_err(|e| Error::Serialization(format!("YAML serialization failed: {e}")))?
            .into_bytes(),
    };

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => Error::CheckpointExists(path.display().to_string()),
            _ => Error::Io(e),
        })?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    Ok(())
}

fn encode_safetensors(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let tensor_data: Vec<(&str, Vec<u8>, Vec<usize>)> = snapshot
        .tensors
        .iter()
        .map(|tensor| {
            let values = tensor.data.to_vec();
            let bytes = bytemuck::cast_slice::<f32, u8>(&values).to_vec();
            (tensor.name.as_str(), bytes, tensor.shape.clone())
        })
        .collect();

    let views = tensor_data
        .iter()
        .map(|(name, bytes, shape)| {
            TensorView::new(Dtype::F32, shape.clone(), bytes)
                .map(|view| (*name, view))
                .map_err(|e| Error::Serialization(format!("invalid tensor {name}: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    let meta = &snapshot.metadata;
    let mut metadata = HashMap::new();
    metadata.insert("name".to_string(), meta.name.clone());
    metadata.insert("architecture".to_string(), meta.architecture.clone());
    metadata.insert("version".to_string(), meta.version.clone());
    metadata.insert(EPOCH_KEY.to_string(), snapshot.epoch()?.to_string());

    safetensors::serialize(views, Some(metadata))
        .map_err(|e| Error::Serialization(format!("SafeTensors serialization failed: {e}")))
}
