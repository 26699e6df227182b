//! Checkpoint reading

use super::format::CheckpointFormat;
use super::state::{ModelMetadata, ModelState, Snapshot, SnapshotTensor, EPOCH_KEY};
use crate::{Error, Result};
use ndarray::Array1;
use safetensors::tensor::Dtype;
use safetensors::SafeTensors;
use std::path::Path;

/// Read a checkpoint, detecting the format from the extension
pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let format = CheckpointFormat::from_path(path).ok_or_else(|| {
        Error::Serialization(format!("unsupported checkpoint extension: {}", path.display()))
    })?;

    let snapshot = match format {
        CheckpointFormat::SafeTensors => decode_safetensors(&std::fs::read(path)?)?,
        CheckpointFormat::Json => {
            let content = std::fs::read_to_string(path)?;
            let state: ModelState = serde_json::from_str(&content)
                .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}")))?;
            Snapshot::from_state(state)?
        }
        CheckpointFormat::Yaml => {
            let content = std::fs::read_to_string(path)?;
            let state: ModelState = serde_yaml::from_str(&content)
                .map_err(|e| Error::Serialization(format!("YAML deserialization failed: {e}")))?;
            Snapshot::from_state(state)?
        }
    };

    // an epoch-less file is not a checkpoint
    snapshot.epoch()?;
    Ok(snapshot)
}

fn decode_f32(bytes: &[u8]) -> Vec<f32> {
    match bytemuck::try_cast_slice::<u8, f32>(bytes) {
        Ok(values) => values.to_vec(),
        // unaligned buffer
        Err(_) => bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    }
}

fn decode_safetensors(data: &[u8]) -> Result<Snapshot> {
    let (_, header) = SafeTensors::read_metadata(data)
        .map_err(|e| Error::Serialization(format!("SafeTensors parsing failed: {e}")))?;
    let custom = header.metadata().clone().unwrap_or_default();
    let field = |key: &str| custom.get(key).cloned().unwrap_or_else(|| "unknown".to_string());

    let mut metadata = ModelMetadata::new(field("name"), field("architecture"));
    metadata.version = field("version");
    if let Some(epoch) = custom.get(EPOCH_KEY) {
        let epoch: usize = epoch
            .parse()
            .map_err(|e| Error::Serialization(format!("bad epoch {epoch:?}: {e}")))?;
        metadata = metadata.with_epoch(epoch);
    }

    let tensors = SafeTensors::deserialize(data)
        .map_err(|e| Error::Serialization(format!("SafeTensors parsing failed: {e}")))?;
    let mut stored: Vec<SnapshotTensor> = tensors
        .tensors()
        .into_iter()
        .map(|(name, view)| {
            if view.dtype() != Dtype::F32 {
                return Err(Error::Serialization(format!(
                    "tensor {name} has dtype {:?}, expected F32",
                    view.dtype()
                )));
            }
            Ok(SnapshotTensor {
                shape: view.shape().to_vec(),
                data: Array1::from(decode_f32(view.data())),
                name,
            })
        })
        .collect::<Result<_>>()?;
    stored.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Snapshot {
        metadata,
        tensors: stored,
    })
}
