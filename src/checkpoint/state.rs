//! In-memory and on-disk checkpoint structures

use crate::optim::{ParameterRegistry, ParameterState};
use crate::{Error, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key under which the epoch counter is stored
pub const EPOCH_KEY: &str = "epoch";

/// Checkpoint metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name/identifier
    pub name: String,

    /// Model architecture type
    pub architecture: String,

    pub version: String,

    /// Custom metadata fields; always carries the epoch
    pub custom: HashMap<String, serde_json::Value>,
}

impl ModelMetadata {
    pub fn new(name: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            architecture: architecture.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            custom: HashMap::new(),
        }
    }

    pub fn with_custom(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom.insert(key.into(), value);
        self
    }

    pub fn with_epoch(self, epoch: usize) -> Self {
        self.with_custom(EPOCH_KEY, serde_json::json!(epoch))
    }

    /// Stored epoch counter
    pub fn epoch(&self) -> Result<usize> {
        self.custom
            .get(EPOCH_KEY)
            .and_then(serde_json::Value::as_u64)
            .map(|e| e as usize)
            .ok_or_else(|| Error::Serialization("checkpoint has no epoch".to_string()))
    }
}

/// Information about a stored parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Parameter name (e.g. "video_embedder.weight")
    pub name: String,

    pub shape: Vec<usize>,

    /// Data type; only "f32" is written
    pub dtype: String,
}

impl ParameterInfo {
    /// Element count; a shape whose product overflows is a corrupt entry
    pub fn numel(&self) -> Result<usize> {
        self.shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .ok_or_else(|| {
                Error::Serialization(format!(
                    "shape {:?} of {} overflows the element count",
                    self.shape, self.name
                ))
            })
    }
}

/// Text-format layout: parameter table plus one flat data array
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelState {
    pub metadata: ModelMetadata,
    pub parameters: Vec<ParameterInfo>,
    pub data: Vec<f32>,
}

/// One stored tensor
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotTensor {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Array1<f32>,
}

/// A checkpoint as held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub metadata: ModelMetadata,
    pub tensors: Vec<SnapshotTensor>,
}

impl Snapshot {
    /// Copy every parameter of `registry`
    pub fn from_registry(registry: &ParameterRegistry, metadata: ModelMetadata) -> Self {
        let tensors = registry
            .iter()
            .map(|(_, name, shape, tensor)| SnapshotTensor {
                name: name.to_string(),
                shape: shape.to_vec(),
                data: tensor.data().clone(),
            })
            .collect();
        Self { metadata, tensors }
    }

    pub fn epoch(&self) -> Result<usize> {
        self.metadata.epoch()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tensors.iter().map(|t| t.name.as_str())
    }

    pub fn to_state(&self) -> ModelState {
        let mut data = Vec::new();
        let parameters = self
            .tensors
            .iter()
            .map(|tensor| {
                data.extend(tensor.data.iter().copied());
                ParameterInfo {
                    name: tensor.name.clone(),
                    shape: tensor.shape.clone(),
                    dtype: "f32".to_string(),
                }
            })
            .collect();
        ModelState {
            metadata: self.metadata.clone(),
            parameters,
            data,
        }
    }

    /// Split the flat data array back into tensors
    pub fn from_state(state: ModelState) -> Result<Self> {
        let sizes = state
            .parameters
            .iter()
            .map(ParameterInfo::numel)
            .collect::<Result<Vec<_>>>()?;
        let expected = sizes
            .iter()
            .try_fold(0usize, |acc, &size| acc.checked_add(size))
            .ok_or_else(|| Error::Serialization("checkpoint element count overflows".to_string()))?;
        if expected != state.data.len() {
            return Err(Error::Serialization(format!(
                "checkpoint declares {expected} values but holds {}",
                state.data.len()
            )));
        }

        let mut offset = 0;
        let tensors = state
            .parameters
            .into_iter()
            .zip(sizes)
            .map(|(info, size)| {
                let data = Array1::from(state.data[offset..offset + size].to_vec());
                offset += size;
                SnapshotTensor {
                    name: info.name,
                    shape: info.shape,
                    data,
                }
            })
            .collect();

        Ok(Self {
            metadata: state.metadata,
            tensors,
        })
    }

    pub fn into_state_map(self) -> ParameterState {
        self.tensors.into_iter().map(|t| (t.name, t.data)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::ParamGroup;
    use crate::Tensor;

    fn registry() -> ParameterRegistry {
        let mut registry = ParameterRegistry::new();
        registry
            .register(
                ParamGroup::Embedding,
                "w",
                vec![2, 2],
                Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], true),
            )
            .unwrap();
        registry
            .register(
                ParamGroup::ActionModifiers,
                "action_modifiers.fast",
                vec![1],
                Tensor::from_vec(vec![0.5], true),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_metadata_epoch() {
        let meta = ModelMetadata::new("m", "action_modifiers").with_epoch(12);
        assert_eq!(meta.epoch().unwrap(), 12);
        assert!(ModelMetadata::new("m", "a").epoch().is_err());
    }

    #[test]
    fn test_state_round_trip_keeps_shapes() {
        let snapshot = Snapshot::from_registry(&registry(), ModelMetadata::new("m", "a").with_epoch(3));
        let state = snapshot.to_state();
        assert_eq!(state.data, vec![0.5, 1.0, 2.0, 3.0, 4.0]);

        let restored = Snapshot::from_state(state).unwrap();
        assert_eq!(restored, snapshot);
        assert_eq!(restored.tensors[1].shape, vec![2, 2]);
    }

    #[test]
    fn test_truncated_state_is_rejected() {
        let mut state = Snapshot::from_registry(&registry(), ModelMetadata::new("m", "a")).to_state();
        state.data.pop();
        assert!(matches!(Snapshot::from_state(state), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_overflowing_shape_is_rejected() {
        let mut state = Snapshot::from_registry(&registry(), ModelMetadata::new("m", "a")).to_state();
        state.parameters[0].shape = vec![usize::MAX, 2];

        assert!(state.parameters[0].numel().is_err());
        assert!(matches!(Snapshot::from_state(state), Err(Error::Serialization(_))));
    }
}
