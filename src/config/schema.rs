//! YAML schema for a training run

use crate::checkpoint::{CheckpointFormat, LoadMode};
use crate::data::Modality;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Complete run specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainSpec {
    pub data: DataSpec,

    pub optimizer: OptimSpec,

    #[serde(default)]
    pub schedule: ScheduleSpec,

    #[serde(default)]
    pub checkpoint: CheckpointSpec,

    #[serde(default)]
    pub model: ModelSpec,
}

/// Feature data and batching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSpec {
    /// JSON feature file holding both splits
    pub path: PathBuf,

    /// Modalities to concatenate; `both` is shorthand for `[rgb, flow]`
    #[serde(
        default = "default_modality",
        deserialize_with = "deserialize_modality"
    )]
    pub modality: Vec<Modality>,

    /// Frames pooled around the temporal centre
    #[serde(default = "default_temporal_window")]
    pub temporal_window: usize,

    /// Restrict training and evaluation to these adverbs
    #[serde(default)]
    pub adverb_filter: Vec<String>,

    pub batch_size: usize,

    /// Preprocessing threads
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimSpec {
    /// Base learning rate
    pub lr: f32,

    #[serde(default)]
    pub weight_decay: f32,
}

/// Epoch cadence and the two-stage schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    #[serde(default = "default_max_epochs")]
    pub max_epochs: usize,

    #[serde(default = "default_eval_interval")]
    pub eval_interval: usize,

    #[serde(default = "default_save_interval")]
    pub save_interval: usize,

    /// Freeze the action modifiers until `adverb_start`
    #[serde(default)]
    pub pretrain_action: bool,

    #[serde(default)]
    pub adverb_start: usize,
}

impl Default for ScheduleSpec {
    fn default() -> Self {
        Self {
            max_epochs: default_max_epochs(),
            eval_interval: default_eval_interval(),
            save_interval: default_save_interval(),
            pretrain_action: false,
            adverb_start: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointSpec {
    #[serde(default = "default_checkpoint_dir")]
    pub dir: PathBuf,

    #[serde(default)]
    pub format: CheckpointFormat,

    /// Checkpoint to resume from
    #[serde(default)]
    pub resume: Option<PathBuf>,

    #[serde(default)]
    pub load_mode: LoadMode,
}

impl Default for CheckpointSpec {
    fn default() -> Self {
        Self {
            dir: default_checkpoint_dir(),
            format: CheckpointFormat::default(),
            resume: None,
            load_mode: LoadMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    #[serde(default = "default_embed_dim")]
    pub embed_dim: usize,

    /// Seed for initialisation and shuffling
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            embed_dim: default_embed_dim(),
            seed: default_seed(),
        }
    }
}

fn default_modality() -> Vec<Modality> {
    vec![Modality::Rgb, Modality::Flow]
}

fn default_temporal_window() -> usize {
    8
}

fn default_workers() -> usize {
    4
}

fn default_max_epochs() -> usize {
    100
}

fn default_eval_interval() -> usize {
    5
}

fn default_save_interval() -> usize {
    20
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("./checkpoints")
}

fn default_embed_dim() -> usize {
    64
}

fn default_seed() -> u64 {
    42
}

fn deserialize_modality<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Modality>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<Modality>),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Many(list) => Ok(list),
        Raw::One(name) => match name.as_str() {
            "both" => Ok(default_modality()),
            "rgb" => Ok(vec![Modality::Rgb]),
            "flow" => Ok(vec![Modality::Flow]),
            other => Err(D::Error::custom(format!(
                "unknown modality {other:?} (expected rgb, flow or both)"
            ))),
        },
    }
}
