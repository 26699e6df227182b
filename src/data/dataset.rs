//! Feature dataset loading
//!
//! Features are read from a single JSON file holding both splits. Each sample
//! carries a frame sequence per modality; loading reduces it to one vector by
//! mean-pooling a centred temporal window and concatenating the selected
//! modalities in `rgb`, `flow` order.

use super::{Batch, PairTable, Vocab};
use crate::{Error, Result};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Feature stream of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Rgb,
    Flow,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Rgb => "rgb",
            Modality::Flow => "flow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

/// On-disk layout of a feature file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFile {
    pub adverbs: Vec<String>,
    pub actions: Vec<String>,
    pub pairs: Vec<(String, String)>,
    #[serde(default)]
    pub train: Vec<RawSample>,
    #[serde(default)]
    pub test: Vec<RawSample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSample {
    pub adverb: String,
    pub action: String,
    /// Frames per modality, each frame a feature vector
    pub features: BTreeMap<Modality, Vec<Vec<f32>>>,
}

/// How raw samples are turned into feature vectors
#[derive(Debug, Clone)]
pub struct DatasetOptions {
    pub modalities: Vec<Modality>,
    /// Number of frames pooled around the temporal centre
    pub temporal_window: usize,
    /// Keep only these adverbs; empty keeps all
    pub adverb_filter: Vec<String>,
    /// Threads used for preprocessing
    pub workers: usize,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            modalities: vec![Modality::Rgb, Modality::Flow],
            temporal_window: 8,
            adverb_filter: Vec::new(),
            workers: 1,
        }
    }
}

/// A labelled, aggregated sample
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub features: Array1<f32>,
    pub adverb: usize,
    pub action: usize,
}

/// Vocabularies, pair table and aggregated samples of one split
#[derive(Debug, Clone)]
pub struct FeatureDataset {
    adverbs: Vocab,
    actions: Vocab,
    pairs: PairTable,
    samples: Vec<Sample>,
    feature_dim: usize,
}

impl FeatureDataset {
    /// Assemble a dataset from already-aggregated samples
    pub fn new(adverbs: Vocab, actions: Vocab, pairs: PairTable, samples: Vec<Sample>) -> Result<Self> {
        let feature_dim = samples.first().map(|s| s.features.len()).unwrap_or(0);
        for sample in &samples {
            if sample.features.len() != feature_dim {
                return Err(Error::ShapeMismatch {
                    what: "sample features".to_string(),
                    expected: vec![feature_dim],
                    got: vec![sample.features.len()],
                });
            }
            adverbs.label(sample.adverb)?;
            actions.label(sample.action)?;
        }
        Ok(Self {
            adverbs,
            actions,
            pairs,
            samples,
            feature_dim,
        })
    }

    /// Read one split of a JSON feature file
    pub fn load(path: impl AsRef<Path>, split: Split, options: &DatasetOptions) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let file: FeatureFile = serde_json::from_str(&content).map_err(|e| {
            Error::Serialization(format!("failed to parse {}: {e}", path.display()))
        })?;
        Self::from_file(file, split, options)
    }

    /// Build one split from a parsed feature file
    ///
    /// Both splits of the same file under the same options get identical
    /// vocabularies and pair tables.
    pub fn from_file(file: FeatureFile, split: Split, options: &DatasetOptions) -> Result<Self> {
        if options.modalities.is_empty() {
            return Err(Error::Config("at least one modality is required".to_string()));
        }
        if options.temporal_window == 0 {
            return Err(Error::Config("temporal window must be > 0".to_string()));
        }

        let all_adverbs = Vocab::new("adverb", file.adverbs.iter().cloned())?;
        for label in &options.adverb_filter {
            all_adverbs.index_of(label)?;
        }
        let keep = |adverb: &str| {
            options.adverb_filter.is_empty() || options.adverb_filter.iter().any(|a| a == adverb)
        };

        let adverbs = Vocab::new("adverb", file.adverbs.iter().filter(|a| keep(a)).cloned())?;
        let actions = Vocab::new("action", file.actions.iter().cloned())?;
        for (adverb, _) in &file.pairs {
            all_adverbs.index_of(adverb)?;
        }
        let kept_pairs: Vec<(String, String)> = file
            .pairs
            .into_iter()
            .filter(|(adverb, _)| keep(adverb))
            .collect();
        let pairs = PairTable::from_labels(&kept_pairs, &adverbs, &actions)?;

        let raw = match split {
            Split::Train => file.train,
            Split::Test => file.test,
        };
        let raw: Vec<RawSample> = raw.into_iter().filter(|s| keep(&s.adverb)).collect();

        let mut modalities = options.modalities.clone();
        modalities.sort();
        modalities.dedup();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.workers.max(1))
            .build()
            .map_err(|e| Error::Dataset(format!("failed to start preprocessing pool: {e}")))?;
        let samples = pool.install(|| {
            raw.par_iter()
                .map(|sample| {
                    Ok(Sample {
                        features: aggregate(sample, &modalities, options.temporal_window)?,
                        adverb: adverbs.index_of(&sample.adverb)?,
                        action: actions.index_of(&sample.action)?,
                    })
                })
                .collect::<Result<Vec<_>>>()
        })?;

        Self::new(adverbs, actions, pairs, samples)
    }

    pub fn adverbs(&self) -> &Vocab {
        &self.adverbs
    }

    pub fn actions(&self) -> &Vocab {
        &self.actions
    }

    pub fn pairs(&self) -> &PairTable {
        &self.pairs
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Stack the given samples into a batch
    ///
    /// # Panics
    ///
    /// Panics if an index is out of range; loaders only pass their own indices.
    pub fn batch(&self, indices: &[usize]) -> Batch {
        let mut features = Array2::zeros((indices.len(), self.feature_dim));
        let mut adverbs = Vec::with_capacity(indices.len());
        let mut actions = Vec::with_capacity(indices.len());
        for (row, &i) in indices.iter().enumerate() {
            let sample = &self.samples[i];
            features.row_mut(row).assign(&sample.features);
            adverbs.push(sample.adverb);
            actions.push(sample.action);
        }
        Batch::new(features, adverbs, actions)
    }
}

/// Mean of the centred `window` frames of each modality, concatenated
fn aggregate(sample: &RawSample, modalities: &[Modality], window: usize) -> Result<Array1<f32>> {
    let mut out = Vec::new();
    for modality in modalities {
        let frames = sample.features.get(modality).ok_or_else(|| {
            Error::Dataset(format!(
                "sample ({}, {}) has no {} features",
                sample.adverb,
                sample.action,
                modality.as_str()
            ))
        })?;
        let dim = frames.first().map(Vec::len).ok_or_else(|| {
            Error::Dataset(format!(
                "sample ({}, {}) has an empty {} sequence",
                sample.adverb,
                sample.action,
                modality.as_str()
            ))
        })?;

        let taken = window.min(frames.len());
        let start = (frames.len() - taken) / 2;
        let mut pooled = vec![0.0f32; dim];
        for frame in &frames[start..start + taken] {
            if frame.len() != dim {
                return Err(Error::ShapeMismatch {
                    what: format!("{} frame", modality.as_str()),
                    expected: vec![dim],
                    got: vec![frame.len()],
                });
            }
            for (acc, value) in pooled.iter_mut().zip(frame) {
                *acc += value;
            }
        }
        out.extend(pooled.into_iter().map(|v| v / taken as f32));
    }
    Ok(Array1::from(out))
}
