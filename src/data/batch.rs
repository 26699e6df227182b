//! Batch structure for training and evaluation

use ndarray::Array2;

/// A batch of aggregated feature vectors and their labels
#[derive(Clone, Debug)]
pub struct Batch {
    /// One row per sample (batch_size × feature_dim)
    pub features: Array2<f32>,

    /// Ground-truth adverb index per sample
    pub adverbs: Vec<usize>,

    /// Ground-truth action index per sample
    pub actions: Vec<usize>,
}

impl Batch {
    pub fn new(features: Array2<f32>, adverbs: Vec<usize>, actions: Vec<usize>) -> Self {
        Self {
            features,
            adverbs,
            actions,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
