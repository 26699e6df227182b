//! Batch iteration over an in-memory dataset

use super::{Batch, FeatureDataset};
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;

/// A finite, restartable source of batches
///
/// Each call to [`DataLoader::batches`] starts a fresh pass.
pub trait DataLoader {
    /// Number of batches in one pass
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a new pass over the data
    fn batches(&mut self) -> Box<dyn Iterator<Item = Batch> + '_>;
}

/// Chunks a [`FeatureDataset`] into batches, optionally reshuffling every pass
///
/// Shuffling is seeded with `seed + pass`, so two loaders built with the same
/// seed produce the same sequence of epochs.
#[derive(Debug, Clone)]
pub struct BatchLoader {
    dataset: Arc<FeatureDataset>,
    batch_size: usize,
    shuffle: bool,
    seed: u64,
    pass: u64,
}

impl BatchLoader {
    pub fn new(
        dataset: Arc<FeatureDataset>,
        batch_size: usize,
        shuffle: bool,
        seed: u64,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::Config("batch size must be > 0".to_string()));
        }
        Ok(Self {
            dataset,
            batch_size,
            shuffle,
            seed,
            pass: 0,
        })
    }

    pub fn dataset(&self) -> &FeatureDataset {
        &self.dataset
    }
}

impl DataLoader for BatchLoader {
    fn len(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    fn batches(&mut self) -> Box<dyn Iterator<Item = Batch> + '_> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(self.pass));
            order.shuffle(&mut rng);
        }
        self.pass += 1;

        let chunks: Vec<Vec<usize>> = order
            .chunks(self.batch_size)
            .map(<[usize]>::to_vec)
            .collect();
        let dataset = Arc::clone(&self.dataset);
        Box::new(chunks.into_iter().map(move |indices| dataset.batch(&indices)))
    }
}
