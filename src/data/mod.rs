//! Datasets, vocabularies and batch loading

mod batch;
mod dataset;
mod loader;
mod vocab;

pub use batch::Batch;
pub use dataset::{
    DatasetOptions, FeatureDataset, FeatureFile, Modality, RawSample, Sample, Split,
};
pub use loader::{BatchLoader, DataLoader};
pub use vocab::{Pair, PairTable, Vocab};

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ndarray::Array1;

    /// `n` samples over pairs {(fast, run), (slow, run), (fast, walk)};
    /// feature 0 of sample `i` is `i`, so rows are traceable through loaders.
    pub(crate) fn toy_dataset(n: usize) -> FeatureDataset {
        let adverbs = Vocab::new("adverb", ["fast", "slow"]).unwrap();
        let actions = Vocab::new("action", ["run", "walk"]).unwrap();
        let pairs = PairTable::from_labels(
            &[("fast", "run"), ("slow", "run"), ("fast", "walk")],
            &adverbs,
            &actions,
        )
        .unwrap();
        let samples = (0..n)
            .map(|i| {
                let pair = pairs.get(i % pairs.len()).unwrap();
                Sample {
                    features: Array1::from(vec![i as f32, pair.adverb as f32, pair.action as f32]),
                    adverb: pair.adverb,
                    action: pair.action,
                }
            })
            .collect();
        FeatureDataset::new(adverbs, actions, pairs, samples).unwrap()
    }
}
