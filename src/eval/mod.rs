//! Action-conditioned retrieval evaluation
//!
//! Each query is scored against every pair, then only against the pairs that
//! share its ground-truth action. The best of those picks the predicted
//! adverb. Historical dashboards call this "Video-to-Adverb Antonym"; the
//! metric tag keeps that name.

mod evaluator;
mod metric;

pub use evaluator::{score, Candidate, ConditionedRow, PairScores};
pub use metric::{top1_adverb_accuracy, top1_pair};

use crate::data::{DataLoader, PairTable};
use crate::metrics::{MetricsSink, ACC_ADVERB};
use crate::model::EmbeddingModel;
use crate::{Error, Result};

/// One evaluation pass over `loader`.
///
/// Emits the accuracy of every batch at step `epoch` and returns the mean
/// over batches. The model runs in eval mode and is left in the mode it
/// was in before the call.
pub fn evaluate<M: EmbeddingModel + ?Sized>(
    model: &mut M,
    loader: &mut dyn DataLoader,
    pairs: &PairTable,
    sink: &mut dyn MetricsSink,
    epoch: usize,
) -> Result<f32> {
    let was_training = model.is_training();
    model.eval();
    let result = evaluate_batches(model, loader, pairs, sink, epoch);
    if was_training {
        model.train();
    }

    let accuracy = result?;
    tracing::info!("E {} | Video-to-Adverb Antonym P@1: {:.3}", epoch, accuracy);
    Ok(accuracy)
}

fn evaluate_batches<M: EmbeddingModel + ?Sized>(
    model: &M,
    loader: &mut dyn DataLoader,
    pairs: &PairTable,
    sink: &mut dyn MetricsSink,
    epoch: usize,
) -> Result<f32> {
    let pair_embeddings = model.pair_embeddings()?;
    let mut sum = 0.0f64;
    let mut batches = 0usize;

    for batch in loader.batches() {
        let predictions = model.forward_eval(&batch)?;
        let scores = score(
            &predictions,
            &pair_embeddings,
            pairs,
            &batch.actions,
            &batch.adverbs,
        )?;
        let accuracy = top1_adverb_accuracy(pairs, &scores.conditioned, &batch.adverbs)?;
        sink.add_scalar(ACC_ADVERB, f64::from(accuracy), epoch)?;
        tracing::debug!(epoch, batch = batches, accuracy, "evaluated batch");

        sum += f64::from(accuracy);
        batches += 1;
    }

    if batches == 0 {
        return Err(Error::EmptyLoader);
    }
    Ok((sum / batches as f64) as f32)
}
