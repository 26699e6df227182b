//! Top-1 adverb accuracy over action-conditioned candidates

use super::{Candidate, ConditionedRow};
use crate::data::PairTable;
use crate::{Error, Result};

/// Pair index of the best candidate; ties go to the earliest candidate.
///
/// A NaN score wins over any number, so the first NaN is returned.
pub fn top1_pair(candidates: &[Candidate]) -> Option<usize> {
    let mut best: Option<&Candidate> = None;
    for candidate in candidates {
        if candidate.score.is_nan() {
            return Some(candidate.pair);
        }
        if best.map_or(true, |b| candidate.score > b.score) {
            best = Some(candidate);
        }
    }
    best.map(|c| c.pair)
}

/// Fraction of rows whose top-scoring candidate pair carries the
/// ground-truth adverb.
///
/// A NaN or infinite candidate score is an error.
///
/// # Example
///
/// ```
/// use adverb_trainer::data::{PairTable, Vocab};
/// use adverb_trainer::eval::{top1_adverb_accuracy, Candidate, ConditionedRow};
///
/// let adverbs = Vocab::new("adverb", ["fast", "slow"]).unwrap();
/// let actions = Vocab::new("action", ["run"]).unwrap();
/// let pairs = PairTable::from_labels(&[("fast", "run"), ("slow", "run")], &adverbs, &actions).unwrap();
///
/// let rows = vec![ConditionedRow {
///     action: 0,
///     candidates: vec![
///         Candidate { pair: 0, score: 0.2 },
///         Candidate { pair: 1, score: 0.7 },
///     ],
/// }];
/// let acc = top1_adverb_accuracy(&pairs, &rows, &[1]).unwrap();
/// assert_eq!(acc, 1.0);
/// ```
pub fn top1_adverb_accuracy(
    pairs: &PairTable,
    conditioned: &[ConditionedRow],
    adverb_gt: &[usize],
) -> Result<f32> {
    if conditioned.is_empty() {
        return Err(Error::EmptyBatch);
    }
    if conditioned.len() != adverb_gt.len() {
        return Err(Error::ShapeMismatch {
            what: "adverb ground truth".to_string(),
            expected: vec![conditioned.len()],
            got: vec![adverb_gt.len()],
        });
    }

    let mut correct = 0usize;
    for (row, &gt) in conditioned.iter().zip(adverb_gt) {
        if let Some(c) = row.candidates.iter().find(|c| !c.score.is_finite()) {
            return Err(Error::NonFiniteScore {
                action: row.action,
                pair: c.pair,
            });
        }
        let pair = top1_pair(&row.candidates)
            .ok_or(Error::NoCandidates { action: row.action })?;
        if pairs.adverb_of(pair)? == gt {
            correct += 1;
        }
    }
    Ok(correct as f32 / conditioned.len() as f32)
}
