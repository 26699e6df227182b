//! Pair scoring for a batch of query embeddings

use crate::data::PairTable;
use crate::{Error, Result};
use ndarray::Array2;

/// A pair competing for one row, with its global pair index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub pair: usize,
    pub score: f32,
}

/// Candidates of one row: the pairs sharing its ground-truth action
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionedRow {
    pub action: usize,
    pub candidates: Vec<Candidate>,
}

/// Scores of one batch against the pair table
#[derive(Debug, Clone)]
pub struct PairScores {
    /// N × num_pairs dot products
    pub full: Array2<f32>,
    /// N × num_adverbs; column j scores (adverb j, ground-truth action),
    /// `-inf` where that pair does not exist
    pub by_action_gt: Array2<f32>,
    /// Per row, candidates in table order
    pub conditioned: Vec<ConditionedRow>,
}

/// Score every query against every pair and restrict each row to its
/// ground-truth action.
///
/// `predictions` is N × D and `pair_embeddings` num_pairs × D.
pub fn score(
    predictions: &Array2<f32>,
    pair_embeddings: &Array2<f32>,
    pairs: &PairTable,
    action_gt: &[usize],
    adverb_gt: &[usize],
) -> Result<PairScores> {
    let n = predictions.nrows();
    if action_gt.len() != n || adverb_gt.len() != n {
        return Err(Error::ShapeMismatch {
            what: "ground truth".to_string(),
            expected: vec![n, n],
            got: vec![action_gt.len(), adverb_gt.len()],
        });
    }
    if pair_embeddings.nrows() != pairs.len() || pair_embeddings.ncols() != predictions.ncols() {
        return Err(Error::ShapeMismatch {
            what: "pair embeddings".to_string(),
            expected: vec![pairs.len(), predictions.ncols()],
            got: pair_embeddings.shape().to_vec(),
        });
    }

    let full = predictions.dot(&pair_embeddings.t());
    let mut by_action_gt = Array2::from_elem((n, pairs.num_adverbs()), f32::NEG_INFINITY);
    let mut conditioned = Vec::with_capacity(n);

    for (row, &action) in action_gt.iter().enumerate() {
        let candidates: Vec<Candidate> = pairs
            .indices_for_action(action)
            .iter()
            .map(|&pair| Candidate {
                pair,
                score: full[[row, pair]],
            })
            .collect();
        if candidates.is_empty() {
            return Err(Error::NoCandidates { action });
        }
        for candidate in &candidates {
            let adverb = pairs.adverb_of(candidate.pair)?;
            by_action_gt[[row, adverb]] = candidate.score;
        }
        conditioned.push(ConditionedRow { action, candidates });
    }

    Ok(PairScores {
        full,
        by_action_gt,
        conditioned,
    })
}
