//! Softmax cross-entropy with a closed-form gradient

use crate::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};

fn softmax(x: ArrayView1<f32>) -> Array1<f32> {
    let max = x.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exp_x = x.mapv(|v| (v - max).exp());
    let sum = exp_x.sum();
    exp_x / sum
}

/// Mean cross-entropy of `logits` (one row per sample) against class targets.
///
/// Returns the loss and ∂loss/∂logits, i.e. `(softmax - onehot) / n`.
pub fn softmax_cross_entropy(logits: &Array2<f32>, targets: &[usize]) -> Result<(f32, Array2<f32>)> {
    let n = logits.nrows();
    if n == 0 {
        return Err(Error::EmptyBatch);
    }
    if targets.len() != n {
        return Err(Error::ShapeMismatch {
            what: "cross-entropy targets".to_string(),
            expected: vec![n],
            got: vec![targets.len()],
        });
    }

    let classes = logits.ncols();
    let mut grad = Array2::zeros(logits.raw_dim());
    let mut total = 0.0;
    for (i, (row, &target)) in logits.axis_iter(Axis(0)).zip(targets).enumerate() {
        if target >= classes {
            return Err(Error::IndexOutOfRange {
                what: "class",
                index: target,
                len: classes,
            });
        }
        let probs = softmax(row);
        total -= (probs[target] + 1e-10).ln();
        grad.row_mut(i).assign(&probs);
        grad[[i, target]] -= 1.0;
    }

    let scale = 1.0 / n as f32;
    grad.mapv_inplace(|g| g * scale);
    Ok((total * scale, grad))
}
