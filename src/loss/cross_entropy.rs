use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// One-hot encodes class indices into a `(labels.len(), depth)` matrix.
///
/// Fails if any label is `>= depth`.
pub fn one_hot(labels: &[usize], depth: usize) -> Result<Matrix> {
    let mut m = Matrix::zeros(labels.len(), depth);
    for (i, &label) in labels.iter().enumerate() {
        if label >= depth {
            return Err(Error::InvalidArgument(format!(
                "label {} at index {} is out of range for {} classes",
                label, i, depth
            )));
        }
        m.data[i * depth + label] = 1.0;
    }
    Ok(m)
}

/// Softmax cross-entropy computed from logits against one-hot targets,
/// averaged over the batch.
pub struct SoftmaxCrossEntropy;

impl SoftmaxCrossEntropy {
    /// Mean over rows of `-sum(onehot * log_softmax(logits))`.
    ///
    /// Uses `logsumexp(z) - z_y` so very confident logits stay finite.
    pub fn loss(logits: &Matrix, onehot: &Matrix) -> f64 {
        assert_eq!(logits.rows, onehot.rows);
        assert_eq!(logits.cols, onehot.cols);
        if logits.rows == 0 {
            return 0.0;
        }

        let total: f64 = logits
            .row_iter()
            .zip(onehot.row_iter())
            .map(|(z, y)| {
                let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let lse = max + z.iter().map(|v| (v - max).exp()).sum::<f64>().ln();
                z.iter().zip(y).map(|(zi, yi)| yi * (lse - zi)).sum::<f64>()
            })
            .sum();

        total / logits.rows as f64
    }

    /// Gradient of the batch-mean loss w.r.t. the logits:
    ///   ∂L/∂z = (softmax(z) - onehot) / batch
    ///
    /// `probabilities` is the softmax of the logits, already computed for the
    /// predictions.
    pub fn derivative(probabilities: &Matrix, onehot: &Matrix) -> Matrix {
        let inv_batch = 1.0 / probabilities.rows.max(1) as f64;
        (probabilities - onehot).map(|x| x * inv_batch)
    }
}
