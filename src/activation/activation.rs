use serde::{Deserialize, Serialize};

use crate::math::matrix::Matrix;

/// Element-wise activation applied after a dense layer's affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    ReLU,
    /// No activation; used by the logits layer.
    Identity,
}

impl Activation {
    pub fn function(&self, x: f64) -> f64 {
        match self {
            Activation::ReLU => if x > 0.0 { x } else { 0.0 },
            Activation::Identity => x,
        }
    }

    /// Derivative at the pre-activation value `x`. ReLU uses 0 at the kink.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            Activation::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            Activation::Identity => 1.0,
        }
    }
}

/// Row-wise softmax of a `(batch, classes)` logits matrix.
///
/// Each row is shifted by its maximum before exponentiation so large logits
/// do not overflow to `inf`.
pub fn softmax_rows(logits: &Matrix) -> Matrix {
    let mut out = Matrix::zeros(logits.rows, logits.cols);
    for (dst, row) in out.data.chunks_exact_mut(logits.cols.max(1)).zip(logits.row_iter()) {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut sum = 0.0;
        for (d, &z) in dst.iter_mut().zip(row) {
            *d = (z - max).exp();
            sum += *d;
        }
        for d in dst.iter_mut() {
            *d /= sum;
        }
    }
    out
}
