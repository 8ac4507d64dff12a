use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{activation::activation::Activation, math::matrix::Matrix};

/// Fully connected layer: `a = activation(x · W + b)`.
///
/// The kernel is `(input_size, size)` so a batch of row vectors multiplies
/// straight through. The last batch fed forward is cached for backprop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub size: usize,
    pub weights: Matrix,
    pub biases: Matrix,
    pub activator: Activation,
    #[serde(skip)]
    inputs: Matrix,
    #[serde(skip)]
    pre_neurons: Matrix, // z = xW + b, needed for the activation derivative
}

/// Gradients of the loss for one layer, plus the error signal for the layer
/// below it.
#[derive(Debug, Clone)]
pub struct DenseGradients {
    pub weights: Matrix,
    pub biases: Matrix,
    pub inputs: Matrix,
}

impl Dense {
    /// Glorot-uniform kernel, zero bias.
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Dense {
        Dense {
            size,
            weights: Matrix::glorot_uniform(input_size, size, rng),
            biases: Matrix::zeros(1, size),
            activator: activation,
            inputs: Matrix::default(),
            pre_neurons: Matrix::default(),
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    /// Forward pass without touching the backprop cache.
    pub fn apply(&self, input: &Matrix) -> Matrix {
        let z = (input * &self.weights).add_row(&self.biases);
        z.map(|x| self.activator.function(x))
    }

    /// Forward pass that records the input and pre-activation for
    /// `compute_gradients`.
    pub fn feed_from(&mut self, input: Matrix) -> Matrix {
        let z = (&input * &self.weights).add_row(&self.biases);
        let a = z.map(|x| self.activator.function(x));
        self.inputs = input;
        self.pre_neurons = z;
        a
    }

    /// `output_delta` is ∂L/∂a for this layer over the cached batch.
    pub fn compute_gradients(&self, output_delta: &Matrix) -> DenseGradients {
        let act_derivative = self.pre_neurons.map(|x| self.activator.derivative(x));
        // δ = error ⊙ σ'(z)
        let layer_delta = output_delta.hadamard(&act_derivative);

        DenseGradients {
            weights: &self.inputs.transpose() * &layer_delta,
            biases: layer_delta.sum_rows(),
            inputs: &layer_delta * &self.weights.transpose(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixed_layer(activation: Activation) -> Dense {
        let mut rng = StdRng::seed_from_u64(0);
        let mut layer = Dense::new(2, 3, activation, &mut rng);
        layer.weights = Matrix::from_rows(&[
            vec![1.0, -1.0],
            vec![0.5, 2.0],
            vec![-2.0, 0.0],
        ])
        .unwrap();
        layer.biases = Matrix::from_rows(&[vec![0.1, -0.2]]).unwrap();
        layer
    }

    #[test]
    fn new_layer_has_zero_bias() {
        let mut rng = StdRng::seed_from_u64(3);
        let layer = Dense::new(4, 6, Activation::ReLU, &mut rng);
        assert_eq!(layer.input_size(), 6);
        assert!(layer.biases.data.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn feed_from_applies_affine_then_relu() {
        let mut layer = fixed_layer(Activation::ReLU);
        let x = Matrix::from_rows(&[vec![1.0, 1.0, 1.0]]).unwrap();
        let a = layer.feed_from(x.clone());
        // z = [1 + 0.5 - 2 + 0.1, -1 + 2 + 0 - 0.2] = [-0.4, 0.8]
        assert_abs_diff_eq!(a.get(0, 0), 0.0);
        assert_abs_diff_eq!(a.get(0, 1), 0.8, epsilon = 1e-12);
        assert_eq!(layer.apply(&x), a);
    }

    #[test]
    fn gradients_match_finite_differences() {
        let mut layer = fixed_layer(Activation::Identity);
        let x = Matrix::from_rows(&[vec![0.3, -0.7, 1.2], vec![1.0, 0.0, -0.5]]).unwrap();
        // L = sum(a), so ∂L/∂a is all ones.
        layer.feed_from(x.clone());
        let grads = layer.compute_gradients(&Matrix::from_vec(2, 2, vec![1.0; 4]).unwrap());

        let loss = |l: &Dense| l.apply(&x).data.iter().sum::<f64>();
        let h = 1e-6;
        for idx in 0..layer.weights.data.len() {
            let mut bumped = layer.clone();
            bumped.weights.data[idx] += h;
            let numeric = (loss(&bumped) - loss(&layer)) / h;
            assert_abs_diff_eq!(grads.weights.data[idx], numeric, epsilon = 1e-4);
        }
        assert_eq!(grads.biases.data, vec![2.0, 2.0]);
        assert_eq!((grads.inputs.rows, grads.inputs.cols), (2, 3));
    }
}
