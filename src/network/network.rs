use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    activation::activation::Activation,
    layers::dense::{Dense, DenseGradients},
    math::matrix::Matrix,
};

/// A stack of dense layers run input → output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Dense>,
}

impl Network {
    /// Builds a network from (size, input_size, activation) tuples.
    pub fn new<R: Rng + ?Sized>(
        layer_specs: Vec<(usize, usize, Activation)>,
        rng: &mut R,
    ) -> Network {
        let layers = layer_specs
            .into_iter()
            .map(|(size, input_size, activation)| Dense::new(size, input_size, activation, &mut *rng))
            .collect();
        Network { layers }
    }

    /// Forward pass; caches per-layer activations for `backward`.
    pub fn forward(&mut self, input: Matrix) -> Matrix {
        let mut current = input;
        for layer in &mut self.layers {
            current = layer.feed_from(current);
        }
        current
    }

    /// Forward pass that leaves the backprop cache alone.
    pub fn infer(&self, input: &Matrix) -> Matrix {
        let mut current = input.clone();
        for layer in &self.layers {
            current = layer.apply(&current);
        }
        current
    }

    /// Back-propagates ∂L/∂output through the batch cached by the last
    /// `forward` call. Gradients come back in layer order.
    pub fn backward(&self, output_delta: Matrix) -> Vec<DenseGradients> {
        let mut grads = Vec::with_capacity(self.layers.len());
        let mut delta = output_delta;
        for layer in self.layers.iter().rev() {
            let g = layer.compute_gradients(&delta);
            delta = g.inputs.clone();
            grads.push(g);
        }
        grads.reverse();
        grads
    }

    /// Total number of trainable scalars.
    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weights.data.len() + l.biases.data.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tiny() -> Network {
        let mut rng = StdRng::seed_from_u64(11);
        Network::new(
            vec![
                (4, 3, Activation::ReLU),
                (2, 4, Activation::Identity),
            ],
            &mut rng,
        )
    }

    #[test]
    fn forward_and_infer_agree() {
        let mut net = tiny();
        let x = Matrix::from_rows(&[vec![0.1, 0.2, 0.3], vec![-1.0, 0.5, 2.0]]).unwrap();
        let inferred = net.infer(&x);
        let forwarded = net.forward(x);
        assert_eq!(inferred, forwarded);
        assert_eq!((forwarded.rows, forwarded.cols), (2, 2));
    }

    #[test]
    fn backward_returns_one_gradient_per_layer_in_order() {
        let mut net = tiny();
        let x = Matrix::from_rows(&[vec![0.1, 0.2, 0.3]]).unwrap();
        net.forward(x);
        let grads = net.backward(Matrix::from_rows(&[vec![1.0, -1.0]]).unwrap());
        assert_eq!(grads.len(), 2);
        assert_eq!((grads[0].weights.rows, grads[0].weights.cols), (3, 4));
        assert_eq!((grads[1].weights.rows, grads[1].weights.cols), (4, 2));
    }

    #[test]
    fn same_seed_builds_same_weights() {
        let a = tiny();
        let b = tiny();
        assert_eq!(a.layers[0].weights, b.layers[0].weights);
        assert_eq!(a.parameter_count(), 3 * 4 + 4 + 4 * 2 + 2);
    }
}
