use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    layers::dense::DenseGradients,
    math::matrix::Matrix,
    network::network::Network,
};

/// Adam optimizer with per-parameter first and second moment estimates.
///
/// Uses the bias-corrected step size
///   lr_t = lr · sqrt(1 − β2^t) / (1 − β1^t)
///   θ   -= lr_t · m / (sqrt(v) + ε)
/// so the first update moves every parameter by roughly `lr`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    /// Number of updates applied so far.
    pub t: u64,
    /// Moments per layer, laid out `(weights, biases)` like the layers.
    m: Vec<(Matrix, Matrix)>,
    v: Vec<(Matrix, Matrix)>,
}

impl Default for Adam {
    fn default() -> Self {
        Adam::new(0.001)
    }
}

impl Adam {
    pub fn new(learning_rate: f64) -> Adam {
        Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Checks that stored moments line up with `network`, layer by layer.
    /// An optimizer that has not stepped yet carries no moments and always
    /// passes.
    pub fn check_moments(&self, network: &Network) -> Result<()> {
        if self.m.is_empty() && self.v.is_empty() {
            return Ok(());
        }
        for moments in [&self.m, &self.v] {
            if moments.len() != network.layers.len() {
                return Err(Error::shape(
                    format!("moments for {} layers", network.layers.len()),
                    moments.len(),
                ));
            }
            for (i, ((mw, mb), layer)) in moments.iter().zip(&network.layers).enumerate() {
                for (moment, param) in [(mw, &layer.weights), (mb, &layer.biases)] {
                    if (moment.rows, moment.cols) != (param.rows, param.cols) {
                        return Err(Error::shape(
                            format!("{}x{} moment in layer {}", param.rows, param.cols, i),
                            format!("{}x{}", moment.rows, moment.cols),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Applies one update to every layer of `network`. `grads` must be in
    /// layer order, as returned by `Network::backward`.
    pub fn step(&mut self, network: &mut Network, grads: &[DenseGradients]) {
        assert_eq!(network.layers.len(), grads.len(), "one gradient per layer");

        if self.m.len() != network.layers.len() {
            let zeros: Vec<(Matrix, Matrix)> = network
                .layers
                .iter()
                .map(|l| {
                    (
                        Matrix::zeros(l.weights.rows, l.weights.cols),
                        Matrix::zeros(l.biases.rows, l.biases.cols),
                    )
                })
                .collect();
            self.m = zeros.clone();
            self.v = zeros;
        }

        self.t += 1;
        let t = self.t as f64;
        let lr_t = self.learning_rate * (1.0 - self.beta2.powf(t)).sqrt()
            / (1.0 - self.beta1.powf(t));

        for (i, layer) in network.layers.iter_mut().enumerate() {
            let (mw, mb) = &mut self.m[i];
            let (vw, vb) = &mut self.v[i];
            update(&mut layer.weights, &grads[i].weights, mw, vw, lr_t, self.beta1, self.beta2, self.epsilon);
            update(&mut layer.biases, &grads[i].biases, mb, vb, lr_t, self.beta1, self.beta2, self.epsilon);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn update(
    param: &mut Matrix,
    grad: &Matrix,
    m: &mut Matrix,
    v: &mut Matrix,
    lr_t: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
) {
    assert_eq!(param.data.len(), grad.data.len(), "gradient shape mismatch");
    for (((p, &g), m), v) in param
        .data
        .iter_mut()
        .zip(&grad.data)
        .zip(m.data.iter_mut())
        .zip(v.data.iter_mut())
    {
        *m = beta1 * *m + (1.0 - beta1) * g;
        *v = beta2 * *v + (1.0 - beta2) * g * g;
        *p -= lr_t * *m / (v.sqrt() + epsilon);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::Activation;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn net_and_grads() -> (Network, Vec<DenseGradients>) {
        let mut rng = StdRng::seed_from_u64(5);
        let net = Network::new(vec![(2, 2, Activation::Identity)], &mut rng);
        let grads = vec![DenseGradients {
            weights: Matrix::from_rows(&[vec![0.5, -3.0], vec![1e-3, -2e-2]]).unwrap(),
            biases: Matrix::from_rows(&[vec![4.0, -0.25]]).unwrap(),
            inputs: Matrix::default(),
        }];
        (net, grads)
    }

    #[test]
    fn first_step_moves_each_parameter_by_learning_rate() {
        let (mut net, grads) = net_and_grads();
        let before = net.layers[0].clone();
        let mut adam = Adam::default();
        adam.step(&mut net, &grads);

        assert_eq!(adam.t, 1);
        for ((new, old), g) in net.layers[0]
            .weights
            .data
            .iter()
            .zip(&before.weights.data)
            .zip(&grads[0].weights.data)
        {
            assert_abs_diff_eq!(old - new, 0.001 * g.signum(), epsilon = 1e-6);
        }
        for ((new, old), g) in net.layers[0]
            .biases
            .data
            .iter()
            .zip(&before.biases.data)
            .zip(&grads[0].biases.data)
        {
            assert_abs_diff_eq!(old - new, 0.001 * g.signum(), epsilon = 1e-6);
        }
    }

    #[test]
    fn zero_gradient_leaves_parameters_unchanged() {
        let (mut net, mut grads) = net_and_grads();
        grads[0].weights = Matrix::zeros(2, 2);
        grads[0].biases = Matrix::zeros(1, 2);
        let before = net.layers[0].weights.clone();
        Adam::default().step(&mut net, &grads);
        assert_eq!(net.layers[0].weights, before);
    }

    #[test]
    fn moments_survive_serialization() {
        let (mut net, grads) = net_and_grads();
        let mut adam = Adam::default();
        adam.step(&mut net, &grads);
        let json = serde_json::to_string(&adam).unwrap();
        let restored: Adam = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.t, 1);
        assert_eq!(restored.m[0].0, adam.m[0].0);
        assert_eq!(restored.v[0].1, adam.v[0].1);
    }

    #[test]
    fn step_size_stays_finite_past_i32_range() {
        let (mut net, grads) = net_and_grads();
        let mut adam = Adam::default();
        adam.t = i32::MAX as u64 + 10;
        let before = net.layers[0].weights.clone();
        adam.step(&mut net, &grads);
        for (new, old) in net.layers[0].weights.data.iter().zip(&before.data) {
            assert!(new.is_finite());
            assert!((old - new).abs() < 0.01);
        }
    }

    #[test]
    fn moments_must_match_network_shapes() {
        let (mut net, grads) = net_and_grads();
        let mut adam = Adam::default();
        adam.check_moments(&net).unwrap();
        adam.step(&mut net, &grads);
        adam.check_moments(&net).unwrap();

        let mut truncated = adam.clone();
        truncated.m[0].0 = Matrix::zeros(1, 2);
        assert!(matches!(truncated.check_moments(&net), Err(Error::Shape { .. })));

        let mut missing = adam.clone();
        missing.v.clear();
        assert!(matches!(missing.check_moments(&net), Err(Error::Shape { .. })));
    }
}
