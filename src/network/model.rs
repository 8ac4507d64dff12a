use rand::Rng;

use crate::{
    activation::activation::{softmax_rows, Activation},
    error::{Error, Result},
    loss::cross_entropy::{one_hot, SoftmaxCrossEntropy},
    math::matrix::Matrix,
    metrics::accuracy::Accuracy,
    network::network::Network,
    optim::adam::Adam,
};

/// Flattened width of one 32×32 image.
pub const IMAGE_PIXELS: usize = 32 * 32;
/// Number of output classes.
pub const NUM_CLASSES: usize = 10;
/// Units in each hidden layer.
pub const HIDDEN_UNITS: usize = 256;

/// Which branch of the model function to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKeys {
    Train,
    Eval,
    Predict,
}

/// Per-example outputs of the logits layer.
#[derive(Debug, Clone)]
pub struct Predictions {
    /// Arg-max class of each row.
    pub classes: Vec<usize>,
    /// Softmax distribution of each row, `(batch, NUM_CLASSES)`.
    pub probabilities: Matrix,
}

/// What one call of `BasicModel::model_fn` produced.
#[derive(Debug, Clone)]
pub enum EstimatorSpec {
    Predict {
        predictions: Predictions,
    },
    Train {
        loss: f64,
        global_step: u64,
    },
    Eval {
        loss: f64,
        accuracy: Accuracy,
    },
}

/// 1024 → 256 (ReLU) → 256 (ReLU) → 10 logits, trained with Adam on
/// softmax cross-entropy.
#[derive(Debug, Clone)]
pub struct BasicModel {
    pub network: Network,
    pub optimizer: Adam,
    pub global_step: u64,
}

impl BasicModel {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> BasicModel {
        let network = Network::new(
            vec![
                (HIDDEN_UNITS, IMAGE_PIXELS, Activation::ReLU),
                (HIDDEN_UNITS, HIDDEN_UNITS, Activation::ReLU),
                (NUM_CLASSES, HIDDEN_UNITS, Activation::Identity),
            ],
            rng,
        );
        BasicModel {
            network,
            optimizer: Adam::default(),
            global_step: 0,
        }
    }

    /// Runs one batch through the branch selected by `mode`.
    ///
    /// `features` may have any width as long as its element count is a
    /// multiple of `IMAGE_PIXELS`; it is reshaped to `(-1, IMAGE_PIXELS)`.
    /// Train and Eval need `labels`, one per reshaped row. Only Train mutates
    /// the parameters and the global step.
    pub fn model_fn(
        &mut self,
        features: Matrix,
        labels: Option<&[usize]>,
        mode: ModeKeys,
    ) -> Result<EstimatorSpec> {
        let input_layer = features.reshape(IMAGE_PIXELS)?;

        if mode == ModeKeys::Predict {
            let logits = self.network.infer(&input_layer);
            return Ok(EstimatorSpec::Predict {
                predictions: predictions_from(&logits),
            });
        }

        let labels = labels.ok_or(Error::MissingLabels)?;
        if labels.len() != input_layer.rows {
            return Err(Error::shape(
                format!("{} labels", input_layer.rows),
                labels.len(),
            ));
        }
        let onehot_labels = one_hot(labels, NUM_CLASSES)?;

        match mode {
            ModeKeys::Train => {
                let logits = self.network.forward(input_layer);
                let loss = SoftmaxCrossEntropy::loss(&logits, &onehot_labels);
                let probabilities = softmax_rows(&logits);
                let delta = SoftmaxCrossEntropy::derivative(&probabilities, &onehot_labels);
                let grads = self.network.backward(delta);
                self.optimizer.step(&mut self.network, &grads);
                self.global_step += 1;
                Ok(EstimatorSpec::Train {
                    loss,
                    global_step: self.global_step,
                })
            }
            ModeKeys::Eval => {
                let logits = self.network.infer(&input_layer);
                let loss = SoftmaxCrossEntropy::loss(&logits, &onehot_labels);
                let predictions = predictions_from(&logits);
                let mut accuracy = Accuracy::new();
                accuracy.update(&predictions.classes, labels);
                Ok(EstimatorSpec::Eval { loss, accuracy })
            }
            ModeKeys::Predict => unreachable!("handled above"),
        }
    }
}

fn predictions_from(logits: &Matrix) -> Predictions {
    Predictions {
        classes: logits.argmax_rows(),
        probabilities: softmax_rows(logits),
    }
}
