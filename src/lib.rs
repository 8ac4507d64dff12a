pub mod activation;
pub mod data;
pub mod error;
pub mod layers;
pub mod loss;
pub mod math;
pub mod metrics;
pub mod network;
pub mod optim;
pub mod train;

// Convenience re-exports
pub use data::{load_mnist_32x32, synthetic, DataSet, Datasets, InputFn};
pub use error::{Error, Result};
pub use math::matrix::Matrix;
pub use network::model::{BasicModel, EstimatorSpec, ModeKeys, Predictions};
pub use train::{train_and_evaluate, Estimator, EvalResults, RunConfig};
