pub mod estimator;
pub mod run_config;
pub mod summary;
pub mod trainer;

pub use estimator::Estimator;
pub use run_config::RunConfig;
pub use summary::{EvalResults, Prediction, StepStats, TrainSummary};
pub use trainer::{resolve_duration, train_and_evaluate, TrainDuration};
