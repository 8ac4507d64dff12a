use log::info;

use crate::data::dataset::Datasets;
use crate::data::input_fn::InputFn;
use crate::error::{Error, Result};
use crate::train::estimator::Estimator;
use crate::train::run_config::RunConfig;
use crate::train::summary::EvalResults;

/// Batch size used when the caller has no preference.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// How long `train_and_evaluate` trains for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainDuration {
    /// Full shuffled passes over the training partition.
    Epochs(usize),
    /// At most this many mini-batch updates, drawn from a single pass.
    Steps(usize),
}

/// Validates the epoch/step arguments.
///
/// Exactly one of `num_epochs` and `steps` must be set. When `num_epochs`
/// is omitted the step count is derived as `train_size / batch_size + 1`;
/// the value passed in `steps` only selects this mode. Training also stops
/// when the single pass over the data runs out, so step mode never trains
/// past one epoch.
pub fn resolve_duration(
    train_size: usize,
    batch_size: usize,
    num_epochs: Option<usize>,
    steps: Option<usize>,
) -> Result<TrainDuration> {
    if num_epochs.is_some() == steps.is_some() {
        return Err(Error::InvalidArgument(
            "Please set one of num_epochs or steps. They are mutually exclusive".to_owned(),
        ));
    }
    if batch_size == 0 {
        return Err(Error::InvalidArgument("batch_size must be at least 1".to_owned()));
    }

    match num_epochs {
        Some(0) => Err(Error::InvalidArgument("num_epochs must be at least 1".to_owned())),
        Some(epochs) => Ok(TrainDuration::Epochs(epochs)),
        None => Ok(TrainDuration::Steps(train_size / batch_size + 1)),
    }
}

/// Trains a fresh (or warm-started) estimator on `data.train` and then
/// evaluates it once over the whole, unshuffled `data.test`.
///
/// Returns the evaluation metrics (`accuracy`, `loss`, `global_step`).
pub fn train_and_evaluate(
    data: &Datasets,
    batch_size: usize,
    num_epochs: Option<usize>,
    steps: Option<usize>,
    config: RunConfig,
) -> Result<EvalResults> {
    let duration = resolve_duration(data.train.num_examples(), batch_size, num_epochs, steps)?;
    if data.train.is_empty() {
        return Err(Error::InvalidArgument("training partition is empty".to_owned()));
    }

    let shuffle_seed = config.seed.unwrap_or_else(rand::random);
    let eval_batch_size = config.eval_batch_size;
    let mut estimator = Estimator::new(config)?;

    let train_input = InputFn::new(&data.train, batch_size).shuffle(true, shuffle_seed);
    let summary = match duration {
        TrainDuration::Epochs(epochs) => {
            info!("Training for {} epochs in batches of {}", epochs, batch_size);
            estimator.train(train_input.num_epochs(Some(epochs)), None)?
        }
        TrainDuration::Steps(steps) => {
            info!("Training for {} steps in batches of {}", steps, batch_size);
            estimator.train(train_input.num_epochs(Some(1)), Some(steps))?
        }
    };
    info!(
        "Trained {} steps; global step is now {}",
        summary.steps(),
        summary.global_step
    );

    let eval_input = InputFn::new(&data.test, eval_batch_size);
    estimator.evaluate(eval_input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic;

    #[test]
    fn both_durations_set_is_rejected() {
        let err = resolve_duration(100, 10, Some(1), Some(5)).unwrap_err();
        match err {
            Error::InvalidArgument(msg) => assert!(msg.contains("mutually exclusive")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn neither_duration_set_is_rejected() {
        assert!(matches!(
            resolve_duration(100, 10, None, None),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn omitted_epochs_derive_steps_from_dataset_size() {
        assert_eq!(resolve_duration(55_000, 550, None, Some(1)).unwrap(), TrainDuration::Steps(101));
        assert_eq!(resolve_duration(1_000, 300, None, Some(7)).unwrap(), TrainDuration::Steps(4));
        assert_eq!(resolve_duration(5, 10, None, Some(99)).unwrap(), TrainDuration::Steps(1));
    }

    #[test]
    fn epochs_pass_through() {
        assert_eq!(resolve_duration(10, 3, Some(2), None).unwrap(), TrainDuration::Epochs(2));
        assert!(resolve_duration(10, 3, Some(0), None).is_err());
        assert!(resolve_duration(10, 0, Some(1), None).is_err());
    }

    #[test]
    fn driver_rejects_invalid_durations_before_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("never_created");
        let data = synthetic(10, 5, 0).unwrap();
        let config = RunConfig::default().with_model_dir(&model_dir);
        assert!(train_and_evaluate(&data, 5, Some(1), Some(1), config.clone()).is_err());
        assert!(train_and_evaluate(&data, 5, None, None, config).is_err());
        assert!(!model_dir.exists());
    }

    #[test]
    fn driver_trains_then_evaluates() {
        let dir = tempfile::tempdir().unwrap();
        let data = synthetic(24, 10, 2).unwrap();
        let config = RunConfig::default().with_model_dir(dir.path()).with_seed(3);

        // 24 / 10 + 1 = 3 steps.
        let results = train_and_evaluate(&data, 10, None, Some(1), config).unwrap();
        assert_eq!(results.global_step, 3);
        assert!((0.0..=1.0).contains(&results.accuracy));
        assert!(results.loss.is_finite());
    }

    #[test]
    fn epoch_mode_covers_every_example_of_each_pass() {
        let dir = tempfile::tempdir().unwrap();
        let data = synthetic(12, 4, 2).unwrap();
        let config = RunConfig::default().with_model_dir(dir.path()).with_seed(3);
        // 2 passes over 12 examples in batches of 5 → ceil(24 / 5) steps.
        let results = train_and_evaluate(&data, 5, Some(2), None, config).unwrap();
        assert_eq!(results.global_step, 5);
    }

    #[test]
    fn step_mode_stops_after_one_epoch_when_batches_divide_evenly() {
        let dir = tempfile::tempdir().unwrap();
        let data = synthetic(20, 4, 0).unwrap();
        let config = RunConfig::default().with_model_dir(dir.path()).with_seed(3);
        // 20 / 10 + 1 = 3 allowed, but one pass only holds 2 batches.
        let results = train_and_evaluate(&data, 10, None, Some(1), config).unwrap();
        assert_eq!(results.global_step, 2);
    }
}
