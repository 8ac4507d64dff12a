use std::path::Path;
use std::time::Instant;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{Error, Result};
use crate::math::matrix::Matrix;
use crate::metrics::{accuracy::Accuracy, mean::Mean};
use crate::network::checkpoint::{Checkpoint, CheckpointManager};
use crate::network::model::{BasicModel, EstimatorSpec, ModeKeys};
use crate::train::run_config::RunConfig;
use crate::train::summary::{EvalResults, Prediction, StepStats, TrainSummary};

/// Drives `BasicModel::model_fn` over input batches and owns the model's
/// checkpoint directory.
///
/// Construction warm-starts from the latest checkpoint in
/// `config.model_dir` when one exists, so consecutive `train` calls (or
/// separate processes) continue the same global step.
pub struct Estimator {
    model: BasicModel,
    config: RunConfig,
    checkpoints: CheckpointManager,
}

impl Estimator {
    pub fn new(config: RunConfig) -> Result<Estimator> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut model = BasicModel::new(&mut rng);
        let checkpoints = CheckpointManager::new(&config.model_dir, config.keep_checkpoint_max);

        match checkpoints.restore_latest()? {
            Some(checkpoint) => {
                checkpoint.restore_into(&mut model)?;
                info!("Warm-started at global step {}", model.global_step);
            }
            None => info!(
                "No checkpoint in {}; starting from freshly initialized parameters ({} trainable)",
                config.model_dir.display(),
                model.network.parameter_count()
            ),
        }

        Ok(Estimator {
            model,
            config,
            checkpoints,
        })
    }

    /// Like `new`, but fails if the model directory holds no checkpoint.
    pub fn from_checkpoint(config: RunConfig) -> Result<Estimator> {
        let checkpoints = CheckpointManager::new(&config.model_dir, config.keep_checkpoint_max);
        if checkpoints.latest()?.is_none() {
            return Err(Error::NoCheckpoint(config.model_dir.clone()));
        }
        Estimator::new(config)
    }

    pub fn global_step(&self) -> u64 {
        self.model.global_step
    }

    pub fn model(&self) -> &BasicModel {
        &self.model
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn model_dir(&self) -> &Path {
        self.checkpoints.dir()
    }

    /// Trains on batches from `input_fn` until `steps` updates have run or
    /// the input is exhausted, whichever comes first. `steps: None` runs the
    /// input to exhaustion.
    ///
    /// A checkpoint is written every `save_checkpoints_steps` (if set) and
    /// once at the end when at least one step ran.
    pub fn train<I>(&mut self, input_fn: I, steps: Option<usize>) -> Result<TrainSummary>
    where
        I: IntoIterator<Item = (Matrix, Vec<usize>)>,
    {
        if steps == Some(0) {
            return Err(Error::InvalidArgument("steps must be greater than 0".to_owned()));
        }

        let mut losses = Vec::new();
        let mut logged = Vec::new();
        let mut last_log: Option<(Instant, u64)> = None;
        let mut last_saved_step = None;
        let log_every = self.config.log_step_count_steps.max(1) as u64;

        for (features, labels) in input_fn {
            let spec = self.model.model_fn(features, Some(&labels), ModeKeys::Train)?;
            let EstimatorSpec::Train { loss, global_step } = spec else {
                unreachable!("train mode always yields a train spec");
            };
            losses.push(loss);
            debug!("step {} batch of {}: loss {:.6}", global_step, labels.len(), loss);

            if last_log.is_none() || global_step % log_every == 0 {
                let now = Instant::now();
                let steps_per_sec = last_log.map(|(at, step)| {
                    (global_step - step) as f64 / now.duration_since(at).as_secs_f64().max(1e-9)
                });
                if let Some(rate) = steps_per_sec {
                    info!("global_step/sec: {:.4}", rate);
                }
                info!("loss = {:.6}, step = {}", loss, global_step);
                logged.push(StepStats {
                    global_step,
                    loss,
                    steps_per_sec,
                });
                last_log = Some((now, global_step));
            }

            if let Some(every) = self.config.save_checkpoints_steps {
                if global_step % every as u64 == 0 {
                    self.save_checkpoint()?;
                    last_saved_step = Some(global_step);
                }
            }

            if steps.is_some_and(|limit| losses.len() >= limit) {
                break;
            }
        }

        let checkpoint = if losses.is_empty() {
            None
        } else if last_saved_step == Some(self.model.global_step) {
            self.checkpoints.latest()?
        } else {
            Some(self.save_checkpoint()?)
        };

        if let Some(&loss) = losses.last() {
            info!("Loss for final step: {:.6}.", loss);
        }

        Ok(TrainSummary {
            global_step: self.model.global_step,
            losses,
            logged,
            checkpoint,
        })
    }

    /// Runs one pass of `input_fn` in eval mode.
    ///
    /// `loss` is the mean of per-batch losses; `accuracy` counts every example
    /// equally.
    pub fn evaluate<I>(&mut self, input_fn: I) -> Result<EvalResults>
    where
        I: IntoIterator<Item = (Matrix, Vec<usize>)>,
    {
        let started = Instant::now();
        let mut loss = Mean::new();
        let mut accuracy = Accuracy::new();

        for (features, labels) in input_fn {
            let spec = self.model.model_fn(features, Some(&labels), ModeKeys::Eval)?;
            let EstimatorSpec::Eval {
                loss: batch_loss,
                accuracy: batch_accuracy,
            } = spec
            else {
                unreachable!("eval mode always yields an eval spec");
            };
            loss.update(batch_loss);
            accuracy.merge(&batch_accuracy);
        }

        if loss.count() == 0 {
            return Err(Error::InvalidArgument(
                "evaluation input produced no batches".to_owned(),
            ));
        }

        let results = EvalResults {
            accuracy: accuracy.result(),
            loss: loss.result(),
            global_step: self.model.global_step,
        };
        info!(
            "Finished evaluation of {} examples in {:.2}s",
            accuracy.total(),
            started.elapsed().as_secs_f64()
        );
        info!(
            "Evaluation at global step {}: accuracy = {:.6}, global_step = {}, loss = {:.6}",
            results.global_step, results.accuracy, results.global_step, results.loss
        );
        Ok(results)
    }

    /// Class and probability vector for every row fed in.
    pub fn predict<I>(&mut self, input_fn: I) -> Result<Vec<Prediction>>
    where
        I: IntoIterator<Item = Matrix>,
    {
        let mut out = Vec::new();
        for features in input_fn {
            let spec = self.model.model_fn(features, None, ModeKeys::Predict)?;
            let EstimatorSpec::Predict { predictions } = spec else {
                unreachable!("predict mode always yields predictions");
            };
            out.extend(
                predictions
                    .classes
                    .iter()
                    .zip(predictions.probabilities.row_iter())
                    .map(|(&class, probabilities)| Prediction {
                        class,
                        probabilities: probabilities.to_vec(),
                    }),
            );
        }
        Ok(out)
    }

    fn save_checkpoint(&self) -> Result<std::path::PathBuf> {
        self.checkpoints.save(&Checkpoint::from_model(&self.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{synthetic, InputFn};
    use approx::assert_abs_diff_eq;

    fn config(dir: &Path) -> RunConfig {
        RunConfig::default().with_model_dir(dir).with_seed(7)
    }

    #[test]
    fn train_stops_at_step_limit_and_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let data = synthetic(40, 10, 1).unwrap();
        let mut est = Estimator::new(config(dir.path())).unwrap();

        let input = InputFn::new(&data.train, 8).num_epochs(None).shuffle(true, 2);
        let summary = est.train(input, Some(3)).unwrap();

        assert_eq!(summary.steps(), 3);
        assert_eq!(summary.global_step, 3);
        assert_eq!(summary.logged[0].global_step, 1);
        let ckpt = summary.checkpoint.unwrap();
        assert!(ckpt.ends_with("model.ckpt-3.json"));
        assert!(ckpt.exists());
    }

    #[test]
    fn train_runs_bounded_input_to_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        let data = synthetic(20, 4, 1).unwrap();
        let mut est = Estimator::new(config(dir.path())).unwrap();
        // 2 passes over 20 examples in batches of 8 → ceil(40 / 8) batches.
        let input = InputFn::new(&data.train, 8).num_epochs(Some(2)).shuffle(true, 0);
        let summary = est.train(input, None).unwrap();
        assert_eq!(summary.steps(), 5);
    }

    #[test]
    fn zero_steps_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let data = synthetic(4, 4, 1).unwrap();
        let mut est = Estimator::new(config(dir.path())).unwrap();
        assert!(matches!(
            est.train(InputFn::new(&data.train, 2), Some(0)),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn second_estimator_warm_starts_from_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let data = synthetic(16, 8, 4).unwrap();

        let mut first = Estimator::new(config(dir.path())).unwrap();
        first.train(InputFn::new(&data.train, 8).num_epochs(None), Some(2)).unwrap();
        let eval_first = first.evaluate(InputFn::new(&data.test, 128)).unwrap();

        let mut second = Estimator::from_checkpoint(config(dir.path())).unwrap();
        assert_eq!(second.global_step(), 2);
        let eval_second = second.evaluate(InputFn::new(&data.test, 128)).unwrap();
        assert_abs_diff_eq!(eval_first.loss, eval_second.loss, epsilon = 1e-9);

        let summary = second.train(InputFn::new(&data.train, 8).num_epochs(None), Some(1)).unwrap();
        assert_eq!(summary.global_step, 3);
    }

    #[test]
    fn from_checkpoint_requires_a_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Estimator::from_checkpoint(config(dir.path())),
            Err(Error::NoCheckpoint(_))
        ));
    }

    #[test]
    fn evaluate_reports_bounded_accuracy() {
        let dir = tempfile::tempdir().unwrap();
        let data = synthetic(8, 30, 5).unwrap();
        let mut est = Estimator::new(config(dir.path())).unwrap();
        let results = est.evaluate(InputFn::new(&data.test, 7)).unwrap();
        assert!((0.0..=1.0).contains(&results.accuracy));
        assert!(results.loss > 0.0);
        assert_eq!(results.global_step, 0);
    }

    #[test]
    fn evaluate_on_empty_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let data = synthetic(4, 0, 5).unwrap();
        let mut est = Estimator::new(config(dir.path())).unwrap();
        assert!(est.evaluate(InputFn::new(&data.test, 4)).is_err());
    }

    #[test]
    fn predict_returns_one_distribution_per_example() {
        let dir = tempfile::tempdir().unwrap();
        let data = synthetic(4, 9, 6).unwrap();
        let mut est = Estimator::new(config(dir.path())).unwrap();
        let preds = est
            .predict(InputFn::new(&data.test, 4).map(|(features, _)| features))
            .unwrap();
        assert_eq!(preds.len(), 9);
        for p in &preds {
            assert_eq!(p.probabilities.len(), 10);
            assert_abs_diff_eq!(p.probabilities.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
            assert!(p.class < 10);
        }
    }

    #[test]
    fn periodic_checkpoints_respect_retention() {
        let dir = tempfile::tempdir().unwrap();
        let data = synthetic(8, 2, 3).unwrap();
        let cfg = config(dir.path())
            .with_save_checkpoints_steps(1)
            .with_keep_checkpoint_max(2);
        let mut est = Estimator::new(cfg).unwrap();
        let summary = est.train(InputFn::new(&data.train, 4).num_epochs(None), Some(3)).unwrap();
        assert!(summary.checkpoint.unwrap().ends_with("model.ckpt-3.json"));
        let manager = CheckpointManager::new(dir.path(), 2);
        assert_eq!(manager.all().unwrap().len(), 2);
    }
}
