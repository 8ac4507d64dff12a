use std::path::PathBuf;

/// Where checkpoints go when no model directory is given.
pub const DEFAULT_MODEL_DIR: &str = "tmp/mnist_basic_model";

/// Configuration for an `Estimator`.
///
/// # Fields
/// - `model_dir`              — checkpoint directory; restored from on startup
/// - `seed`                   — seeds weight init and input shuffling; `None`
///                              draws a fresh seed per run
/// - `log_step_count_steps`   — log loss and throughput every this many steps
/// - `save_checkpoints_steps` — also checkpoint every this many steps; a
///                              checkpoint is always written when training ends
/// - `keep_checkpoint_max`    — newest checkpoints retained on disk
/// - `eval_batch_size`        — batch size of the evaluation input
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub model_dir: PathBuf,
    pub seed: Option<u64>,
    pub log_step_count_steps: usize,
    pub save_checkpoints_steps: Option<usize>,
    pub keep_checkpoint_max: usize,
    pub eval_batch_size: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            seed: None,
            log_step_count_steps: 100,
            save_checkpoints_steps: None,
            keep_checkpoint_max: 5,
            eval_batch_size: 128,
        }
    }
}

impl RunConfig {
    pub fn with_model_dir(mut self, model_dir: impl Into<PathBuf>) -> Self {
        self.model_dir = model_dir.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_log_step_count_steps(mut self, steps: usize) -> Self {
        self.log_step_count_steps = steps.max(1);
        self
    }

    pub fn with_save_checkpoints_steps(mut self, steps: usize) -> Self {
        self.save_checkpoints_steps = Some(steps.max(1));
        self
    }

    pub fn with_keep_checkpoint_max(mut self, keep: usize) -> Self {
        self.keep_checkpoint_max = keep.max(1);
        self
    }

    pub fn with_eval_batch_size(mut self, batch_size: usize) -> Self {
        self.eval_batch_size = batch_size.max(1);
        self
    }
}
