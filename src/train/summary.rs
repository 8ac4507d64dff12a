use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One logged training step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepStats {
    pub global_step: u64,
    pub loss: f64,
    /// Throughput since the previous log line; `None` on the first one.
    pub steps_per_sec: Option<f64>,
}

/// Outcome of one `Estimator::train` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainSummary {
    /// Global step after the last update.
    pub global_step: u64,
    /// Loss of every step run by this call, in order.
    pub losses: Vec<f64>,
    /// Entries emitted to the log.
    pub logged: Vec<StepStats>,
    /// Checkpoint written at the end, if any step ran.
    pub checkpoint: Option<PathBuf>,
}

impl TrainSummary {
    pub fn steps(&self) -> usize {
        self.losses.len()
    }
}

/// Metrics from one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalResults {
    /// Fraction of examples classified correctly, in `[0, 1]`.
    pub accuracy: f64,
    /// Mean of the per-batch losses.
    pub loss: f64,
    pub global_step: u64,
}

impl EvalResults {
    /// Metric name → value, sorted by name.
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("accuracy", self.accuracy),
            ("global_step", self.global_step as f64),
            ("loss", self.loss),
        ])
    }
}

impl fmt::Display for EvalResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{accuracy: {:.6}, global_step: {}, loss: {:.6}}}",
            self.accuracy, self.global_step, self.loss
        )
    }
}

/// Predict-mode output for a single example.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub class: usize,
    pub probabilities: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_results_print_as_mapping() {
        let r = EvalResults {
            accuracy: 0.5,
            loss: 1.25,
            global_step: 42,
        };
        assert_eq!(r.to_string(), "{accuracy: 0.500000, global_step: 42, loss: 1.250000}");
        let keys: Vec<_> = r.to_map().into_keys().collect();
        assert_eq!(keys, vec!["accuracy", "global_step", "loss"]);
    }
}
