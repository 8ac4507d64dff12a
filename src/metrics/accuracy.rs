use serde::{Deserialize, Serialize};

/// Streaming classification accuracy: `correct / total` over every example
/// seen since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accuracy {
    correct: usize,
    total: usize,
}

impl Accuracy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts matches between predicted and true class indices.
    pub fn update(&mut self, predicted: &[usize], labels: &[usize]) {
        assert_eq!(predicted.len(), labels.len(), "predictions and labels differ in length");
        self.correct += predicted.iter().zip(labels).filter(|(p, l)| p == l).count();
        self.total += labels.len();
    }

    /// Folds another batch's counts into this one.
    pub fn merge(&mut self, other: &Accuracy) {
        self.correct += other.correct;
        self.total += other.total;
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Fraction in `[0, 1]`; 0 before any example has been seen.
    pub fn result(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}
