use serde::{Deserialize, Serialize};

/// Streaming unweighted mean of scalar values (e.g. per-batch losses).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Mean {
    total: f64,
    count: usize,
}

impl Mean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, value: f64) {
        self.total += value;
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean so far; 0 before the first update.
    pub fn result(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_updates() {
        let mut m = Mean::new();
        assert_eq!(m.result(), 0.0);
        m.update(1.0);
        m.update(2.0);
        m.update(6.0);
        assert_eq!(m.count(), 3);
        assert_eq!(m.result(), 3.0);
    }
}
