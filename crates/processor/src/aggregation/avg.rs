use super::trait_::Aggregator;

/// Average aggregator
///
/// Keeps a running sum and count; the mean is computed on finalize.
#[derive(Debug, Clone, Default)]
pub struct AverageAggregator {
    sum: f64,
    count: u64,
}

impl AverageAggregator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Aggregator for AverageAggregator {
    fn update(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn finalize(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum / self.count as f64)
    }

    fn reset(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }

    fn count(&self) -> u64 {
        self.count
    }
}
