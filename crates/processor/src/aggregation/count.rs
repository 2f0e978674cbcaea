use super::trait_::Aggregator;

/// Count aggregator - counts the number of values
///
/// # Examples
///
/// ```
/// use processor::aggregation::{Aggregator, CountAggregator};
///
/// let mut agg = CountAggregator::new();
/// agg.update(1.0);
/// agg.update(2.0);
/// agg.update(3.0);
///
/// assert_eq!(agg.finalize(), Some(3.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CountAggregator {
    count: u64,
}

impl CountAggregator {
    /// Create a new count aggregator
    pub fn new() -> Self {
        Self::default()
    }
}

impl Aggregator for CountAggregator {
    fn update(&mut self, _value: f64) {
        self.count += 1;
    }

    fn finalize(&self) -> Option<f64> {
        Some(self.count as f64)
    }

    fn reset(&mut self) {
        self.count = 0;
    }

    fn count(&self) -> u64 {
        self.count
    }
}
