use super::trait_::Aggregator;

/// Sum aggregator
#[derive(Debug, Clone, Default)]
pub struct SumAggregator {
    sum: f64,
    count: u64,
}

impl SumAggregator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Aggregator for SumAggregator {
    fn update(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn finalize(&self) -> Option<f64> {
        (self.count > 0).then_some(self.sum)
    }

    fn reset(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }

    fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum() {
        let mut agg = SumAggregator::new();
        assert_eq!(agg.finalize(), None);

        agg.update_batch(&[1.5, 2.5, -1.0]);
        assert_eq!(agg.finalize(), Some(3.0));
        assert_eq!(agg.count(), 3);
    }
}
