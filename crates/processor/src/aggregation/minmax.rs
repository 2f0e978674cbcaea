use super::trait_::Aggregator;

/// Minimum aggregator
#[derive(Debug, Clone, Default)]
pub struct MinAggregator {
    min: Option<f64>,
    count: u64,
}

impl MinAggregator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Aggregator for MinAggregator {
    fn update(&mut self, value: f64) {
        self.min = Some(match self.min {
            Some(current) => current.min(value),
            None => value,
        });
        self.count += 1;
    }

    fn finalize(&self) -> Option<f64> {
        self.min
    }

    fn reset(&mut self) {
        self.min = None;
        self.count = 0;
    }

    fn count(&self) -> u64 {
        self.count
    }
}

/// Maximum aggregator
#[derive(Debug, Clone, Default)]
pub struct MaxAggregator {
    max: Option<f64>,
    count: u64,
}

impl MaxAggregator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Aggregator for MaxAggregator {
    fn update(&mut self, value: f64) {
        self.max = Some(match self.max {
            Some(current) => current.max(value),
            None => value,
        });
        self.count += 1;
    }

    fn finalize(&self) -> Option<f64> {
        self.max
    }

    fn reset(&mut self) {
        self.max = None;
        self.count = 0;
    }

    fn count(&self) -> u64 {
        self.count
    }
}
