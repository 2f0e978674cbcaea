use serde_json::Value;
use std::fmt::Debug;

/// Core trait for the per-group accumulators used by the reduce operator
///
/// An aggregator is fed the numeric values of one group, one at a time, and
/// produces a single result once the window closes.
pub trait Aggregator: Send + Sync + Debug {
    /// Update the aggregator with a new value
    fn update(&mut self, value: f64);

    /// Update with multiple values at once
    fn update_batch(&mut self, values: &[f64]) {
        for value in values {
            self.update(*value);
        }
    }

    /// Compute the final aggregation result, `None` when no value was seen
    fn finalize(&self) -> Option<f64>;

    /// Reset the aggregator to initial state
    fn reset(&mut self);

    /// Get the number of values processed so far
    fn count(&self) -> u64;

    /// Check if the aggregator has processed any values
    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Helper trait for reading event fields as numbers
///
/// CSV sources deliver every field as a string, so numeric strings are accepted.
pub trait ToF64 {
    fn to_f64(&self) -> Option<f64>;
}

impl ToF64 for Value {
    fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_f64_conversions() {
        assert_eq!(json!(42).to_f64(), Some(42.0));
        assert_eq!(json!(1.5).to_f64(), Some(1.5));
        assert_eq!(json!(" 7.25 ").to_f64(), Some(7.25));
        assert_eq!(json!(true).to_f64(), Some(1.0));
        assert_eq!(json!("abc").to_f64(), None);
        assert_eq!(json!("NaN").to_f64(), None);
        assert_eq!(json!(null).to_f64(), None);
        assert_eq!(json!([1]).to_f64(), None);
    }
}
