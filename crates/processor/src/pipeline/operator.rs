//! Stream operators for transforming and processing events
//!
//! Every pipeline stage implements [`StreamOperator`], a one-to-many transform
//! from a single event to zero or more events. Two optional capabilities sit on
//! top of that contract:
//!
//! - [`BatchOperator`]: summarizes a finite collection of events at once.
//!   Implemented by aggregators and invoked by window operators when a window
//!   closes; never reachable through the per-event path.
//! - [`Flushable`]: emits pending state at end of stream. Implemented by window
//!   operators that can hold a partially filled window.
//!
//! This module also provides the stateless operators:
//! - Map: overwrite a field, one output per input
//! - Filter: pass events matching a predicate

use crate::error::Result;
use dataflow_types::Event;
use serde_json::Value;
use std::fmt::Debug;

/// Trait for stream operators
///
/// Operators are owned by exactly one pipeline and mutated only by the task
/// that drives it, so `process` takes `&mut self` and needs no internal locking.
pub trait StreamOperator: Send + Debug {
    /// Get the operator name
    fn name(&self) -> &str;

    /// Process an event and return transformed events
    ///
    /// # Returns
    /// A vector of output events (may be empty, one, or many)
    fn process(&mut self, event: Event) -> Result<Vec<Event>>;

    /// Batch aggregation capability, if this operator has one
    fn as_batch(&self) -> Option<&dyn BatchOperator> {
        None
    }

    /// End-of-stream flush capability, if this operator has one
    fn as_flushable(&mut self) -> Option<&mut dyn Flushable> {
        None
    }
}

/// Operators that can summarize a closed window
pub trait BatchOperator: Send + Debug {
    /// Aggregate a finite collection of events into summary events
    fn process_batch(&self, events: &[Event]) -> Result<Vec<Event>>;
}

/// Operators holding state that must be drained at end of stream
pub trait Flushable: Send {
    /// Emit every window whose trigger never fired
    fn flush(&mut self) -> Result<Vec<Event>>;
}

type MapFn = Box<dyn Fn(Event) -> Event + Send + Sync>;
type PredicateFn = Box<dyn Fn(&Event) -> bool + Send + Sync>;

/// Map operator - transforms events one-to-one
///
/// # Example
///
/// ```rust
/// use processor::pipeline::operator::MapOperator;
///
/// // Tag every event with its origin
/// let operator = MapOperator::set_field("origin", "sensor-a".into());
/// ```
pub struct MapOperator {
    name: String,
    func: MapFn,
}

impl MapOperator {
    /// Create a map operator from an arbitrary function
    pub fn new<S, F>(name: S, func: F) -> Self
    where
        S: Into<String>,
        F: Fn(Event) -> Event + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }

    /// Create a map operator that writes `value` into field `column`
    pub fn set_field(column: impl Into<String>, value: Value) -> Self {
        let column = column.into();
        Self::new("map", move |mut event: Event| {
            event.data.insert(column.clone(), value.clone());
            event
        })
    }

    /// Rename the operator
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Debug for MapOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapOperator")
            .field("name", &self.name)
            .finish()
    }
}

impl StreamOperator for MapOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        Ok(vec![(self.func)(event)])
    }
}

/// Filter operator - selects events based on a predicate
///
/// # Example
///
/// ```rust
/// use processor::pipeline::operator::FilterOperator;
///
/// // Keep only events whose status is "ok"
/// let operator = FilterOperator::field_equals("status", "ok".into());
/// ```
pub struct FilterOperator {
    name: String,
    predicate: PredicateFn,
}

impl FilterOperator {
    /// Create a filter from an arbitrary predicate
    pub fn new<S, F>(name: S, predicate: F) -> Self
    where
        S: Into<String>,
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
        }
    }

    /// Create a filter passing events whose `field` equals `expected`
    ///
    /// Comparison is by value: numbers compare numerically, so `1` equals `1.0`.
    /// A missing field compares as `null`.
    pub fn field_equals(field: impl Into<String>, expected: Value) -> Self {
        let field = field.into();
        Self::new("filter", move |event: &Event| {
            values_equal(event.get(&field).unwrap_or(&Value::Null), &expected)
        })
    }

    /// Rename the operator
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => actual == expected,
    }
}

impl Debug for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterOperator")
            .field("name", &self.name)
            .finish()
    }
}

impl StreamOperator for FilterOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        if (self.predicate)(&event) {
            Ok(vec![event])
        } else {
            Ok(vec![])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn event() -> Event {
        Event::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_map_operator_sets_field() {
        let mut operator = MapOperator::set_field("region", json!("eu"));
        let output = operator.process(event().with_field("id", 1)).unwrap();

        assert_eq!(output.len(), 1);
        assert_eq!(output[0].get("region"), Some(&json!("eu")));
        assert_eq!(output[0].get("id"), Some(&json!(1)));
    }

    #[test]
    fn test_map_operator_overwrites_field() {
        let mut operator = MapOperator::set_field("region", json!("eu"));
        let output = operator.process(event().with_field("region", "us")).unwrap();
        assert_eq!(output[0].get_str("region"), Some("eu"));
    }

    #[test]
    fn test_map_operator_custom_fn() {
        let mut operator = MapOperator::new("double", |mut e: Event| {
            let n = e.get("n").and_then(|v| v.as_i64()).unwrap_or(0);
            e.set("n", n * 2);
            e
        });
        let output = operator.process(event().with_field("n", 21)).unwrap();
        assert_eq!(output[0].get("n"), Some(&json!(42)));
    }

    #[test]
    fn test_filter_operator() {
        let mut operator = FilterOperator::field_equals("status", json!("ok"));

        let output = operator.process(event().with_field("status", "ok")).unwrap();
        assert_eq!(output.len(), 1);

        let output = operator.process(event().with_field("status", "error")).unwrap();
        assert_eq!(output.len(), 0);
    }

    #[test]
    fn test_filter_uses_value_equality() {
        let mut operator = FilterOperator::field_equals("tags", json!(["a", "b"]));
        let output = operator
            .process(event().with_field("tags", json!(["a", "b"])))
            .unwrap();
        assert_eq!(output.len(), 1);

        let mut operator = FilterOperator::field_equals("n", json!(1));
        assert_eq!(operator.process(event().with_field("n", "1")).unwrap().len(), 0);
    }

    #[test]
    fn test_filter_compares_numbers_numerically() {
        let mut operator = FilterOperator::field_equals("n", json!(1.0));
        assert_eq!(operator.process(event().with_field("n", json!(1))).unwrap().len(), 1);
        assert_eq!(operator.process(event().with_field("n", json!(1.5))).unwrap().len(), 0);

        let mut operator = FilterOperator::field_equals("n", json!(2));
        assert_eq!(operator.process(event().with_field("n", json!(2.0))).unwrap().len(), 1);
        assert_eq!(operator.process(event().with_field("n", json!(-2))).unwrap().len(), 0);
    }

    #[test]
    fn test_filter_missing_field_is_null() {
        let mut operator = FilterOperator::field_equals("absent", Value::Null);
        assert_eq!(operator.process(event()).unwrap().len(), 1);

        let mut operator = FilterOperator::field_equals("absent", json!("x"));
        assert_eq!(operator.process(event()).unwrap().len(), 0);
    }

    #[test]
    fn test_stateless_operators_have_no_capabilities() {
        let mut map = MapOperator::set_field("a", json!(1));
        assert!(map.as_batch().is_none());
        assert!(map.as_flushable().is_none());

        let mut filter = FilterOperator::field_equals("a", json!(1)).with_name("only-a");
        assert_eq!(filter.name(), "only-a");
        assert!(filter.as_batch().is_none());
        assert!(filter.as_flushable().is_none());
    }
}
