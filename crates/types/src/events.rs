//! Event type flowing through dataflow pipelines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A single timestamped record
///
/// The payload is a mapping from field name to a dynamically typed value.
/// Events are cheap to clone relative to the work done on them and are passed
/// by value between operators: an operator owns the event it is handed and may
/// either mutate it in place or derive a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event payload
    #[serde(default)]
    pub data: HashMap<String, Value>,
    /// Time the event occurred
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an empty event at the given time
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            data: HashMap::new(),
            timestamp,
        }
    }

    /// Create an event from an existing payload
    pub fn from_fields(data: HashMap<String, Value>, timestamp: DateTime<Utc>) -> Self {
        Self { data, timestamp }
    }

    /// Builder-style field insertion
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Get a field as a string slice, if it is a JSON string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Insert or overwrite a field, returning the previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(key.into(), value.into())
    }

    /// Remove a field
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Number of fields in the payload
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload has no fields
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_event_fields() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut event = Event::new(ts)
            .with_field("value", "A")
            .with_field("n", 3);

        assert_eq!(event.get_str("value"), Some("A"));
        assert_eq!(event.get("n"), Some(&json!(3)));
        assert_eq!(event.len(), 2);

        let previous = event.set("value", "B");
        assert_eq!(previous, Some(json!("A")));
        assert_eq!(event.get_str("value"), Some("B"));

        event.remove("n");
        assert_eq!(event.len(), 1);
        assert_eq!(event.timestamp, ts);
    }

    #[test]
    fn test_event_deserialize_without_data() {
        let event: Event =
            serde_json::from_str(r#"{"timestamp":"2024-01-01T00:00:00Z"}"#).unwrap();
        assert!(event.is_empty());
    }
}
