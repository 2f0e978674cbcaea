//! Event sinks
//!
//! A sink consumes the pipeline's output until the channel closes, then
//! releases its own resources. Sinks are resolved from a job specification's
//! `sink` section through the [`SinkRegistry`].

mod collect;
mod file;
mod stdout;

pub use collect::CollectSink;
pub use file::CsvFileSink;
pub use stdout::StdoutSink;

use crate::error::{BuildError, BuildResult, Result};
use crate::params::ParamReader;
use async_trait::async_trait;
use dataflow_types::{Event, SinkSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc;

/// Consumer side of a job
#[async_trait]
pub trait EventSink: Send + fmt::Debug {
    fn name(&self) -> &str;

    /// Consumes `input` until it closes
    async fn run(self: Box<Self>, input: mpsc::Receiver<Event>) -> Result<SinkReport>;
}

/// What a sink did with the stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SinkReport {
    /// Events written
    pub written: u64,

    /// Events retained in memory, for sinks that keep them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected: Option<Vec<Event>>,
}

pub type SinkFactory = fn(&ParamReader<'_>) -> BuildResult<Box<dyn EventSink>>;

/// Sink type tag to constructor mapping
#[derive(Clone)]
pub struct SinkRegistry {
    factories: HashMap<String, SinkFactory>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// `file`/`csv`, `stdout` and `collect`/`memory`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("file", CsvFileSink::from_params);
        registry.register("csv", CsvFileSink::from_params);
        registry.register("stdout", StdoutSink::from_params);
        registry.register("collect", CollectSink::from_params);
        registry.register("memory", CollectSink::from_params);
        registry
    }

    pub fn register(&mut self, kind: impl Into<String>, factory: SinkFactory) {
        self.factories.insert(kind.into(), factory);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn build(&self, spec: &SinkSpec) -> BuildResult<Box<dyn EventSink>> {
        let factory = self
            .factories
            .get(&spec.kind)
            .ok_or_else(|| BuildError::UnknownSink(spec.kind.clone()))?;
        factory(&ParamReader::new(&spec.kind, &spec.params))
    }
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for SinkRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&String> = self.factories.keys().collect();
        kinds.sort();
        f.debug_struct("SinkRegistry").field("types", &kinds).finish()
    }
}

/// Text form of a field value in tabular output
///
/// Strings are written raw, `null` as an empty cell, everything else as JSON.
pub(crate) fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&json!("A")), "A");
        assert_eq!(cell_text(&json!(2)), "2");
        assert_eq!(cell_text(&json!(2.5)), "2.5");
        assert_eq!(cell_text(&json!(true)), "true");
        assert_eq!(cell_text(&Value::Null), "");
    }

    #[test]
    fn test_unknown_sink() {
        let spec: SinkSpec = serde_json::from_value(json!({"type": "db", "table": "t"})).unwrap();
        let err = SinkRegistry::with_builtins().build(&spec).unwrap_err();
        assert!(matches!(err, BuildError::UnknownSink(ref t) if t == "db"));
    }

    #[test]
    fn test_builtin_sinks() {
        let registry = SinkRegistry::with_builtins();
        for kind in ["file", "csv", "stdout", "collect", "memory"] {
            assert!(registry.contains(kind));
        }
    }
}
