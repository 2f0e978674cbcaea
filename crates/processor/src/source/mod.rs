//! Event sources
//!
//! A source produces events onto a channel and closes it (by dropping the
//! sender) when it is exhausted. Sources are resolved from a job
//! specification's `source` section through the [`SourceRegistry`].

mod file;
mod memory;

pub use file::CsvFileSource;
pub use memory::MemorySource;

use crate::clock::{Clock, SystemClock};
use crate::error::{BuildError, BuildResult, Result};
use crate::params::ParamReader;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dataflow_types::{Event, SourceSpec};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Producer side of a job
#[async_trait]
pub trait EventSource: Send + fmt::Debug {
    fn name(&self) -> &str;

    /// Sends every event to `output`, returning how many were sent
    ///
    /// Returning (and thereby dropping `output`) signals end of stream.
    async fn run(self: Box<Self>, output: mpsc::Sender<Event>) -> Result<u64>;
}

/// Collaborators handed to source constructors
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub clock: Arc<dyn Clock>,
}

impl Default for SourceContext {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
        }
    }
}

pub type SourceFactory =
    fn(&ParamReader<'_>, &SourceContext) -> BuildResult<Box<dyn EventSource>>;

/// Source type tag to constructor mapping
#[derive(Clone)]
pub struct SourceRegistry {
    factories: HashMap<String, SourceFactory>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// `file`/`csv` and `memory`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("file", CsvFileSource::from_params);
        registry.register("csv", CsvFileSource::from_params);
        registry.register("memory", MemorySource::from_params);
        registry
    }

    pub fn register(&mut self, kind: impl Into<String>, factory: SourceFactory) {
        self.factories.insert(kind.into(), factory);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn build(&self, spec: &SourceSpec, ctx: &SourceContext) -> BuildResult<Box<dyn EventSource>> {
        let factory = self
            .factories
            .get(&spec.kind)
            .ok_or_else(|| BuildError::UnknownSource(spec.kind.clone()))?;
        factory(&ParamReader::new(&spec.kind, &spec.params), ctx)
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&String> = self.factories.keys().collect();
        kinds.sort();
        f.debug_struct("SourceRegistry").field("types", &kinds).finish()
    }
}

/// Parses an RFC 3339 timestamp field
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Whether a column holds the record timestamp
pub(crate) fn is_timestamp_column(name: &str) -> bool {
    name.eq_ignore_ascii_case("timestamp")
}
