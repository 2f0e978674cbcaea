//! Error types for the stream processor
//!
//! Errors fall into two classes. Construction errors ([`BuildError`]) are raised
//! while turning a pipeline specification into operators, sources and sinks, and
//! abort the job before any task starts. Run-time errors are raised while events
//! flow; [`ProcessorError::is_fatal`] separates faults that must stop the job
//! from per-event data errors that the executor skips.

use dataflow_types::SpecError;
use thiserror::Error;

/// Main processor error type
#[derive(Error, Debug)]
pub enum ProcessorError {
    /// Pipeline specification errors
    #[error("specification error: {0}")]
    Spec(#[from] SpecError),

    /// Invalid engine configuration
    #[error("configuration error: {source}")]
    Configuration {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Construction errors
    #[error("build error: {0}")]
    Build(#[from] BuildError),

    /// Window-related errors
    #[error("window error: {0}")]
    Window(#[from] WindowError),

    /// Aggregation-related errors
    #[error("aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    /// Source collaborator failed
    #[error("source '{name}' failed: {source}")]
    Source {
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Sink collaborator failed
    #[error("sink '{name}' failed: {source}")]
    Sink {
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The peer task on the other end of a channel stopped
    #[error("channel closed: {0}")]
    ChannelClosed(String),

    /// Execution errors
    #[error("execution error: {source}")]
    Execution {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding/decoding errors
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Generic error for unexpected conditions
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ProcessorError {
    /// Whether this error must stop the job
    ///
    /// Per-event data errors (an event that cannot be placed in a window) are
    /// not fatal: the executor logs them and drops the event.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ProcessorError::Window(WindowError::InvalidTimestamp { .. }))
    }

    /// Whether this error only reports that a peer task went away
    pub fn is_channel_closed(&self) -> bool {
        matches!(self, ProcessorError::ChannelClosed(_))
    }
}

/// Construction-time errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// No constructor registered for the operator type
    #[error("unknown operator type: {0}")]
    UnknownOperator(String),

    /// No adapter registered for the source type
    #[error("unknown source type: {0}")]
    UnknownSource(String),

    /// No adapter registered for the sink type
    #[error("unknown sink type: {0}")]
    UnknownSink(String),

    /// A required parameter is absent
    #[error("{component} expects parameter '{param}'")]
    MissingParam { component: String, param: String },

    /// A parameter is present but has the wrong type or value
    #[error("{component} parameter '{param}' is invalid: {reason}")]
    InvalidParam {
        component: String,
        param: String,
        reason: String,
    },

    /// A duration parameter could not be parsed
    #[error("{component} parameter '{param}': {source}")]
    InvalidDuration {
        component: String,
        param: String,
        #[source]
        source: DurationParseError,
    },

    /// A window's inner operator cannot aggregate a batch
    #[error("{window} inner operator '{inner}' does not support batch aggregation")]
    NotBatchCapable { window: String, inner: String },

    /// A window's inner operator failed to build
    #[error("{window} inner op error: {source}")]
    Inner {
        window: String,
        #[source]
        source: Box<BuildError>,
    },

    /// Operator specifications nest deeper than allowed
    #[error("operator nesting exceeds maximum depth of {max}")]
    NestingTooDeep { max: usize },
}

impl BuildError {
    /// Unwrap nested inner-operator errors down to the root cause
    pub fn root_cause(&self) -> &BuildError {
        match self {
            BuildError::Inner { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Duration string parsing error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid duration \"{input}\": {reason}")]
pub struct DurationParseError {
    pub input: String,
    pub reason: String,
}

/// Window assignment and management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// Event timestamp cannot be placed on the window grid
    #[error("invalid event timestamp: {timestamp}, reason: {reason}")]
    InvalidTimestamp { timestamp: String, reason: String },
}

/// Aggregation computation errors
#[derive(Error, Debug)]
pub enum AggregationError {
    /// A batch aggregator was handed a single event outside of any window
    #[error("{operator} cannot process single events; it must run inside a window")]
    OutsideWindow { operator: String },
}

/// Result type alias for processor operations
pub type Result<T> = std::result::Result<T, ProcessorError>;

/// Result type alias for construction
pub type BuildResult<T> = std::result::Result<T, BuildError>;

/// Result type alias for window operations
pub type WindowResult<T> = std::result::Result<T, WindowError>;

impl From<serde_json::Error> for ProcessorError {
    fn from(err: serde_json::Error) -> Self {
        ProcessorError::Serialization(err.to_string())
    }
}
