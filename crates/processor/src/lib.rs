//! Stream processor for dataflow jobs
//!
//! This crate turns a declarative [`PipelineSpec`](dataflow_types::PipelineSpec)
//! into a running job: a source feeding an ordered chain of operators
//! (stateless transforms, count and event-time windows, batch aggregation)
//! feeding a sink, each on its own task and joined by bounded channels.
//!
//! # Example
//!
//! ```rust,no_run
//! use processor::JobEngine;
//!
//! # async fn example() -> processor::ProcessorResult<()> {
//! let report = JobEngine::default()
//!     .run_json(r#"{
//!         "source": {"type": "file", "path": "input.csv"},
//!         "operators": [{"type": "tumbling_window", "params": {
//!             "size": 2,
//!             "inner": {"type": "reduce", "params": {"key": "value", "agg": "count"}}
//!         }}],
//!         "sink": {"type": "file", "path": "output.csv"}
//!     }"#)
//!     .await?;
//! println!("wrote {} rows", report.events_written);
//! # Ok(())
//! # }
//! ```

pub mod aggregation;
pub mod clock;
pub mod config;
pub mod duration;
pub mod engine;
pub mod error;
pub mod params;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod watermark;
pub mod window;

// Re-export commonly used types
pub use aggregation::{AggregateKind, Aggregator, ReduceOperator};

pub use clock::{Clock, FixedClock, SystemClock};

pub use config::JobConfig;

pub use engine::{Job, JobEngine, JobReport};

pub use error::{
    AggregationError, BuildError, DurationParseError, ProcessorError, WindowError,
    Result as ProcessorResult,
};

pub use pipeline::{
    BatchOperator, ExecutorStats, FilterOperator, Flushable, MapOperator, OperatorRegistry,
    Pipeline, PipelineBuilder, StreamExecutor, StreamOperator, MAX_NESTING_DEPTH,
};

pub use sink::{CollectSink, CsvFileSink, EventSink, SinkRegistry, SinkReport, StdoutSink};

pub use source::{CsvFileSource, EventSource, MemorySource, SourceContext, SourceRegistry};

pub use watermark::{BoundedLatenessWatermark, Watermark, WatermarkGenerator};

pub use window::{
    CountSlidingWindow, CountTumblingWindow, TimeSlidingWindow, TimeTumblingWindow,
    WatermarkWindow, WindowBounds,
};
