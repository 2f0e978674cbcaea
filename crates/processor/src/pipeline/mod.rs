//! Stream processing pipeline module
//!
//! This module provides the pieces that turn a list of operator
//! specifications into a running chain:
//! - The operator contract and the stateless operators (map, filter)
//! - The operator registry that resolves type tags, recursively for windows
//! - A fluent builder for assembling pipelines
//! - The executor that drives a pipeline between channels and flushes it at
//!   end of input
//!
//! # Example
//!
//! ```rust
//! use processor::pipeline::PipelineBuilder;
//! use dataflow_types::{Event, OperatorSpec};
//! use chrono::Utc;
//! use serde_json::json;
//!
//! let mut pipeline = PipelineBuilder::new()
//!     .with_name("only-errors")
//!     .with_operator_spec(OperatorSpec::from_json("filter", json!({"field": "level", "eq": "error"})))
//!     .build()
//!     .unwrap();
//!
//! let event = Event::new(Utc::now()).with_field("level", "error");
//! assert_eq!(pipeline.process(event).unwrap().len(), 1);
//! ```

pub mod builder;
pub mod executor;
pub mod operator;
pub mod registry;

pub use builder::{Pipeline, PipelineBuilder};
pub use executor::{ExecutorStats, StreamExecutor};
pub use operator::{BatchOperator, FilterOperator, Flushable, MapOperator, StreamOperator};
pub use registry::{BuildContext, OperatorFactory, OperatorRegistry, MAX_NESTING_DEPTH};
