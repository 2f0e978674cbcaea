//! Core types for the dataflow engine
//!
//! This crate provides the data structures shared by every part of the engine:
//! the [`Event`] record that flows through pipelines and the declarative
//! [`PipelineSpec`] a job is built from.

pub mod errors;
pub mod events;
pub mod pipeline;

pub use errors::{Result, SpecError};
pub use events::Event;
pub use pipeline::{OperatorSpec, Params, PipelineSpec, SinkSpec, SourceSpec};
