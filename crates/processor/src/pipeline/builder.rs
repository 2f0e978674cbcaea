//! Pipeline builder and the operator chain it produces
//!
//! This module provides a builder for assembling an ordered chain of operators,
//! either from specifications resolved through an [`OperatorRegistry`] or from
//! operators constructed directly in code.

use crate::error::Result;
use crate::pipeline::operator::StreamOperator;
use crate::pipeline::registry::OperatorRegistry;
use dataflow_types::{Event, OperatorSpec, PipelineSpec};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// An ordered chain of operators
///
/// Each input event enters the first operator; the outputs of every operator
/// are fed, in order, to the next. The pipeline is owned and mutated by a
/// single task.
pub struct Pipeline {
    name: String,
    operators: Vec<Box<dyn StreamOperator>>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, operators: Vec<Box<dyn StreamOperator>>) -> Self {
        Self {
            name: name.into(),
            operators,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Names of the operators, in chain order
    pub fn operator_names(&self) -> Vec<&str> {
        self.operators.iter().map(|op| op.name()).collect()
    }

    /// Runs one event through the whole chain
    ///
    /// With no operators the event passes through unchanged.
    pub fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        self.process_from(0, vec![event])
    }

    /// Runs `events` through the operators starting at index `start`
    fn process_from(&mut self, start: usize, events: Vec<Event>) -> Result<Vec<Event>> {
        let mut working = events;
        for op in self.operators.iter_mut().skip(start) {
            if working.is_empty() {
                break;
            }
            let mut next = Vec::with_capacity(working.len());
            for event in working {
                next.extend(op.process(event)?);
            }
            working = next;
        }
        Ok(working)
    }

    /// Flushes every flushable operator at end of input
    ///
    /// Operators are flushed in chain order and what each one releases is run
    /// through the rest of the chain, so a downstream window sees upstream
    /// flush output before it is flushed itself.
    pub fn flush(&mut self) -> Result<Vec<Event>> {
        let mut out = Vec::new();
        for index in 0..self.operators.len() {
            let released = match self.operators[index].as_flushable() {
                Some(flushable) => flushable.flush()?,
                None => continue,
            };
            debug!(
                pipeline = %self.name,
                operator = %self.operators[index].name(),
                released = released.len(),
                "flushed operator"
            );
            if !released.is_empty() {
                out.extend(self.process_from(index + 1, released)?);
            }
        }
        Ok(out)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("operators", &self.operator_names())
            .finish()
    }
}

enum Stage {
    Spec(OperatorSpec),
    Built(Box<dyn StreamOperator>),
}

/// Builder for constructing pipelines
///
/// # Example
///
/// ```rust
/// use processor::pipeline::{MapOperator, PipelineBuilder};
/// use dataflow_types::OperatorSpec;
/// use serde_json::json;
///
/// let pipeline = PipelineBuilder::new()
///     .with_name("tagging")
///     .with_operator(MapOperator::set_field("source", json!("sensor")))
///     .with_operator_spec(OperatorSpec::from_json(
///         "filter",
///         json!({"field": "source", "eq": "sensor"}),
///     ))
///     .build()
///     .unwrap();
///
/// assert_eq!(pipeline.operator_names(), vec!["map", "filter"]);
/// ```
pub struct PipelineBuilder {
    name: String,
    stages: Vec<Stage>,
    registry: Option<Arc<OperatorRegistry>>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            name: "unnamed-pipeline".to_string(),
            stages: Vec::new(),
            registry: None,
        }
    }

    /// Starts a builder from a job specification's name and operator list
    pub fn from_spec(spec: &PipelineSpec) -> Self {
        let mut builder = Self::new().with_operator_specs(spec.operators.iter().cloned());
        if let Some(name) = &spec.name {
            builder = builder.with_name(name.clone());
        }
        builder
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Resolve specifications through `registry` instead of the global one
    pub fn with_registry(mut self, registry: Arc<OperatorRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Appends an operator described by a specification
    pub fn with_operator_spec(mut self, spec: OperatorSpec) -> Self {
        self.stages.push(Stage::Spec(spec));
        self
    }

    pub fn with_operator_specs<I>(mut self, specs: I) -> Self
    where
        I: IntoIterator<Item = OperatorSpec>,
    {
        self.stages.extend(specs.into_iter().map(Stage::Spec));
        self
    }

    /// Appends an already constructed operator
    pub fn with_operator<O: StreamOperator + 'static>(mut self, operator: O) -> Self {
        self.stages.push(Stage::Built(Box::new(operator)));
        self
    }

    pub fn with_boxed_operator(mut self, operator: Box<dyn StreamOperator>) -> Self {
        self.stages.push(Stage::Built(operator));
        self
    }

    /// Builds the pipeline, failing on the first specification that does not build
    pub fn build(self) -> Result<Pipeline> {
        let registry = self.registry.unwrap_or_else(OperatorRegistry::global);
        let mut operators = Vec::with_capacity(self.stages.len());
        for stage in self.stages {
            let operator = match stage {
                Stage::Spec(spec) => registry.build(&spec)?,
                Stage::Built(operator) => operator,
            };
            operators.push(operator);
        }

        debug!(pipeline = %self.name, operators = operators.len(), "pipeline built");
        Ok(Pipeline::new(self.name, operators))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BuildError, ProcessorError};
    use crate::pipeline::operator::{FilterOperator, MapOperator};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn at(secs: i64, key: &str) -> Event {
        Event::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs))
            .with_field("k", key)
    }

    fn op(kind: &str, params: serde_json::Value) -> OperatorSpec {
        OperatorSpec::from_json(kind, params)
    }

    fn reduce_inner() -> serde_json::Value {
        json!({"type": "reduce", "params": {"key": "k", "agg": "count"}})
    }

    #[test]
    fn test_empty_pipeline_passes_through() {
        let mut pipeline = PipelineBuilder::new().build().unwrap();
        assert!(pipeline.is_empty());
        let out = pipeline.process(at(0, "A")).unwrap();
        assert_eq!(out, vec![at(0, "A")]);
        assert!(pipeline.flush().unwrap().is_empty());
    }

    #[test]
    fn test_chain_order() {
        let mut pipeline = PipelineBuilder::new()
            .with_operator(FilterOperator::field_equals("k", json!("A")))
            .with_operator(MapOperator::set_field("seen", json!(true)))
            .build()
            .unwrap();

        assert!(pipeline.process(at(0, "B")).unwrap().is_empty());
        let out = pipeline.process(at(1, "A")).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("seen"), Some(&json!(true)));
    }

    #[test]
    fn test_build_fails_on_first_bad_spec() {
        let err = PipelineBuilder::new()
            .with_operator_spec(op("map", json!({"col": "a", "val": 1})))
            .with_operator_spec(op("bogus", json!({})))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessorError::Build(BuildError::UnknownOperator(_))
        ));
    }

    #[test]
    fn test_flush_feeds_downstream_operators() {
        let mut pipeline = PipelineBuilder::new()
            .with_operator_spec(op("time_window", json!({"duration": "10s", "inner": reduce_inner()})))
            .with_operator(MapOperator::set_field("stage", json!("post")))
            .build()
            .unwrap();

        pipeline.process(at(1, "A")).unwrap();
        let flushed = pipeline.flush().unwrap();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].get("stage"), Some(&json!("post")));
        assert_eq!(flushed[0].get("count"), Some(&json!(1)));
    }

    #[test]
    fn test_flush_reaches_every_flushable_operator() {
        // the first window's flush output lands in the second window, which
        // then releases it on its own flush
        let mut pipeline = PipelineBuilder::new()
            .with_operator_spec(op("time_window", json!({"duration": "10s", "inner": reduce_inner()})))
            .with_operator_spec(op(
                "time_window_watermark",
                json!({
                    "duration": "1m",
                    "allowed_lateness": "1h",
                    "inner": {"type": "reduce", "params": {"key": "k", "agg": "count"}}
                }),
            ))
            .build()
            .unwrap();

        pipeline.process(at(1, "A")).unwrap();
        let flushed = pipeline.flush().unwrap();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].get("emitted_via_flush"), Some(&json!(true)));
    }

    #[test]
    fn test_from_spec_uses_name() {
        let spec = PipelineSpec::from_value(json!({
            "name": "demo",
            "source": {"type": "memory", "records": []},
            "operators": [{"type": "filter", "params": {"field": "k", "eq": "A"}}],
            "sink": {"type": "collect"}
        }))
        .unwrap();
        let pipeline = PipelineBuilder::from_spec(&spec).build().unwrap();
        assert_eq!(pipeline.name(), "demo");
        assert_eq!(pipeline.len(), 1);
    }
}
