//! Job orchestration
//!
//! A job is one run of a [`PipelineSpec`]: a source task, a pipeline task and a
//! sink task joined by two bounded channels. Everything that can be checked
//! before events flow (operators, source, sink) is built up front by
//! [`JobEngine::prepare`], so a bad specification is rejected before any task
//! starts.

use crate::clock::{Clock, SystemClock};
use crate::config::JobConfig;
use crate::error::{ProcessorError, Result};
use crate::pipeline::{Pipeline, PipelineBuilder, StreamExecutor};
use crate::pipeline::{OperatorRegistry, MAX_NESTING_DEPTH};
use crate::sink::{EventSink, SinkRegistry};
use crate::source::{EventSource, SourceContext, SourceRegistry};
use dataflow_types::{Event, PipelineSpec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{error, info};
use uuid::Uuid;

/// Summary of a finished job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub name: String,
    /// Events produced by the source
    pub events_read: u64,
    /// Events produced by the pipeline, flush output included
    pub events_emitted: u64,
    /// Events produced by the end-of-stream flush
    pub events_flushed: u64,
    /// Events dropped because of a per-event error
    pub events_skipped: u64,
    /// Events accepted by the sink
    pub events_written: u64,
    /// Output kept by in-memory sinks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected: Option<Vec<Event>>,
}

/// Builds and runs jobs
///
/// The engine is cheap to clone and holds only immutable registries, so it
/// can be shared between concurrent submissions.
#[derive(Debug, Clone)]
pub struct JobEngine {
    operators: Arc<OperatorRegistry>,
    sources: Arc<SourceRegistry>,
    sinks: Arc<SinkRegistry>,
    config: JobConfig,
    clock: Arc<dyn Clock>,
}

impl Default for JobEngine {
    fn default() -> Self {
        Self::new(JobConfig::default())
    }
}

impl JobEngine {
    pub fn new(config: JobConfig) -> Self {
        let operators = if config.max_nesting_depth == MAX_NESTING_DEPTH {
            OperatorRegistry::global()
        } else {
            Arc::new(OperatorRegistry::with_builtins().with_max_depth(config.max_nesting_depth))
        };
        Self {
            operators,
            sources: Arc::new(SourceRegistry::with_builtins()),
            sinks: Arc::new(SinkRegistry::with_builtins()),
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Clock used by sources to stamp records without a timestamp
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_operator_registry(mut self, registry: Arc<OperatorRegistry>) -> Self {
        self.operators = registry;
        self
    }

    pub fn with_source_registry(mut self, registry: SourceRegistry) -> Self {
        self.sources = Arc::new(registry);
        self
    }

    pub fn with_sink_registry(mut self, registry: SinkRegistry) -> Self {
        self.sinks = Arc::new(registry);
        self
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn operator_registry(&self) -> &Arc<OperatorRegistry> {
        &self.operators
    }

    /// Builds every component of a job without starting it
    ///
    /// Operators are built first, then the source, then the sink; the first
    /// failure is returned.
    pub fn prepare(&self, spec: &PipelineSpec) -> Result<Job> {
        spec.validate()?;
        self.config.validate()?;

        let pipeline = PipelineBuilder::from_spec(spec)
            .with_registry(self.operators.clone())
            .build()?;

        let ctx = SourceContext {
            clock: self.clock.clone(),
        };
        let source = self.sources.build(&spec.source, &ctx)?;
        let sink = self.sinks.build(&spec.sink)?;

        let id = Uuid::new_v4();
        let name = spec.name.clone().unwrap_or_else(|| format!("job-{}", id));
        Ok(Job {
            id,
            name,
            pipeline,
            source,
            sink,
            channel_capacity: self.config.channel_capacity,
        })
    }

    /// Prepares and runs a job to completion
    pub async fn run(&self, spec: &PipelineSpec) -> Result<JobReport> {
        self.prepare(spec)?.run().await
    }

    /// Parses a JSON specification, then runs it
    pub async fn run_json(&self, spec: &str) -> Result<JobReport> {
        let spec = PipelineSpec::from_json(spec)?;
        self.run(&spec).await
    }
}

/// A fully built job, ready to run
#[derive(Debug)]
pub struct Job {
    id: Uuid,
    name: String,
    pipeline: Pipeline,
    source: Box<dyn EventSource>,
    sink: Box<dyn EventSink>,
    channel_capacity: usize,
}

impl Job {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Replaces the source built from the specification
    pub fn with_source(mut self, source: Box<dyn EventSource>) -> Self {
        self.source = source;
        self
    }

    /// Replaces the sink built from the specification
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Runs source, pipeline and sink concurrently until the sink finishes
    ///
    /// When several tasks fail, the pipeline's error wins over the sink's,
    /// which wins over the source's; a channel-closed error is only reported
    /// when no task failed for another reason.
    pub async fn run(self) -> Result<JobReport> {
        let Job {
            id,
            name,
            pipeline,
            source,
            sink,
            channel_capacity,
        } = self;

        info!(
            job_id = %id,
            job = %name,
            source = source.name(),
            sink = sink.name(),
            operators = ?pipeline.operator_names(),
            "Starting job"
        );
        let started = Instant::now();

        let (source_tx, source_rx) = mpsc::channel(channel_capacity);
        let (output_tx, output_rx) = mpsc::channel(channel_capacity);

        let sink_task = tokio::spawn(sink.run(output_rx));
        let pipeline_task = tokio::spawn(StreamExecutor::new(pipeline).run(source_rx, output_tx));
        let source_task = tokio::spawn(source.run(source_tx));

        let (source_result, pipeline_result, sink_result) =
            tokio::join!(source_task, pipeline_task, sink_task);
        let source_result = source_result.map_err(task_failed).and_then(|r| r);
        let pipeline_result = pipeline_result.map_err(task_failed).and_then(|r| r);
        let sink_result = sink_result.map_err(task_failed).and_then(|r| r);

        match (source_result, pipeline_result, sink_result) {
            (Ok(events_read), Ok(stats), Ok(sink_report)) => {
                let report = JobReport {
                    job_id: id,
                    name,
                    events_read,
                    events_emitted: stats.events_out,
                    events_flushed: stats.events_flushed,
                    events_skipped: stats.events_skipped,
                    events_written: sink_report.written,
                    collected: sink_report.collected,
                };
                info!(
                    job_id = %id,
                    events_read = report.events_read,
                    events_emitted = report.events_emitted,
                    events_written = report.events_written,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Job finished"
                );
                Ok(report)
            }
            (source_result, pipeline_result, sink_result) => {
                let err = first_failure(source_result.err(), pipeline_result.err(), sink_result.err());
                error!(job_id = %id, job = %name, error = %err, "Job failed");
                Err(err)
            }
        }
    }
}

fn task_failed(err: JoinError) -> ProcessorError {
    ProcessorError::Execution {
        source: Box::new(err),
    }
}

/// Picks the error to report for a failed job
fn first_failure(
    source: Option<ProcessorError>,
    pipeline: Option<ProcessorError>,
    sink: Option<ProcessorError>,
) -> ProcessorError {
    let mut errors: Vec<ProcessorError> = [pipeline, sink, source].into_iter().flatten().collect();
    match errors.iter().position(|e| !e.is_channel_closed()) {
        Some(idx) => errors.swap_remove(idx),
        None => errors
            .into_iter()
            .next()
            .unwrap_or_else(|| ProcessorError::Unexpected("job failed without an error".to_string())),
    }
}
