//! Stream executor for running a pipeline between two channels
//!
//! The executor owns the operator chain. It pulls events from the input
//! channel, pushes every result to the output channel in production order,
//! and once the input closes it flushes the chain and closes the output.

use crate::error::{ProcessorError, Result};
use crate::pipeline::builder::Pipeline;
use dataflow_types::Event;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// Statistics for the stream executor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorStats {
    /// Events received from the source
    pub events_in: u64,

    /// Events handed to the sink, flush output included
    pub events_out: u64,

    /// Events released by the end-of-stream flush
    pub events_flushed: u64,

    /// Input events dropped because of a per-event error
    pub events_skipped: u64,
}

/// Drives a [`Pipeline`] from an input channel to an output channel
#[derive(Debug)]
pub struct StreamExecutor {
    pipeline: Pipeline,
    stats: ExecutorStats,
}

impl StreamExecutor {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            stats: ExecutorStats::default(),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn stats(&self) -> &ExecutorStats {
        &self.stats
    }

    /// Runs until the input channel closes
    ///
    /// Per-event errors are logged and the event is skipped; any other error
    /// stops the run. Dropping `output` on return closes the sink's input.
    pub async fn run(
        mut self,
        mut input: mpsc::Receiver<Event>,
        output: mpsc::Sender<Event>,
    ) -> Result<ExecutorStats> {
        info!(
            pipeline = %self.pipeline.name(),
            operators = self.pipeline.len(),
            "Starting stream executor"
        );

        while let Some(event) = input.recv().await {
            self.stats.events_in += 1;
            trace!(pipeline = %self.pipeline.name(), timestamp = %event.timestamp, "Processing event");

            match self.pipeline.process(event) {
                Ok(results) => self.emit(&output, results, false).await?,
                Err(e) if !e.is_fatal() => {
                    warn!(pipeline = %self.pipeline.name(), error = %e, "Skipping event");
                    self.stats.events_skipped += 1;
                }
                Err(e) => {
                    error!(pipeline = %self.pipeline.name(), error = %e, "Pipeline failed");
                    return Err(e);
                }
            }
        }

        debug!(pipeline = %self.pipeline.name(), "Input channel closed, flushing");
        let flushed = self.pipeline.flush().map_err(|e| {
            error!(pipeline = %self.pipeline.name(), error = %e, "Flush failed");
            e
        })?;
        self.emit(&output, flushed, true).await?;

        info!(
            pipeline = %self.pipeline.name(),
            events_in = self.stats.events_in,
            events_out = self.stats.events_out,
            events_flushed = self.stats.events_flushed,
            events_skipped = self.stats.events_skipped,
            "Stream executor finished"
        );
        Ok(self.stats)
    }

    async fn emit(
        &mut self,
        output: &mpsc::Sender<Event>,
        events: Vec<Event>,
        flushed: bool,
    ) -> Result<()> {
        for event in events {
            output
                .send(event)
                .await
                .map_err(|_| ProcessorError::ChannelClosed("pipeline output".to_string()))?;
            self.stats.events_out += 1;
            if flushed {
                self.stats.events_flushed += 1;
            }
        }
        Ok(())
    }
}
