//! Stdout sink

use super::{EventSink, SinkReport};
use crate::error::{BuildResult, ProcessorError, Result};
use crate::params::ParamReader;
use async_trait::async_trait;
use dataflow_types::Event;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

/// Prints each event as one line of JSON
#[derive(Debug, Default)]
pub struct StdoutSink;

impl StdoutSink {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn from_params(_params: &ParamReader<'_>) -> BuildResult<Box<dyn EventSink>> {
        Ok(Box::new(Self))
    }
}

#[async_trait]
impl EventSink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn run(self: Box<Self>, mut input: mpsc::Receiver<Event>) -> Result<SinkReport> {
        let mut stdout = tokio::io::stdout();
        let mut written = 0u64;

        while let Some(event) = input.recv().await {
            let mut line = serde_json::to_vec(&event)?;
            line.push(b'\n');
            stdout.write_all(&line).await.map_err(|e| ProcessorError::Sink {
                name: "stdout".to_string(),
                source: Box::new(e),
            })?;
            written += 1;
        }

        stdout.flush().await?;
        Ok(SinkReport {
            written,
            collected: None,
        })
    }
}
