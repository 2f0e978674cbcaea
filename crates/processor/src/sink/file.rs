//! CSV file sink

use super::{cell_text, EventSink, SinkReport};
use crate::error::{BuildResult, ProcessorError, Result};
use crate::params::ParamReader;
use async_trait::async_trait;
use dataflow_types::Event;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Writes events as CSV rows
///
/// The header is the first event's field names in sorted order; later events
/// are projected onto it, with absent fields left empty. The file is created
/// (or truncated) when the sink starts, so an empty stream leaves an empty file.
#[derive(Debug)]
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn from_params(params: &ParamReader<'_>) -> BuildResult<Box<dyn EventSink>> {
        Ok(Box::new(Self::new(params.string("path")?)))
    }

    fn failure(&self, err: impl std::error::Error + Send + Sync + 'static) -> ProcessorError {
        ProcessorError::Sink {
            name: format!("file:{}", self.path.display()),
            source: Box::new(err),
        }
    }
}

#[async_trait]
impl EventSink for CsvFileSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn run(self: Box<Self>, mut input: mpsc::Receiver<Event>) -> Result<SinkReport> {
        let mut file = File::create(&self.path).await.map_err(|e| self.failure(e))?;
        info!(path = %self.path.display(), "Writing CSV sink");

        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut header: Option<Vec<String>> = None;
        let mut written = 0u64;

        while let Some(event) = input.recv().await {
            let columns = header.get_or_insert_with(|| {
                let mut names: Vec<String> = event.data.keys().cloned().collect();
                names.sort();
                names
            });
            if written == 0 {
                writer.write_record(columns.iter()).map_err(|e| self.failure(e))?;
            }

            let row: Vec<String> = columns
                .iter()
                .map(|name| event.get(name).map(cell_text).unwrap_or_default())
                .collect();
            writer.write_record(&row).map_err(|e| self.failure(e))?;

            // hand the encoded rows to the file and start a fresh buffer
            let chunk = std::mem::replace(&mut writer, csv::Writer::from_writer(Vec::new()))
                .into_inner()
                .map_err(|e| self.failure(e.into_error()))?;
            file.write_all(&chunk).await.map_err(|e| self.failure(e))?;
            written += 1;
        }

        file.flush().await.map_err(|e| self.failure(e))?;
        debug!(path = %self.path.display(), rows = written, "CSV sink closed");
        Ok(SinkReport {
            written,
            collected: None,
        })
    }
}
