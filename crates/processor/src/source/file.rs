//! CSV file source

use super::{is_timestamp_column, parse_timestamp, EventSource, SourceContext};
use crate::clock::Clock;
use crate::error::{BuildResult, ProcessorError, Result};
use crate::params::ParamReader;
use async_trait::async_trait;
use dataflow_types::Event;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Reads a CSV file with a header row, one event per record
///
/// Every column becomes a string field. A column named `timestamp` (any
/// case) that parses as RFC 3339 sets the event time; otherwise the event is
/// stamped with the clock's current time.
#[derive(Debug)]
pub struct CsvFileSource {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            clock,
        }
    }

    pub(crate) fn from_params(
        params: &ParamReader<'_>,
        ctx: &SourceContext,
    ) -> BuildResult<Box<dyn EventSource>> {
        let path = params.string("path")?;
        Ok(Box::new(Self::new(path, ctx.clock.clone())))
    }

    fn failure(&self, err: impl std::error::Error + Send + Sync + 'static) -> ProcessorError {
        ProcessorError::Source {
            name: format!("file:{}", self.path.display()),
            source: Box::new(err),
        }
    }
}

#[async_trait]
impl EventSource for CsvFileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn run(self: Box<Self>, output: mpsc::Sender<Event>) -> Result<u64> {
        info!(path = %self.path.display(), "Reading CSV source");
        let contents = tokio::fs::read(&self.path)
            .await
            .map_err(|e| self.failure(e))?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(contents.as_slice());
        let headers = reader.headers().map_err(|e| self.failure(e))?.clone();
        let timestamp_column = headers.iter().position(is_timestamp_column);

        let mut sent = 0u64;
        for record in reader.records() {
            let record = record.map_err(|e| self.failure(e))?;

            let timestamp = timestamp_column
                .and_then(|idx| record.get(idx))
                .and_then(parse_timestamp)
                .unwrap_or_else(|| self.clock.now());

            let data: HashMap<String, Value> = headers
                .iter()
                .zip(record.iter())
                .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
                .collect();

            output
                .send(Event::from_fields(data, timestamp))
                .await
                .map_err(|_| ProcessorError::ChannelClosed("source output".to_string()))?;
            sent += 1;
        }

        debug!(path = %self.path.display(), records = sent, "CSV source exhausted");
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use std::io::Write;

    async fn read_all(source: CsvFileSource) -> (Result<u64>, Vec<Event>) {
        let (tx, mut rx) = mpsc::channel(1);
        let handle = tokio::spawn(Box::new(source).run(tx));
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (handle.await.unwrap(), events)
    }

    #[tokio::test]
    async fn test_reads_rows_with_timestamps() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Timestamp,value").unwrap();
        writeln!(file, "2024-01-01T00:00:05Z,A").unwrap();
        writeln!(file, "garbage,B").unwrap();

        let now = Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap();
        let source = CsvFileSource::new(file.path(), Arc::new(FixedClock::new(now)));
        let (sent, events) = read_all(source).await;

        assert_eq!(sent.unwrap(), 2);
        assert_eq!(events[0].timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 5).unwrap());
        assert_eq!(events[0].get_str("value"), Some("A"));
        assert_eq!(events[0].get_str("Timestamp"), Some("2024-01-01T00:00:05Z"));
        assert_eq!(events[1].timestamp, now);
    }

    #[tokio::test]
    async fn test_without_timestamp_column_uses_clock() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "value").unwrap();
        writeln!(file, "A").unwrap();

        let now = Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap();
        let source = CsvFileSource::new(file.path(), Arc::new(FixedClock::new(now)));
        let (_, events) = read_all(source).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, now);
    }

    #[tokio::test]
    async fn test_header_only_file_is_empty_stream() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "value").unwrap();

        let source = CsvFileSource::new(file.path(), Arc::new(crate::clock::SystemClock));
        let (sent, events) = read_all(source).await;
        assert_eq!(sent.unwrap(), 0);
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_source_error() {
        let source = CsvFileSource::new(
            "/definitely/not/here.csv",
            Arc::new(crate::clock::SystemClock),
        );
        let (sent, events) = read_all(source).await;
        assert!(matches!(sent, Err(ProcessorError::Source { .. })));
        assert!(events.is_empty());
    }
}
