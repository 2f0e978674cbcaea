//! In-memory source

use super::{is_timestamp_column, parse_timestamp, EventSource, SourceContext};
use crate::error::{BuildError, BuildResult, ProcessorError, Result};
use crate::params::ParamReader;
use async_trait::async_trait;
use dataflow_types::Event;
use tokio::sync::mpsc;
use tracing::debug;

/// Replays a fixed list of events
///
/// From a specification, `records` is an array of JSON objects. Field values
/// keep their JSON types; a string field named `timestamp` (any case) holding
/// RFC 3339 sets the event time, otherwise the clock's time is used.
#[derive(Debug, Clone)]
pub struct MemorySource {
    events: Vec<Event>,
}

impl MemorySource {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub(crate) fn from_params(
        params: &ParamReader<'_>,
        ctx: &SourceContext,
    ) -> BuildResult<Box<dyn EventSource>> {
        let records = params.array("records")?;
        let mut events = Vec::with_capacity(records.len());

        for (idx, record) in records.iter().enumerate() {
            let fields = record.as_object().ok_or_else(|| BuildError::InvalidParam {
                component: params.component().to_string(),
                param: format!("records[{}]", idx),
                reason: "expected an object".to_string(),
            })?;

            let timestamp = fields
                .iter()
                .find(|(name, _)| is_timestamp_column(name))
                .and_then(|(_, value)| value.as_str())
                .and_then(parse_timestamp)
                .unwrap_or_else(|| ctx.clock.now());

            let data = fields
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            events.push(Event::from_fields(data, timestamp));
        }

        Ok(Box::new(Self::new(events)))
    }
}

#[async_trait]
impl EventSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn run(self: Box<Self>, output: mpsc::Sender<Event>) -> Result<u64> {
        let mut sent = 0u64;
        for event in self.events {
            output
                .send(event)
                .await
                .map_err(|_| ProcessorError::ChannelClosed("source output".to_string()))?;
            sent += 1;
        }
        debug!(records = sent, "memory source exhausted");
        Ok(sent)
    }
}
