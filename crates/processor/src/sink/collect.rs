//! In-memory sink

use super::{EventSink, SinkReport};
use crate::error::{BuildResult, Result};
use crate::params::ParamReader;
use async_trait::async_trait;
use dataflow_types::Event;
use tokio::sync::mpsc;

/// Keeps every event and returns them in the [`SinkReport`]
#[derive(Debug, Default)]
pub struct CollectSink;

impl CollectSink {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn from_params(_params: &ParamReader<'_>) -> BuildResult<Box<dyn EventSink>> {
        Ok(Box::new(Self))
    }
}

#[async_trait]
impl EventSink for CollectSink {
    fn name(&self) -> &str {
        "collect"
    }

    async fn run(self: Box<Self>, mut input: mpsc::Receiver<Event>) -> Result<SinkReport> {
        let mut events = Vec::new();
        while let Some(event) = input.recv().await {
            events.push(event);
        }
        Ok(SinkReport {
            written: events.len() as u64,
            collected: Some(events),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_collects_in_order() {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(Box::new(CollectSink::new()).run(rx));
        for i in 0..3 {
            tx.send(Event::new(Utc::now()).with_field("i", i)).await.unwrap();
        }
        drop(tx);

        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.written, 3);
        let order: Vec<_> = report
            .collected
            .unwrap()
            .iter()
            .map(|e| e.get("i").and_then(|v| v.as_i64()).unwrap())
            .collect();
        assert_eq!(order, vec![0, 1, 2]);
    }
}
