//! Windowing operators
//!
//! Every window buffers incoming events and, when a window closes, hands the
//! closed batch to its inner operator's batch capability. The summaries that
//! come back are annotated and emitted in firing order.
//!
//! # Window Types
//!
//! ## Count windows
//! - [`CountTumblingWindow`]: fires every `size` events, then starts over.
//! - [`CountSlidingWindow`]: keeps the last `size` events and fires every `step`
//!   events once full.
//!
//! ## Time windows
//! - [`TimeTumblingWindow`]: fixed, non-overlapping event-time windows closed by
//!   the first event past the boundary.
//! - [`TimeSlidingWindow`]: overlapping windows of length `size` ending every
//!   `slide`.
//! - [`WatermarkWindow`]: tumbling windows closed by a watermark that trails the
//!   largest seen timestamp by an allowed lateness.
//!
//! ```text
//! Time:     0----5----10---15---20---25---30
//! Tumbling: [----][----][----][----][----]
//! Sliding:  [----------]
//!                [----------]
//!                     [----------]
//! ```
//!
//! # Annotations
//!
//! Each summary carries `window_id` (1, 2, ... per window instance, in firing
//! order). Time windows add `window_end` as an RFC 3339 string, and summaries
//! flushed out of a watermark window at end of stream carry
//! `emitted_via_flush: true`. Windows that received no events never fire.

mod count;
mod time;
pub mod types;
mod watermark;

pub use count::{CountSlidingWindow, CountTumblingWindow};
pub use time::{TimeSlidingWindow, TimeTumblingWindow};
pub use types::{align_to_grid, WindowBounds};
pub use watermark::WatermarkWindow;

use crate::error::{BuildError, BuildResult, ProcessorError, Result};
use crate::pipeline::operator::StreamOperator;
use chrono::{DateTime, Utc};
use dataflow_types::Event;
use serde_json::Value;
use tracing::debug;

/// Annotation keys added to window output
pub const WINDOW_ID: &str = "window_id";
pub const WINDOW_END: &str = "window_end";
pub const EMITTED_VIA_FLUSH: &str = "emitted_via_flush";

/// State shared by every window: its name, inner aggregator and id counter
#[derive(Debug)]
pub(crate) struct WindowCore {
    name: String,
    inner: Box<dyn StreamOperator>,
    fired: u64,
}

impl WindowCore {
    /// Wraps `inner`, rejecting operators without the batch capability
    pub(crate) fn new(name: impl Into<String>, inner: Box<dyn StreamOperator>) -> BuildResult<Self> {
        let name = name.into();
        if inner.as_batch().is_none() {
            return Err(BuildError::NotBatchCapable {
                window: name,
                inner: inner.name().to_string(),
            });
        }
        Ok(Self {
            name,
            inner,
            fired: 0,
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub(crate) fn fired(&self) -> u64 {
        self.fired
    }

    /// Closes one window over `events`
    ///
    /// An empty window produces nothing and does not consume an id.
    pub(crate) fn fire(
        &mut self,
        events: &[Event],
        end: Option<DateTime<Utc>>,
        via_flush: bool,
    ) -> Result<Vec<Event>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let batch = self.inner.as_batch().ok_or_else(|| {
            ProcessorError::Unexpected(format!(
                "inner operator of {} lost its batch capability",
                self.name
            ))
        })?;
        let mut results = batch.process_batch(events)?;

        self.fired += 1;
        let window_id = self.fired;
        let window_end = end.map(types::format_window_end);

        for summary in &mut results {
            summary.set(WINDOW_ID, window_id);
            if let Some(end) = &window_end {
                summary.set(WINDOW_END, end.clone());
            }
            if via_flush {
                summary.set(EMITTED_VIA_FLUSH, Value::Bool(true));
            }
        }

        debug!(
            operator = %self.name,
            window_id = window_id,
            window_end = window_end.as_deref().unwrap_or("-"),
            events = events.len(),
            summaries = results.len(),
            via_flush = via_flush,
            "window fired"
        );

        Ok(results)
    }
}
