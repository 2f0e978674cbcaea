//! Event-time tumbling and sliding windows

use super::types::{advance, grid_window_end, WindowBounds};
use super::WindowCore;
use crate::error::{BuildError, BuildResult, Result};
use crate::pipeline::operator::{Flushable, StreamOperator};
use chrono::{DateTime, Duration, Utc};
use dataflow_types::Event;
use tracing::trace;

fn positive(window: &str, param: &str, value: Duration) -> BuildResult<()> {
    if value <= Duration::zero() {
        return Err(BuildError::InvalidParam {
            component: window.to_string(),
            param: param.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

/// Fixed, non-overlapping event-time windows
///
/// The first event opens the window ending at the next multiple of `duration`.
/// An event at or past the current end closes it; events are otherwise
/// appended to the open window regardless of their order.
#[derive(Debug)]
pub struct TimeTumblingWindow {
    core: WindowCore,
    duration: Duration,
    window_end: Option<DateTime<Utc>>,
    buffer: Vec<Event>,
}

impl TimeTumblingWindow {
    pub fn new(duration: Duration, inner: Box<dyn StreamOperator>) -> BuildResult<Self> {
        positive("time_window", "duration", duration)?;
        Ok(Self {
            core: WindowCore::new("time_window", inner)?,
            duration,
            window_end: None,
            buffer: Vec::new(),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.core.rename(name);
        self
    }

    /// End of the currently open window
    pub fn window_end(&self) -> Option<DateTime<Utc>> {
        self.window_end
    }

    pub fn windows_fired(&self) -> u64 {
        self.core.fired()
    }
}

impl StreamOperator for TimeTumblingWindow {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        let ts = event.timestamp;
        let aligned_end = grid_window_end(ts, self.duration)?;
        let mut end = self.window_end.unwrap_or(aligned_end);

        let mut out = Vec::new();
        while ts >= end {
            if self.buffer.is_empty() {
                // nothing buffered: skip the empty windows in between
                end = aligned_end;
                break;
            }
            let window = std::mem::take(&mut self.buffer);
            out.extend(self.core.fire(&window, Some(end), false)?);
            end = advance(end, self.duration)?;
        }

        self.window_end = Some(end);
        self.buffer.push(event);
        Ok(out)
    }

    fn as_flushable(&mut self) -> Option<&mut dyn Flushable> {
        Some(self)
    }
}

impl Flushable for TimeTumblingWindow {
    fn flush(&mut self) -> Result<Vec<Event>> {
        let end = match self.window_end {
            Some(end) if !self.buffer.is_empty() => end,
            _ => return Ok(Vec::new()),
        };
        let window = std::mem::take(&mut self.buffer);
        self.core.fire(&window, Some(end), false)
    }
}

/// Overlapping event-time windows of length `size`, one ending every `slide`
///
/// Window ends sit on the `slide` grid. An event at or past the next end
/// closes every window up to it; each closed window covers
/// `[end - size, end)` over the events retained so far. Events older than the
/// start of the next window can no longer be emitted and are evicted.
#[derive(Debug)]
pub struct TimeSlidingWindow {
    core: WindowCore,
    size: Duration,
    slide: Duration,
    next_end: Option<DateTime<Utc>>,
    max_timestamp: Option<DateTime<Utc>>,
    events: Vec<Event>,
}

impl TimeSlidingWindow {
    pub fn new(size: Duration, slide: Duration, inner: Box<dyn StreamOperator>) -> BuildResult<Self> {
        positive("time_sliding_window", "size", size)?;
        positive("time_sliding_window", "slide", slide)?;
        Ok(Self {
            core: WindowCore::new("time_sliding_window", inner)?,
            size,
            slide,
            next_end: None,
            max_timestamp: None,
            events: Vec::new(),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.core.rename(name);
        self
    }

    /// Events currently retained for future windows
    pub fn retained(&self) -> usize {
        self.events.len()
    }

    pub fn windows_fired(&self) -> u64 {
        self.core.fired()
    }

    /// Fires the window ending at `end` if it holds any event
    fn fire_window(&mut self, end: DateTime<Utc>) -> Result<Vec<Event>> {
        let bounds = WindowBounds::ending_at(end, self.size);
        let members: Vec<Event> = self
            .events
            .iter()
            .filter(|e| bounds.contains(e.timestamp))
            .cloned()
            .collect();
        self.core.fire(&members, Some(end), false)
    }

    /// Drops events that no window ending at or after `next_end` can contain
    fn evict(&mut self, next_end: DateTime<Utc>) {
        let horizon = WindowBounds::ending_at(next_end, self.size).start;
        let before = self.events.len();
        self.events.retain(|e| e.timestamp >= horizon);
        let evicted = before - self.events.len();
        if evicted > 0 {
            trace!(operator = %self.core.name(), evicted = evicted, "evicted expired events");
        }
    }

    /// First grid end whose window can contain the oldest retained event
    fn first_useful_end(&self) -> Result<Option<DateTime<Utc>>> {
        match self.events.iter().map(|e| e.timestamp).min() {
            Some(oldest) => Ok(Some(grid_window_end(oldest, self.slide)?)),
            None => Ok(None),
        }
    }
}

impl StreamOperator for TimeSlidingWindow {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        let ts = event.timestamp;
        // computed before retaining, so a bad timestamp leaves no trace
        let aligned_end = grid_window_end(ts, self.slide)?;
        let mut next_end = self.next_end.unwrap_or(aligned_end);

        self.max_timestamp = Some(self.max_timestamp.map_or(ts, |max| max.max(ts)));
        self.events.push(event);

        let mut out = Vec::new();
        while ts >= next_end {
            if let Some(useful) = self.first_useful_end()? {
                if useful > next_end {
                    next_end = useful;
                    continue;
                }
            }
            out.extend(self.fire_window(next_end)?);
            next_end = advance(next_end, self.slide)?;
            self.evict(next_end);
        }

        self.next_end = Some(next_end);
        Ok(out)
    }

    fn as_flushable(&mut self) -> Option<&mut dyn Flushable> {
        Some(self)
    }
}

impl Flushable for TimeSlidingWindow {
    fn flush(&mut self) -> Result<Vec<Event>> {
        let (mut next_end, max_ts) = match (self.next_end, self.max_timestamp) {
            (Some(end), Some(max)) => (end, max),
            _ => return Ok(Vec::new()),
        };
        let last_end = max_ts.checked_add_signed(self.size).unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut out = Vec::new();
        while next_end <= last_end && !self.events.is_empty() {
            out.extend(self.fire_window(next_end)?);
            next_end = advance(next_end, self.slide)?;
            self.evict(next_end);
        }
        self.next_end = Some(next_end);
        Ok(out)
    }
}
