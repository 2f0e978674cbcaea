//! Count-based windows

use super::WindowCore;
use crate::error::{BuildError, BuildResult, Result};
use crate::pipeline::operator::StreamOperator;
use dataflow_types::Event;
use std::collections::VecDeque;
use tracing::trace;

fn at_least_one(window: &str, param: &str, value: usize) -> BuildResult<()> {
    if value == 0 {
        return Err(BuildError::InvalidParam {
            component: window.to_string(),
            param: param.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// Fires every `size` events and starts a fresh window
///
/// There is no end-of-stream flush: a trailing partial window is discarded.
#[derive(Debug)]
pub struct CountTumblingWindow {
    core: WindowCore,
    size: usize,
    buffer: Vec<Event>,
}

impl CountTumblingWindow {
    pub fn new(size: usize, inner: Box<dyn StreamOperator>) -> BuildResult<Self> {
        at_least_one("tumbling_window", "size", size)?;
        Ok(Self {
            core: WindowCore::new("tumbling_window", inner)?,
            size,
            buffer: Vec::with_capacity(size),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.core.rename(name);
        self
    }

    /// Events waiting for the current window to fill
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn windows_fired(&self) -> u64 {
        self.core.fired()
    }
}

impl StreamOperator for CountTumblingWindow {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        self.buffer.push(event);
        if self.buffer.len() < self.size {
            trace!(operator = %self.core.name(), buffered = self.buffer.len(), "buffering");
            return Ok(Vec::new());
        }

        let window = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.size));
        self.core.fire(&window, None, false)
    }
}

/// Keeps the most recent `size` events and fires every `step` events once full
///
/// Windows fire after events N, N+S, N+2S, ... so `M` events produce
/// `1 + (M - N) / S` windows when `M >= N`. There is no end-of-stream flush.
#[derive(Debug)]
pub struct CountSlidingWindow {
    core: WindowCore,
    size: usize,
    step: usize,
    buffer: VecDeque<Event>,
    seen: u64,
}

impl CountSlidingWindow {
    pub fn new(size: usize, step: usize, inner: Box<dyn StreamOperator>) -> BuildResult<Self> {
        at_least_one("sliding_window", "size", size)?;
        at_least_one("sliding_window", "step", step)?;
        Ok(Self {
            core: WindowCore::new("sliding_window", inner)?,
            size,
            step,
            buffer: VecDeque::with_capacity(size + 1),
            seen: 0,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.core.rename(name);
        self
    }

    pub fn windows_fired(&self) -> u64 {
        self.core.fired()
    }
}

impl StreamOperator for CountSlidingWindow {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        self.buffer.push_back(event);
        self.seen += 1;
        if self.buffer.len() > self.size {
            self.buffer.pop_front();
        }

        let size = self.size as u64;
        if self.buffer.len() == self.size && (self.seen - size) % self.step as u64 == 0 {
            return self.core.fire(self.buffer.make_contiguous(), None, false);
        }
        Ok(Vec::new())
    }
}
