//! Watermark tracking for event-time windows
//!
//! A watermark is a timestamp threshold asserting that no event older than it
//! is still expected. The [`BoundedLatenessWatermark`] generator derives it from
//! the largest event timestamp seen so far minus a fixed allowed lateness, and
//! never lets it move backwards.
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use processor::watermark::{BoundedLatenessWatermark, WatermarkGenerator};
//!
//! let mut generator = BoundedLatenessWatermark::new(Duration::seconds(10));
//! let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
//!
//! let wm = generator.on_event(t0 + Duration::seconds(30)).unwrap();
//! assert_eq!(wm.timestamp, t0 + Duration::seconds(20));
//!
//! // An older event does not move the watermark back
//! assert!(generator.on_event(t0).is_none());
//! ```

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use tracing::trace;

/// Represents a watermark timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Watermark {
    pub timestamp: DateTime<Utc>,
}

impl Watermark {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self { timestamp }
    }

    /// Returns the minimum possible watermark (beginning of time)
    pub fn min() -> Self {
        Self {
            timestamp: DateTime::<Utc>::MIN_UTC,
        }
    }

    /// Checks if this watermark has passed the given instant
    pub fn has_passed(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp <= self.timestamp
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Self::min()
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Watermark({})", self.timestamp)
    }
}

/// Trait for generating watermarks from an event stream
pub trait WatermarkGenerator: Send + fmt::Debug {
    /// Called when a new event arrives
    ///
    /// Returns the new watermark when it advanced.
    fn on_event(&mut self, timestamp: DateTime<Utc>) -> Option<Watermark>;

    /// Gets the current watermark without advancing it
    fn current_watermark(&self) -> Watermark;

    /// Resets the generator to its initial state
    fn reset(&mut self);
}

/// Watermark trailing the maximum seen timestamp by a fixed lateness
#[derive(Debug, Clone)]
pub struct BoundedLatenessWatermark {
    allowed_lateness: Duration,
    max_timestamp: Option<DateTime<Utc>>,
    current: Watermark,
}

impl BoundedLatenessWatermark {
    pub fn new(allowed_lateness: Duration) -> Self {
        Self {
            allowed_lateness,
            max_timestamp: None,
            current: Watermark::min(),
        }
    }

    pub fn allowed_lateness(&self) -> Duration {
        self.allowed_lateness
    }

    /// Largest event timestamp observed so far
    pub fn max_timestamp(&self) -> Option<DateTime<Utc>> {
        self.max_timestamp
    }

    fn compute_watermark(&self, max_ts: DateTime<Utc>) -> Watermark {
        let timestamp = max_ts
            .checked_sub_signed(self.allowed_lateness)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Watermark::new(timestamp)
    }

    /// Checks if an event is behind the current watermark
    pub fn is_late(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp < self.current.timestamp
    }
}

impl WatermarkGenerator for BoundedLatenessWatermark {
    fn on_event(&mut self, timestamp: DateTime<Utc>) -> Option<Watermark> {
        let max_ts = match self.max_timestamp {
            Some(current) if current >= timestamp => return None,
            _ => timestamp,
        };
        self.max_timestamp = Some(max_ts);

        let candidate = self.compute_watermark(max_ts);
        if candidate > self.current {
            trace!(watermark = %candidate.timestamp, "watermark advanced");
            self.current = candidate;
            Some(candidate)
        } else {
            None
        }
    }

    fn current_watermark(&self) -> Watermark {
        self.current
    }

    fn reset(&mut self) {
        self.max_timestamp = None;
        self.current = Watermark::min();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_watermark_trails_max_timestamp() {
        let mut gen = BoundedLatenessWatermark::new(Duration::seconds(5));
        assert_eq!(gen.current_watermark(), Watermark::min());

        assert_eq!(gen.on_event(t(10)), Some(Watermark::new(t(5))));
        assert_eq!(gen.on_event(t(12)), Some(Watermark::new(t(7))));
        assert_eq!(gen.max_timestamp(), Some(t(12)));
    }

    #[test]
    fn test_watermark_never_regresses() {
        let mut gen = BoundedLatenessWatermark::new(Duration::seconds(5));
        gen.on_event(t(20));
        assert!(gen.on_event(t(3)).is_none());
        assert!(gen.on_event(t(20)).is_none());
        assert_eq!(gen.current_watermark().timestamp, t(15));
    }

    #[test]
    fn test_zero_lateness() {
        let mut gen = BoundedLatenessWatermark::new(Duration::zero());
        gen.on_event(t(30));
        assert!(gen.current_watermark().has_passed(t(30)));
        assert!(gen.is_late(t(29)));
        assert!(!gen.is_late(t(30)));
    }

    #[test]
    fn test_reset() {
        let mut gen = BoundedLatenessWatermark::new(Duration::seconds(1));
        gen.on_event(t(30));
        gen.reset();
        assert_eq!(gen.current_watermark(), Watermark::min());
        assert_eq!(gen.max_timestamp(), None);
    }
}
