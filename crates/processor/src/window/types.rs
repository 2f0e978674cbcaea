//! Window bounds and grid alignment
//!
//! Time windows live on a grid of multiples of their step counted from
//! 0001-01-01T00:00:00Z, the same origin Go's `time.Truncate` uses. Alignment is
//! computed in `i128` nanoseconds, so every instant chrono can represent can be
//! windowed; only results past the end of chrono's range are reported as
//! [`WindowError::InvalidTimestamp`].

use crate::error::{WindowError, WindowResult};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::fmt;

/// Represents the time bounds of a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowBounds {
    /// Start time of the window (inclusive)
    pub start: DateTime<Utc>,
    /// End time of the window (exclusive)
    pub end: DateTime<Utc>,
}

impl WindowBounds {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Bounds of the window of length `size` closing at `end`
    pub fn ending_at(end: DateTime<Utc>, size: Duration) -> Self {
        let start = end.checked_sub_signed(size).unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end }
    }

    /// Get the duration of the window
    pub fn duration(&self) -> Duration {
        self.end.signed_duration_since(self.start)
    }

    /// Check if a timestamp falls within this window
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp < self.end
    }
}

impl fmt::Display for WindowBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Seconds from 0001-01-01T00:00:00Z to the Unix epoch
const GRID_ORIGIN_OFFSET_SECS: i128 = 62_135_596_800;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Rounds `timestamp` down to a multiple of `step` since 0001-01-01T00:00:00Z
pub fn align_to_grid(timestamp: DateTime<Utc>, step: Duration) -> WindowResult<DateTime<Utc>> {
    let invalid = |reason: &str| WindowError::InvalidTimestamp {
        timestamp: timestamp.to_rfc3339(),
        reason: reason.to_string(),
    };

    let step = step
        .num_nanoseconds()
        .filter(|n| *n > 0)
        .ok_or_else(|| invalid("window step must be a positive nanosecond count"))?
        as i128;

    let since_origin = (timestamp.timestamp() as i128 + GRID_ORIGIN_OFFSET_SECS) * NANOS_PER_SECOND
        + timestamp.timestamp_subsec_nanos() as i128;
    let aligned = since_origin - since_origin.rem_euclid(step)
        - GRID_ORIGIN_OFFSET_SECS * NANOS_PER_SECOND;

    let secs = i64::try_from(aligned.div_euclid(NANOS_PER_SECOND))
        .map_err(|_| invalid("aligned instant is out of range"))?;
    let nanos = aligned.rem_euclid(NANOS_PER_SECOND) as u32;
    DateTime::from_timestamp(secs, nanos).ok_or_else(|| invalid("aligned instant is out of range"))
}

/// End of the grid window of length `step` containing `timestamp`
pub fn grid_window_end(timestamp: DateTime<Utc>, step: Duration) -> WindowResult<DateTime<Utc>> {
    advance(align_to_grid(timestamp, step)?, step)
}

/// `instant + step`, failing instead of overflowing
pub fn advance(instant: DateTime<Utc>, step: Duration) -> WindowResult<DateTime<Utc>> {
    instant
        .checked_add_signed(step)
        .ok_or_else(|| WindowError::InvalidTimestamp {
            timestamp: instant.to_rfc3339(),
            reason: format!("advancing by {} overflows", step),
        })
}

/// RFC 3339 rendering used for the `window_end` annotation
pub fn format_window_end(end: DateTime<Utc>) -> String {
    end.to_rfc3339_opts(SecondsFormat::Secs, true)
}
