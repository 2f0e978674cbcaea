//! Tumbling event-time windows closed by a watermark

use super::types::grid_window_end;
use super::WindowCore;
use crate::duration::format_duration;
use crate::error::{BuildError, BuildResult, Result};
use crate::pipeline::operator::{Flushable, StreamOperator};
use crate::watermark::{BoundedLatenessWatermark, Watermark, WatermarkGenerator};
use chrono::{DateTime, Duration, Utc};
use dataflow_types::Event;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Tumbling windows of `duration` that tolerate out-of-order events
///
/// Events are bucketed by the end of their grid window. The watermark trails
/// the largest timestamp seen by `allowed_lateness`; every bucket whose end is
/// at or before the watermark fires once, in ascending end order, and releases
/// its events. An event that arrives for an already fired window is dropped
/// and counted in [`late_events_dropped`](Self::late_events_dropped).
#[derive(Debug)]
pub struct WatermarkWindow {
    core: WindowCore,
    duration: Duration,
    watermark: BoundedLatenessWatermark,
    buckets: BTreeMap<DateTime<Utc>, Vec<Event>>,
    emitted: BTreeSet<DateTime<Utc>>,
    late_dropped: u64,
}

impl WatermarkWindow {
    pub fn new(
        duration: Duration,
        allowed_lateness: Duration,
        inner: Box<dyn StreamOperator>,
    ) -> BuildResult<Self> {
        let core = WindowCore::new("time_window_watermark", inner)?;
        if duration <= Duration::zero() {
            return Err(BuildError::InvalidParam {
                component: core.name().to_string(),
                param: "duration".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if allowed_lateness < Duration::zero() {
            return Err(BuildError::InvalidParam {
                component: core.name().to_string(),
                param: "allowed_lateness".to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        Ok(Self {
            core,
            duration,
            watermark: BoundedLatenessWatermark::new(allowed_lateness),
            buckets: BTreeMap::new(),
            emitted: BTreeSet::new(),
            late_dropped: 0,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.core.rename(name);
        self
    }

    pub fn current_watermark(&self) -> Watermark {
        self.watermark.current_watermark()
    }

    /// Events discarded because their window had already fired
    pub fn late_events_dropped(&self) -> u64 {
        self.late_dropped
    }

    /// Windows holding events that have not fired yet
    pub fn pending_windows(&self) -> usize {
        self.buckets.len()
    }

    pub fn windows_fired(&self) -> u64 {
        self.core.fired()
    }

    fn fire_bucket(&mut self, end: DateTime<Utc>, via_flush: bool) -> Result<Vec<Event>> {
        let events = self.buckets.remove(&end).unwrap_or_default();
        self.emitted.insert(end);
        self.core.fire(&events, Some(end), via_flush)
    }
}

impl StreamOperator for WatermarkWindow {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn process(&mut self, event: Event) -> Result<Vec<Event>> {
        let ts = event.timestamp;
        let end = grid_window_end(ts, self.duration)?;

        if let Some(watermark) = self.watermark.on_event(ts) {
            debug!(operator = %self.core.name(), watermark = %watermark.timestamp, "watermark advanced");
        }

        if self.emitted.contains(&end) {
            self.late_dropped += 1;
            debug!(
                operator = %self.core.name(),
                timestamp = %ts,
                window_end = %end,
                dropped = self.late_dropped,
                allowed_lateness = %format_duration(self.watermark.allowed_lateness()),
                "dropping late event for an already fired window"
            );
            return Ok(Vec::new());
        }
        self.buckets.entry(end).or_default().push(event);

        let watermark = self.watermark.current_watermark();
        let ready: Vec<DateTime<Utc>> = self
            .buckets
            .keys()
            .take_while(|end| watermark.has_passed(**end))
            .copied()
            .collect();

        let mut out = Vec::new();
        for end in ready {
            out.extend(self.fire_bucket(end, false)?);
        }
        Ok(out)
    }

    fn as_flushable(&mut self) -> Option<&mut dyn Flushable> {
        Some(self)
    }
}

impl Flushable for WatermarkWindow {
    fn flush(&mut self) -> Result<Vec<Event>> {
        let pending: Vec<DateTime<Utc>> = self.buckets.keys().copied().collect();
        let mut out = Vec::new();
        for end in pending {
            out.extend(self.fire_bucket(end, true)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::ReduceOperator;
    use chrono::TimeZone;
    use serde_json::json;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn at(secs: i64, key: &str) -> Event {
        Event::new(base() + Duration::seconds(secs)).with_field("k", key)
    }

    fn window(lateness: i64) -> WatermarkWindow {
        WatermarkWindow::new(
            Duration::seconds(10),
            Duration::seconds(lateness),
            Box::new(ReduceOperator::count("k")),
        )
        .unwrap()
    }

    #[test]
    fn test_fires_when_watermark_passes_end() {
        let mut w = window(5);
        assert!(w.process(at(2, "A")).unwrap().is_empty());
        // watermark 9: window [0,10) still open
        assert!(w.process(at(14, "B")).unwrap().is_empty());
        // out-of-order but within lateness
        assert!(w.process(at(8, "A")).unwrap().is_empty());

        // watermark 10 closes [0,10)
        let out = w.process(at(15, "B")).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("k"), Some(&json!("A")));
        assert_eq!(out[0].get("count"), Some(&json!(2)));
        assert_eq!(out[0].get("window_end"), Some(&json!("2024-01-01T00:00:10Z")));
        assert_eq!(out[0].get("window_id"), Some(&json!(1)));
        assert!(out[0].get("emitted_via_flush").is_none());
        assert_eq!(w.pending_windows(), 1);
    }

    #[test]
    fn test_late_event_for_fired_window_is_dropped() {
        let mut w = window(0);
        w.process(at(1, "A")).unwrap();
        let out = w.process(at(10, "B")).unwrap();
        assert_eq!(out.len(), 1);

        assert!(w.process(at(3, "late")).unwrap().is_empty());
        assert_eq!(w.late_events_dropped(), 1);

        let flushed = w.flush().unwrap();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].get("k"), Some(&json!("B")));
        assert!(flushed.iter().all(|e| e.get("k") != Some(&json!("late"))));
    }

    #[test]
    fn test_multiple_windows_fire_in_ascending_order() {
        let mut w = window(20);
        for (secs, key) in [(3, "A"), (13, "B"), (25, "C")] {
            assert!(w.process(at(secs, key)).unwrap().is_empty());
        }

        // watermark 21 closes [0,10) and [10,20) in one step
        let out = w.process(at(41, "D")).unwrap();
        let fired: Vec<_> = out
            .iter()
            .map(|e| (e.get_str("k").unwrap(), e.get_str("window_end").unwrap()))
            .collect();
        assert_eq!(
            fired,
            vec![("A", "2024-01-01T00:00:10Z"), ("B", "2024-01-01T00:00:20Z")]
        );
        assert_eq!(out[1].get("window_id"), Some(&json!(2)));
        assert_eq!(w.pending_windows(), 2);
    }

    #[test]
    fn test_flush_marks_output() {
        let mut w = window(30);
        w.process(at(1, "A")).unwrap();
        w.process(at(11, "B")).unwrap();
        w.process(at(21, "C")).unwrap();
        assert_eq!(w.windows_fired(), 0);

        let flushed = w.flush().unwrap();
        let ids: Vec<_> = flushed.iter().map(|e| e.get("window_id").cloned().unwrap()).collect();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
        assert!(flushed
            .iter()
            .all(|e| e.get("emitted_via_flush") == Some(&json!(true))));
        assert_eq!(w.pending_windows(), 0);
        assert!(w.flush().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_negative_lateness() {
        assert!(WatermarkWindow::new(
            Duration::seconds(10),
            Duration::seconds(-1),
            Box::new(ReduceOperator::count("k")),
        )
        .is_err());
    }
}
