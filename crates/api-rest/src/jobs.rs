//! In-memory history of submitted jobs

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use processor::JobReport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Running,
    Succeeded,
    Failed,
}

/// What is known about one submitted job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub name: String,
    pub state: JobState,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<JobReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Jobs remembered by a tracker built with [`JobTracker::new`]
pub const DEFAULT_JOB_HISTORY: usize = 1000;

/// Tracks jobs started through the API
///
/// At most `capacity` records are kept; starting a job beyond that forgets the
/// oldest submission. Stored reports never keep collected output events.
/// Cloning shares the underlying history.
#[derive(Debug, Clone)]
pub struct JobTracker {
    jobs: Arc<RwLock<IndexMap<Uuid, JobRecord>>>,
    capacity: usize,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_JOB_HISTORY)
    }
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracker remembering at most `capacity` jobs (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(IndexMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record a job that has just been started
    pub fn started(&self, job_id: Uuid, name: impl Into<String>) {
        let record = JobRecord {
            job_id,
            name: name.into(),
            state: JobState::Running,
            submitted_at: Utc::now(),
            finished_at: None,
            report: None,
            error: None,
        };
        let mut jobs = self.jobs.write();
        jobs.insert(job_id, record);
        while jobs.len() > self.capacity {
            if let Some((evicted, _)) = jobs.shift_remove_index(0) {
                tracing::debug!(job_id = %evicted, "Evicted job from history");
            }
        }
    }

    /// Record the outcome of a job
    pub fn finished(&self, job_id: Uuid, outcome: Result<JobReport, String>) {
        let mut jobs = self.jobs.write();
        let Some(record) = jobs.get_mut(&job_id) else {
            tracing::warn!(job_id = %job_id, "Outcome reported for an untracked job");
            return;
        };

        record.finished_at = Some(Utc::now());
        match outcome {
            Ok(mut report) => {
                report.collected = None;
                record.state = JobState::Succeeded;
                record.report = Some(report);
            }
            Err(error) => {
                record.state = JobState::Failed;
                record.error = Some(error);
            }
        }
    }

    pub fn get(&self, job_id: &Uuid) -> Option<JobRecord> {
        self.jobs.read().get(job_id).cloned()
    }

    pub fn list(&self) -> Vec<JobRecord> {
        self.jobs.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_lifecycle() {
        let tracker = JobTracker::new();
        let ok = Uuid::new_v4();
        let bad = Uuid::new_v4();

        tracker.started(ok, "first");
        tracker.started(bad, "second");
        assert_eq!(tracker.get(&ok).unwrap().state, JobState::Running);

        tracker.finished(ok, Ok(JobReport::default()));
        tracker.finished(bad, Err("sink failed".to_string()));

        let first = tracker.get(&ok).unwrap();
        assert_eq!(first.state, JobState::Succeeded);
        assert!(first.report.is_some());
        assert!(first.finished_at.is_some());

        let second = tracker.get(&bad).unwrap();
        assert_eq!(second.state, JobState::Failed);
        assert_eq!(second.error.as_deref(), Some("sink failed"));

        let names: Vec<_> = tracker.list().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_history_evicts_oldest() {
        let tracker = JobTracker::with_capacity(2);
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for (idx, id) in ids.iter().enumerate() {
            tracker.started(*id, format!("job-{}", idx));
        }

        assert_eq!(tracker.len(), 2);
        assert!(tracker.get(&ids[0]).is_none());
        let names: Vec<_> = tracker.list().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["job-1", "job-2"]);

        // an evicted job finishing later is not resurrected
        tracker.finished(ids[0], Ok(JobReport::default()));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_collected_output_is_not_retained() {
        let tracker = JobTracker::new();
        let id = Uuid::new_v4();
        tracker.started(id, "collect");
        let report = JobReport {
            collected: Some(Vec::new()),
            ..JobReport::default()
        };
        tracker.finished(id, Ok(report));
        assert!(tracker.get(&id).unwrap().report.unwrap().collected.is_none());
    }

    #[test]
    fn test_unknown_job_outcome_is_ignored() {
        let tracker = JobTracker::new();
        tracker.finished(Uuid::new_v4(), Ok(JobReport::default()));
        assert!(tracker.is_empty());
    }
}
