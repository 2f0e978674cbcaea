//! Job submission request/response models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::jobs::JobRecord;

/// Response to an accepted submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAccepted {
    /// Always `"started"`
    pub status: String,
    pub job_id: Uuid,
}

impl JobAccepted {
    pub fn started(job_id: Uuid) -> Self {
        Self {
            status: "started".to_string(),
            job_id,
        }
    }
}

/// Error body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Submitted jobs in submission order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobRecord>,
    pub total: usize,
}

impl JobListResponse {
    pub fn new(jobs: Vec<JobRecord>) -> Self {
        let total = jobs.len();
        Self { jobs, total }
    }
}
