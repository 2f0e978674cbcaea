//! Request/response models

pub mod job;

pub use job::{ErrorResponse, HealthResponse, JobAccepted, JobListResponse};
