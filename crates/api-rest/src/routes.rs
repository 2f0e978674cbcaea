//! Request handlers

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use dataflow_types::PipelineSpec;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{HealthResponse, JobAccepted, JobListResponse};
use crate::jobs::JobRecord;
use crate::AppState;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Build the submitted job and start it in the background
///
/// Construction happens before the response is written, so every
/// specification error is reported to the caller.
pub async fn submit_job(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<JobAccepted>)> {
    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON: {}", e)))?;
    let spec = PipelineSpec::from_value(value)?;
    let job = state.engine.prepare(&spec)?;

    let job_id = job.id();
    state.jobs.started(job_id, job.name());

    let tracker = state.jobs.clone();
    tokio::spawn(async move {
        let outcome = job.run().await.map_err(|e| e.to_string());
        tracker.finished(job_id, outcome);
    });

    Ok((StatusCode::ACCEPTED, Json(JobAccepted::started(job_id))))
}

pub async fn list_jobs(State(state): State<AppState>) -> Json<JobListResponse> {
    Json(JobListResponse::new(state.jobs.list()))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobRecord>> {
    let job_id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::BadRequest(format!("invalid job id: {}", id)))?;
    state
        .jobs
        .get(&job_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("job {} not found", job_id)))
}
