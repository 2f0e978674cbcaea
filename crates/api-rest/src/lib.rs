//! HTTP job submission for the dataflow engine
//!
//! Exposes a small axum router:
//!
//! - `POST /jobs` builds the submitted [`PipelineSpec`](dataflow_types::PipelineSpec)
//!   synchronously and starts it in the background (`202`), or rejects it (`400`)
//! - `GET /jobs` lists submitted jobs, newest last
//! - `GET /jobs/:id` returns the status of one job
//! - `GET /health` reports liveness

pub mod error;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use jobs::{JobRecord, JobState, JobTracker, DEFAULT_JOB_HISTORY};

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use processor::JobEngine;
use std::net::SocketAddr;

/// Shared state of the HTTP server
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub engine: JobEngine,
    pub jobs: JobTracker,
}

impl AppState {
    pub fn new(engine: JobEngine) -> Self {
        Self {
            engine,
            jobs: JobTracker::default(),
        }
    }

    /// Keep at most `max_jobs` records in the job history
    pub fn with_job_history(mut self, max_jobs: usize) -> Self {
        self.jobs = JobTracker::with_capacity(max_jobs);
        self
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/jobs", post(routes::submit_job).get(routes::list_jobs))
        .route("/jobs/:id", get(routes::get_job))
        .layer(from_fn(middleware::logging_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(from_fn(middleware::timeout_middleware))
        .with_state(state)
}

/// Bind `addr` and serve the router until the process exits
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Job submission server listening");
    axum::serve(listener, router(state)).await
}
