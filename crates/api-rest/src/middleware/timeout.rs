//! Request timeout middleware

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Duration;

use crate::error::ApiError;

/// Upper bound on handling one request
///
/// Submitted jobs run in the background, so only construction counts.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn timeout_middleware(request: Request, next: Next) -> Response {
    match tokio::time::timeout(REQUEST_TIMEOUT, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(timeout = ?REQUEST_TIMEOUT, "Request timed out");
            ApiError::Timeout.into_response()
        }
    }
}
