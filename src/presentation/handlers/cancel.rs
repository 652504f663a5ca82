use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use uuid::Uuid;

use crate::application::services::JobManagerError;
use crate::domain::JobId;
use crate::presentation::state::AppState;

use super::job_status::ErrorResponse;

#[derive(Serialize)]
pub struct CancelResponse {
    pub id: String,
    pub message: String,
}

/// Cooperative cancellation: queued jobs stop immediately, running jobs
/// finish their in-flight stage call first.
#[tracing::instrument(skip(state))]
pub async fn cancel_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let uuid = match Uuid::parse_str(&job_id) {
        Ok(u) => u,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Invalid job ID: {}", job_id),
                }),
            )
                .into_response();
        }
    };

    match state.jobs.cancel(JobId::from_uuid(uuid)).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(CancelResponse {
                id: job_id,
                message: "Cancellation requested".to_string(),
            }),
        )
            .into_response(),
        Err(JobManagerError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Job not found: {}", job_id),
            }),
        )
            .into_response(),
        Err(JobManagerError::Conflict(_)) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "Job already finished".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to cancel job");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to cancel job".to_string(),
                }),
            )
                .into_response()
        }
    }
}
