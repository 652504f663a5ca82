use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use uuid::Uuid;

use crate::application::ports::ProgressNotifier;
use crate::application::services::JobManagerError;
use crate::domain::JobId;
use crate::presentation::state::AppState;

use super::job_status::ErrorResponse;

#[derive(Serialize)]
pub struct JobEventBody {
    pub stage: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct JobEventsResponse {
    pub job_id: String,
    pub events: Vec<JobEventBody>,
}

/// Ordered progress log for polling clients. Within one job the order
/// matches actual stage execution.
#[tracing::instrument(skip(state))]
pub async fn job_events_handler(
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
    let id = JobId::from_uuid(uuid);

    match state.jobs.get_job(id).await {
        Ok(_) => {}
        Err(JobManagerError::NotFound(_)) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("Job not found: {}", job_id),
                }),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch job for events");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch job".to_string(),
                }),
            )
                .into_response();
        }
    }

    let events = state.notifier.events_for(id).await;
    let body = JobEventsResponse {
        job_id: id.to_string(),
        events: events
            .into_iter()
            .map(|e| JobEventBody {
                stage: e.stage.map(|s| s.as_str().to_string()),
                event_type: e.kind.as_str().to_string(),
                timestamp: e.timestamp.to_rfc3339(),
            })
            .collect(),
    };

    (StatusCode::OK, Json(body)).into_response()
}
