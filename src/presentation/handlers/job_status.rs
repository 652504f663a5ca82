use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use uuid::Uuid;

use crate::application::services::JobManagerError;
use crate::domain::JobId;
use crate::presentation::state::AppState;

#[derive(Serialize)]
pub struct ArtifactEntry {
    pub stage: String,
    pub artifact: String,
}

#[derive(Serialize)]
pub struct JobErrorBody {
    pub stage: String,
    pub kind: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct JobStatusResponse {
    pub id: String,
    pub state: String,
    pub current_stage: Option<String>,
    pub source_language: String,
    pub target_language: String,
    pub voice_style: String,
    pub generate_captions: bool,
    pub artifacts: Vec<ArtifactEntry>,
    pub error: Option<JobErrorBody>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[tracing::instrument(skip(state))]
pub async fn job_status_handler(
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

    match state.jobs.get_job(JobId::from_uuid(uuid)).await {
        Ok(job) => {
            let response = JobStatusResponse {
                id: job.id.to_string(),
                state: job.state.as_str().to_string(),
                current_stage: job.current_stage.map(|s| s.as_str().to_string()),
                source_language: job.config.source_language.as_code().to_string(),
                target_language: job.config.target_language.as_code().to_string(),
                voice_style: job.config.voice_style.as_str().to_string(),
                generate_captions: job.config.generate_captions,
                artifacts: job
                    .artifacts
                    .iter()
                    .map(|(stage, artifact)| ArtifactEntry {
                        stage: stage.as_str().to_string(),
                        artifact: artifact.as_str().to_string(),
                    })
                    .collect(),
                error: job.error.map(|e| JobErrorBody {
                    stage: e.stage.as_str().to_string(),
                    kind: e.kind,
                    message: e.message,
                }),
                created_at: job.created_at.to_rfc3339(),
                updated_at: job.updated_at.to_rfc3339(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(JobManagerError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Job not found: {}", job_id),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch job status");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch job".to_string(),
                }),
            )
                .into_response()
        }
    }
}
