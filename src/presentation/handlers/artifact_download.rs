use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::ports::{ArtifactStore, ArtifactStoreError};
use crate::application::services::JobManagerError;
use crate::domain::{JobId, Stage};
use crate::presentation::state::AppState;

use super::job_status::ErrorResponse;

fn content_type_for(name: &str) -> &'static str {
    match name.parse::<Stage>() {
        Ok(Stage::ExtractAudio) | Ok(Stage::Synthesize) => "audio/wav",
        Ok(Stage::Transcribe) | Ok(Stage::Translate) => "text/plain; charset=utf-8",
        Ok(Stage::AlignCaptions) => "application/json",
        Ok(Stage::Remux) => "video/mp4",
        Err(_) => "video/mp4", // the source upload
    }
}

/// Serves the source upload (`source`) or a stage output by stage name.
#[tracing::instrument(skip(state))]
pub async fn artifact_download_handler(
    State(state): State<AppState>,
    Path((job_id, name)): Path<(String, String)>,
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

    let job = match state.jobs.get_job(JobId::from_uuid(uuid)).await {
        Ok(job) => job,
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
            tracing::error!(error = %e, "Failed to fetch job for download");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch job".to_string(),
                }),
            )
                .into_response();
        }
    };

    let artifact = if name == "source" {
        job.config.source.clone()
    } else {
        let stage = match name.parse::<Stage>() {
            Ok(s) => s,
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: format!("Unknown artifact: {}", name),
                    }),
                )
                    .into_response();
            }
        };
        match job.artifact_for(stage) {
            Some(artifact) => artifact.clone(),
            None => {
                return (
                    StatusCode::NOT_FOUND,
                    Json(ErrorResponse {
                        error: format!("No artifact recorded for stage {}", name),
                    }),
                )
                    .into_response();
            }
        }
    };

    match state.store.fetch(&artifact).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type_for(&name))],
            bytes,
        )
            .into_response(),
        Err(ArtifactStoreError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Artifact data missing: {}", name),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch artifact");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch artifact".to_string(),
                }),
            )
                .into_response()
        }
    }
}
