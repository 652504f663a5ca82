use std::io;
use std::time::Duration;

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::application::ports::{ArtifactStore, ProgressNotifier};
use crate::application::services::{DubbingMessage, JobManagerError};
use crate::domain::{
    ArtifactRef, CaptionEntry, CaptionTrack, DubConfig, JobEventKind, JobId, JobState, Language,
    Stage, VoiceStyle,
};
use crate::presentation::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DubResultData {
    pub original_video: String,
    pub dubbed_video: String,
    pub download_url: String,
    pub file_name: String,
    pub captions: Vec<CaptionEntry>,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub data: DubResultData,
    #[serde(rename = "jobId")]
    pub job_id: String,
}

#[derive(Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn reject(status: StatusCode, message: &str, error: Option<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorEnvelope {
            success: false,
            message: message.to_string(),
            error,
        }),
    )
        .into_response()
}

/// Accepts the dubbing request, creates the job, stages the upload,
/// enqueues it for the pipeline workers and waits (bounded) for the
/// terminal event so the response carries the finished result.
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut video: Option<(String, ArtifactRef, u64)> = None;
    let mut source_language: Option<String> = None;
    let mut target_language: Option<String> = None;
    let mut voice_style: Option<String> = None;
    let mut generate_captions: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read multipart");
                return reject(
                    StatusCode::BAD_REQUEST,
                    "Malformed upload request",
                    Some(e.to_string()),
                );
            }
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("video") => {
                let filename = field.file_name().unwrap_or("upload.mp4").to_string();
                let staging = ArtifactRef::from_raw(format!("uploads/{}/{}", Uuid::new_v4(), filename));

                // Stream the upload straight into the store instead of
                // buffering the whole video in memory.
                let stream = field
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
                    .boxed();
                match state.store.put_stream(&staging, stream).await {
                    Ok(size) => video = Some((filename, staging, size)),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to stage uploaded video");
                        return reject(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "Processing failed",
                            None,
                        );
                    }
                }
            }
            Some("sourceLanguage") => source_language = field.text().await.ok(),
            Some("targetLanguage") => target_language = field.text().await.ok(),
            Some("voiceStyle") => voice_style = field.text().await.ok(),
            Some("generateCaptions") => generate_captions = field.text().await.ok(),
            _ => {}
        }
    }

    let Some((filename, staging, size)) = video else {
        tracing::warn!("Upload request with no video file");
        return reject(StatusCode::BAD_REQUEST, "No video file uploaded", None);
    };

    // Validation failures discard the staged upload; nothing else knows
    // about it yet.
    let discard = |msg: String, state: AppState, staging: ArtifactRef| async move {
        let _ = state.store.delete(&staging).await;
        reject(StatusCode::BAD_REQUEST, &msg, None)
    };

    let source_language = match parse_language(source_language.as_deref(), "sourceLanguage") {
        Ok(l) => l,
        Err(msg) => return discard(msg, state, staging).await,
    };
    let target_language = match parse_language(target_language.as_deref(), "targetLanguage") {
        Ok(l) => l,
        Err(msg) => return discard(msg, state, staging).await,
    };
    let voice_style = match voice_style.as_deref() {
        None | Some("") => VoiceStyle::Natural,
        Some(raw) => match raw.parse::<VoiceStyle>() {
            Ok(v) => v,
            Err(msg) => return discard(msg, state, staging).await,
        },
    };
    let generate_captions = generate_captions
        .as_deref()
        .map(|v| matches!(v, "true" | "1" | "on"))
        .unwrap_or(true);

    let config = DubConfig {
        source_language,
        target_language,
        voice_style,
        generate_captions,
        source_filename: filename.clone(),
        source_size_bytes: size,
        source: staging,
    };

    // Subscribe before anything can complete so the terminal event is
    // never missed.
    let events = state.notifier.subscribe();

    let source_ref = config.source.clone();
    let job = match state.jobs.create_job(config).await {
        Ok(job) => job,
        Err(JobManagerError::InvalidConfig(msg)) => {
            let _ = state.store.delete(&source_ref).await;
            return reject(StatusCode::BAD_REQUEST, &msg, None);
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create job");
            return reject(StatusCode::INTERNAL_SERVER_ERROR, "Processing failed", None);
        }
    };

    if let Err(e) = state
        .dubbing_sender
        .send(DubbingMessage::new(job.id))
        .await
    {
        tracing::error!(error = %e, "Failed to enqueue dubbing job");
        return reject(
            StatusCode::SERVICE_UNAVAILABLE,
            "Dubbing queue unavailable",
            None,
        );
    }

    tracing::info!(
        job_id = %job.id,
        filename = %filename,
        source = %source_language,
        target = %target_language,
        "Dubbing job enqueued"
    );

    let wait = Duration::from_secs(state.settings.server.upload_wait_secs);
    let outcome = tokio::time::timeout(wait, wait_for_terminal(&state, job.id, events)).await;

    match outcome {
        Err(_) => {
            tracing::warn!(job_id = %job.id, "Upload response timed out; job still running");
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Processing timed out",
                Some(format!("job {} is still running", job.id)),
            )
        }
        Ok(None) => reject(StatusCode::INTERNAL_SERVER_ERROR, "Processing failed", None),
        Ok(Some(JobEventKind::JobDone)) => match build_result(&state, job.id, &filename).await {
            Ok(data) => (
                StatusCode::OK,
                Json(UploadResponse {
                    success: true,
                    message: "Video processed successfully".to_string(),
                    data,
                    job_id: job.id.to_string(),
                }),
            )
                .into_response(),
            Err(response) => response,
        },
        Ok(Some(JobEventKind::JobCanceled)) => {
            reject(StatusCode::CONFLICT, "Processing canceled", None)
        }
        Ok(Some(_)) => {
            let detail = match state.jobs.get_job(job.id).await {
                Ok(j) => j
                    .error
                    .map(|e| format!("{} stage failed ({})", e.stage, e.kind)),
                Err(_) => None,
            };
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Processing failed", detail)
        }
    }
}

fn parse_language(raw: Option<&str>, field: &str) -> Result<Language, String> {
    match raw {
        None | Some("") => Err(format!("{} is required", field)),
        Some(code) => code.parse::<Language>(),
    }
}

/// Watches the broadcast stream for this job's terminal event, falling
/// back to a state poll if the subscriber lagged off the channel.
async fn wait_for_terminal(
    state: &AppState,
    job_id: JobId,
    mut events: broadcast::Receiver<crate::domain::JobEvent>,
) -> Option<JobEventKind> {
    loop {
        match events.recv().await {
            Ok(event) if event.job_id == job_id && event.kind.is_job_terminal() => {
                return Some(event.kind);
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(job_id = %job_id, skipped, "Event subscriber lagged");
                match state.jobs.get_job(job_id).await {
                    Ok(job) => {
                        if let Some(kind) = terminal_kind(job.state) {
                            return Some(kind);
                        }
                    }
                    Err(_) => return None,
                }
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

fn terminal_kind(state: JobState) -> Option<JobEventKind> {
    match state {
        JobState::Done => Some(JobEventKind::JobDone),
        JobState::Failed => Some(JobEventKind::JobFailed),
        JobState::Canceled => Some(JobEventKind::JobCanceled),
        JobState::Queued | JobState::Running => None,
    }
}

async fn build_result(
    state: &AppState,
    job_id: JobId,
    filename: &str,
) -> Result<DubResultData, axum::response::Response> {
    let job = state.jobs.get_job(job_id).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to load finished job");
        reject(StatusCode::INTERNAL_SERVER_ERROR, "Processing failed", None)
    })?;

    let captions = match job.artifact_for(Stage::AlignCaptions) {
        Some(artifact) => {
            let bytes = state.store.fetch(artifact).await.map_err(|e| {
                tracing::error!(error = %e, "Failed to fetch caption artifact");
                reject(StatusCode::INTERNAL_SERVER_ERROR, "Processing failed", None)
            })?;
            let track: CaptionTrack = serde_json::from_slice(&bytes).map_err(|e| {
                tracing::error!(error = %e, "Caption artifact is not valid JSON");
                reject(StatusCode::INTERNAL_SERVER_ERROR, "Processing failed", None)
            })?;
            track.entries().to_vec()
        }
        None => Vec::new(),
    };

    let artifact_url = |name: &str| format!("/api/v1/jobs/{}/artifacts/{}", job_id, name);
    let stem = filename.rsplit_once('.').map(|(s, _)| s).unwrap_or(filename);

    Ok(DubResultData {
        original_video: artifact_url("source"),
        dubbed_video: artifact_url(Stage::Remux.as_str()),
        download_url: artifact_url(Stage::Remux.as_str()),
        file_name: format!("dubbed_{}.mp4", stem),
        captions,
    })
}
