use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio::sync::mpsc;
use tower::ServiceExt;

use dubflow::application::ports::{
    ArtifactStore, JobRepository, MediaServiceError, ProgressNotifier, SpeechToText, Translator,
};
use dubflow::application::services::{
    ExecutorConfig, JobManager, MediaServices, PipelineExecutor,
};
use dubflow::domain::Language;
use dubflow::infrastructure::media::scripted_services;
use dubflow::infrastructure::notify::EventLogNotifier;
use dubflow::infrastructure::persistence::InMemoryJobRepository;
use dubflow::infrastructure::storage::InMemoryArtifactStore;
use dubflow::presentation::config::Settings;
use dubflow::presentation::{AppState, create_router};

struct TestApp {
    router: axum::Router,
    repository: Arc<InMemoryJobRepository>,
    jobs: Arc<JobManager>,
}

fn create_test_app_with(services: MediaServices) -> TestApp {
    let repository = Arc::new(InMemoryJobRepository::new());
    let jobs = Arc::new(JobManager::new(
        Arc::clone(&repository) as Arc<dyn JobRepository>
    ));
    let store: Arc<dyn ArtifactStore> = Arc::new(InMemoryArtifactStore::new());
    let notifier: Arc<dyn ProgressNotifier> = Arc::new(EventLogNotifier::default());

    let (dubbing_sender, receiver) = mpsc::channel(16);
    let executor = PipelineExecutor::new(
        receiver,
        Arc::clone(&jobs),
        Arc::clone(&store),
        Arc::clone(&notifier),
        services,
        ExecutorConfig {
            stage_timeout: Duration::from_secs(5),
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
        },
    );
    tokio::spawn(executor.run());

    let state = AppState {
        jobs: Arc::clone(&jobs),
        store,
        notifier,
        dubbing_sender,
        settings: Settings::default(),
    };

    TestApp {
        router: create_router(state),
        repository,
        jobs,
    }
}

fn create_test_app() -> TestApp {
    create_test_app_with(scripted_services())
}

const BOUNDARY: &str = "dubflow-test-boundary";

struct UploadForm<'a> {
    video: Option<(&'a str, &'a [u8])>,
    source_language: Option<&'a str>,
    target_language: Option<&'a str>,
    voice_style: Option<&'a str>,
    generate_captions: Option<&'a str>,
}

impl Default for UploadForm<'_> {
    fn default() -> Self {
        Self {
            video: Some(("clip.mp4", b"fake mp4 payload")),
            source_language: Some("en"),
            target_language: Some("hi"),
            voice_style: Some("natural"),
            generate_captions: Some("true"),
        }
    }
}

fn upload_request(form: UploadForm<'_>) -> Request<Body> {
    let mut body = Vec::new();

    if let Some((filename, data)) = form.video {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"video\"; filename=\"{}\"\r\nContent-Type: video/mp4\r\n\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }

    for (name, value) in [
        ("sourceLanguage", form.source_language),
        ("targetLanguage", form.target_language),
        ("voiceStyle", form.voice_style),
        ("generateCaptions", form.generate_captions),
    ] {
        if let Some(value) = value {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            );
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

struct FlakyTranscriber {
    remaining_failures: AtomicU32,
}

#[async_trait]
impl SpeechToText for FlakyTranscriber {
    async fn transcribe(
        &self,
        _audio: &[u8],
        _source_language: Language,
    ) -> Result<String, MediaServiceError> {
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(MediaServiceError::Transient("rate limited".to_string()));
        }
        Ok("Hello again. The service recovered.".to_string())
    }
}

struct FailingTranslator;

#[async_trait]
impl Translator for FailingTranslator {
    async fn translate(
        &self,
        _text: &str,
        _source_language: Language,
        _target_language: Language,
    ) -> Result<String, MediaServiceError> {
        Err(MediaServiceError::Permanent(
            "glossary missing for language pair".to_string(),
        ))
    }
}

#[tokio::test]
async fn given_running_server_when_health_check_then_returns_ok() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn given_valid_upload_when_processing_then_returns_dubbed_result_with_captions() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(upload_request(UploadForm::default()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;

    assert_eq!(json["success"], true);
    let job_id = json["jobId"].as_str().unwrap();
    assert!(!job_id.is_empty());

    let data = &json["data"];
    assert!(!data["downloadUrl"].as_str().unwrap().is_empty());
    assert!(!data["dubbedVideo"].as_str().unwrap().is_empty());
    assert_eq!(data["fileName"], "dubbed_clip.mp4");

    let captions = data["captions"].as_array().unwrap();
    assert!(!captions.is_empty());
    for caption in captions {
        let start = caption["start"].as_f64().unwrap();
        let end = caption["end"].as_f64().unwrap();
        assert!(start < end);
        assert!(!caption["text"].as_str().unwrap().is_empty());
    }

    // The job is queryable afterwards and terminal.
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/jobs/{}", job_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status = json_body(response).await;
    assert_eq!(status["state"], "DONE");
    assert_eq!(status["artifacts"].as_array().unwrap().len(), 6);

    // The download URL serves the dubbed container.
    let download_url = data["downloadUrl"].as_str().unwrap().to_string();
    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri(download_url)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"fake mp4 payload");
}

#[tokio::test]
async fn given_upload_without_video_then_bad_request_and_no_job_created() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(upload_request(UploadForm {
            video: None,
            ..UploadForm::default()
        }))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);

    assert!(app.repository.is_empty().await, "no job must be created");
}

#[tokio::test]
async fn given_upload_with_unsupported_language_then_bad_request_and_no_job_created() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(upload_request(UploadForm {
            target_language: Some("fr"),
            ..UploadForm::default()
        }))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);

    assert!(app.repository.is_empty().await, "no job must be created");
}

#[tokio::test]
async fn given_transient_transcription_failures_then_upload_still_succeeds() {
    let mut services = scripted_services();
    services.speech_to_text = Arc::new(FlakyTranscriber {
        remaining_failures: AtomicU32::new(2),
    });
    let app = create_test_app_with(services);

    let response = app
        .router
        .oneshot(upload_request(UploadForm::default()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn given_permanent_stage_failure_then_error_envelope_and_failed_job() {
    let mut services = scripted_services();
    services.translator = Arc::new(FailingTranslator);
    let app = create_test_app_with(services);

    let response = app
        .router
        .clone()
        .oneshot(upload_request(UploadForm::default()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Processing failed");
    // The envelope names the failing stage without internal detail.
    let error = json["error"].as_str().unwrap();
    assert!(error.contains("translate"));
    assert!(!error.contains("glossary"));
}

#[tokio::test]
async fn given_unknown_job_id_when_querying_status_then_not_found() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/jobs/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn given_malformed_job_id_when_querying_status_then_bad_request() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/v1/jobs/not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn given_finished_job_when_polling_events_then_ordered_progress_log() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(upload_request(UploadForm::default()))
        .await
        .unwrap();
    let json = json_body(response).await;
    let job_id = json["jobId"].as_str().unwrap().to_string();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/jobs/{}/events", job_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let events = json["events"].as_array().unwrap();

    assert_eq!(events.first().unwrap()["type"], "stage_started");
    assert_eq!(events.first().unwrap()["stage"], "extract_audio");
    assert_eq!(events.last().unwrap()["type"], "job_done");
}

#[tokio::test]
async fn given_queued_job_when_canceling_then_job_is_canceled_and_stays_canceled() {
    let app = create_test_app();

    // Created but never enqueued, so it stays queued.
    let job = app
        .jobs
        .create_job(dubflow::domain::DubConfig {
            source_language: Language::English,
            target_language: Language::Hindi,
            voice_style: dubflow::domain::VoiceStyle::Natural,
            generate_captions: true,
            source_filename: "clip.mp4".to_string(),
            source_size_bytes: 16,
            source: dubflow::domain::ArtifactRef::from_raw("uploads/test/clip.mp4"),
        })
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/jobs/{}/cancel", job.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/jobs/{}", job.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["state"], "CANCELED");

    // Canceling a terminal job is a conflict.
    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/jobs/{}/cancel", job.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn given_unknown_artifact_name_when_downloading_then_bad_request() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(upload_request(UploadForm::default()))
        .await
        .unwrap();
    let json = json_body(response).await;
    let job_id = json["jobId"].as_str().unwrap().to_string();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/jobs/{}/artifacts/bogus", job_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn given_request_without_id_when_any_endpoint_then_response_contains_request_id() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn given_request_with_id_when_any_endpoint_then_response_echoes_request_id() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "test-request-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "test-request-123"
    );
}
