use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc};

use dubflow::application::ports::{
    ArtifactStore, JobRepository, MediaServiceError, ProgressNotifier, SpeechToText, Translator,
};
use dubflow::application::services::{
    DubbingMessage, ExecutorConfig, JobManager, JobManagerError, MediaServices, PipelineExecutor,
};
use dubflow::domain::{
    ArtifactRef, DubConfig, JobEventKind, JobId, JobState, Language, Stage, VoiceStyle,
};
use dubflow::infrastructure::media::scripted_services;
use dubflow::infrastructure::notify::EventLogNotifier;
use dubflow::infrastructure::persistence::InMemoryJobRepository;
use dubflow::infrastructure::storage::InMemoryArtifactStore;

fn test_config() -> DubConfig {
    DubConfig {
        source_language: Language::English,
        target_language: Language::Hindi,
        voice_style: VoiceStyle::Natural,
        generate_captions: true,
        source_filename: "clip.mp4".to_string(),
        source_size_bytes: 1024,
        source: ArtifactRef::from_raw(format!("uploads/{}/clip.mp4", uuid::Uuid::new_v4())),
    }
}

fn fast_executor_config() -> ExecutorConfig {
    ExecutorConfig {
        stage_timeout: Duration::from_secs(5),
        max_attempts: 3,
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(50),
    }
}

struct Harness {
    jobs: Arc<JobManager>,
    store: Arc<dyn ArtifactStore>,
    notifier: Arc<dyn ProgressNotifier>,
    sender: mpsc::Sender<DubbingMessage>,
}

fn spawn_harness(services: MediaServices, config: ExecutorConfig) -> Harness {
    let repository = Arc::new(InMemoryJobRepository::new());
    let jobs = Arc::new(JobManager::new(repository as Arc<dyn JobRepository>));
    let store: Arc<dyn ArtifactStore> = Arc::new(InMemoryArtifactStore::new());
    let notifier: Arc<dyn ProgressNotifier> = Arc::new(EventLogNotifier::default());

    let (sender, receiver) = mpsc::channel(16);
    let executor = PipelineExecutor::new(
        receiver,
        Arc::clone(&jobs),
        Arc::clone(&store),
        Arc::clone(&notifier),
        services,
        config,
    );
    for _ in 0..2 {
        tokio::spawn(executor.clone().run());
    }

    Harness {
        jobs,
        store,
        notifier,
        sender,
    }
}

impl Harness {
    /// Creates a job with its source staged and runs it to a terminal
    /// event.
    async fn run_job(&self, config: DubConfig) -> (JobId, JobEventKind) {
        let job = self.jobs.create_job(config).await.unwrap();
        self.store
            .put(&job.config.source, b"fake mp4")
            .await
            .unwrap();

        let mut events = self.notifier.subscribe();
        self.sender
            .send(DubbingMessage::new(job.id))
            .await
            .unwrap();

        let kind = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let event = events.recv().await.unwrap();
                if event.job_id == job.id && event.kind.is_job_terminal() {
                    return event.kind;
                }
            }
        })
        .await
        .expect("job did not reach a terminal state in time");

        (job.id, kind)
    }
}

struct FlakyTranscriber {
    remaining_failures: AtomicU32,
    calls: AtomicU32,
}

impl FlakyTranscriber {
    fn new(failures: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl SpeechToText for FlakyTranscriber {
    async fn transcribe(
        &self,
        _audio: &[u8],
        _source_language: Language,
    ) -> Result<String, MediaServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(MediaServiceError::Transient(
                "upstream connection reset".to_string(),
            ));
        }
        Ok("Hello there. This is a recovered transcript.".to_string())
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
            "language pair not supported by backend".to_string(),
        ))
    }
}

struct CountingTranscriber {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl SpeechToText for CountingTranscriber {
    async fn transcribe(
        &self,
        _audio: &[u8],
        _source_language: Language,
    ) -> Result<String, MediaServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("Counted transcript.".to_string())
    }
}

struct GatedTranscriber {
    started: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl SpeechToText for GatedTranscriber {
    async fn transcribe(
        &self,
        _audio: &[u8],
        _source_language: Language,
    ) -> Result<String, MediaServiceError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok("Gated transcript.".to_string())
    }
}

struct SleepyTranscriber {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl SpeechToText for SleepyTranscriber {
    async fn transcribe(
        &self,
        _audio: &[u8],
        _source_language: Language,
    ) -> Result<String, MediaServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(2)).await;
        Ok("Too late.".to_string())
    }
}

#[tokio::test]
async fn given_valid_config_when_creating_job_then_queued_with_no_artifacts() {
    let repository = Arc::new(InMemoryJobRepository::new());
    let jobs = JobManager::new(repository as Arc<dyn JobRepository>);

    let job = jobs.create_job(test_config()).await.unwrap();
    let snapshot = jobs.get_job(job.id).await.unwrap();

    assert_eq!(snapshot.state, JobState::Queued);
    assert!(snapshot.artifacts.is_empty());
    assert!(snapshot.error.is_none());
    assert!(snapshot.current_stage.is_none());
}

#[tokio::test]
async fn given_empty_filename_when_creating_job_then_invalid_config() {
    let repository = Arc::new(InMemoryJobRepository::new());
    let jobs = JobManager::new(repository as Arc<dyn JobRepository>);

    let mut config = test_config();
    config.source_filename = "  ".to_string();

    let err = jobs.create_job(config).await.unwrap_err();
    assert!(matches!(err, JobManagerError::InvalidConfig(_)));
}

#[tokio::test]
async fn given_two_concurrent_claims_when_transitioning_then_exactly_one_succeeds() {
    let repository = Arc::new(InMemoryJobRepository::new());
    let jobs = Arc::new(JobManager::new(repository as Arc<dyn JobRepository>));
    let job = jobs.create_job(test_config()).await.unwrap();

    let a = {
        let jobs = Arc::clone(&jobs);
        let id = job.id;
        tokio::spawn(async move { jobs.transition(id, JobState::Queued, JobState::Running).await })
    };
    let b = {
        let jobs = Arc::clone(&jobs);
        let id = job.id;
        tokio::spawn(async move { jobs.transition(id, JobState::Queued, JobState::Running).await })
    };

    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one claim must win: {:?} {:?}", a, b);
    assert!(
        matches!(
            [a, b].into_iter().find(|r| r.is_err()),
            Some(Err(JobManagerError::Conflict(_)))
        ),
        "the loser must see a conflict"
    );
}

#[tokio::test]
async fn given_recorded_artifact_when_recording_again_then_conflict() {
    let repository = Arc::new(InMemoryJobRepository::new());
    let jobs = JobManager::new(repository as Arc<dyn JobRepository>);
    let job = jobs.create_job(test_config()).await.unwrap();

    let artifact = ArtifactRef::for_job(&job.id, "transcript.txt");
    jobs.record_artifact(job.id, Stage::Transcribe, &artifact)
        .await
        .unwrap();

    let err = jobs
        .record_artifact(job.id, Stage::Transcribe, &artifact)
        .await
        .unwrap_err();
    assert!(matches!(err, JobManagerError::Conflict(_)));
}

#[tokio::test]
async fn given_terminal_job_when_transitioning_then_conflict() {
    let repository = Arc::new(InMemoryJobRepository::new());
    let jobs = JobManager::new(repository as Arc<dyn JobRepository>);
    let job = jobs.create_job(test_config()).await.unwrap();

    jobs.transition(job.id, JobState::Queued, JobState::Running)
        .await
        .unwrap();
    jobs.transition(job.id, JobState::Running, JobState::Done)
        .await
        .unwrap();

    let err = jobs
        .transition(job.id, JobState::Done, JobState::Running)
        .await
        .unwrap_err();
    assert!(matches!(err, JobManagerError::Conflict(_)));

    let err = jobs.cancel(job.id).await.unwrap_err();
    assert!(matches!(err, JobManagerError::Conflict(_)));
}

#[tokio::test]
async fn given_happy_path_when_running_then_done_with_all_artifacts_in_order() {
    let harness = spawn_harness(scripted_services(), fast_executor_config());

    let (job_id, kind) = harness.run_job(test_config()).await;
    assert_eq!(kind, JobEventKind::JobDone);

    let job = harness.jobs.get_job(job_id).await.unwrap();
    assert_eq!(job.state, JobState::Done);
    assert!(job.current_stage.is_none());

    let stages: Vec<Stage> = job.artifacts.iter().map(|(s, _)| *s).collect();
    assert_eq!(stages, Stage::SEQUENCE.to_vec());

    // Every recorded artifact is fetchable.
    for (_, artifact) in &job.artifacts {
        assert!(harness.store.exists(artifact).await.unwrap());
    }
}

#[tokio::test]
async fn given_happy_path_when_running_then_events_follow_execution_order() {
    let harness = spawn_harness(scripted_services(), fast_executor_config());

    let (job_id, _) = harness.run_job(test_config()).await;
    let events = harness.notifier.events_for(job_id).await;

    let mut expected = Vec::new();
    for stage in Stage::SEQUENCE {
        expected.push((Some(stage), JobEventKind::StageStarted));
        expected.push((Some(stage), JobEventKind::StageCompleted));
    }
    expected.push((None, JobEventKind::JobDone));

    let actual: Vec<(Option<Stage>, JobEventKind)> =
        events.iter().map(|e| (e.stage, e.kind)).collect();
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn given_transient_failures_twice_when_running_then_job_still_completes() {
    let transcriber = Arc::new(FlakyTranscriber::new(2));
    let mut services = scripted_services();
    services.speech_to_text = Arc::clone(&transcriber) as Arc<dyn SpeechToText>;

    let harness = spawn_harness(services, fast_executor_config());
    let (job_id, kind) = harness.run_job(test_config()).await;

    assert_eq!(kind, JobEventKind::JobDone);
    assert_eq!(transcriber.calls.load(Ordering::SeqCst), 3);

    let job = harness.jobs.get_job(job_id).await.unwrap();
    assert_eq!(job.state, JobState::Done);
}

#[tokio::test]
async fn given_permanent_failure_at_translate_then_only_prior_artifacts_remain() {
    let mut services = scripted_services();
    services.translator = Arc::new(FailingTranslator);

    let harness = spawn_harness(services, fast_executor_config());
    let (job_id, kind) = harness.run_job(test_config()).await;

    assert_eq!(kind, JobEventKind::JobFailed);

    let job = harness.jobs.get_job(job_id).await.unwrap();
    assert_eq!(job.state, JobState::Failed);

    let error = job.error.expect("failed job must carry an error record");
    assert_eq!(error.stage, Stage::Translate);
    assert_eq!(error.kind, "permanent");

    let stages: Vec<Stage> = job.artifacts.iter().map(|(s, _)| *s).collect();
    assert_eq!(stages, vec![Stage::ExtractAudio, Stage::Transcribe]);
}

#[tokio::test]
async fn given_stage_timeouts_when_retries_exhaust_then_job_fails_with_timeout() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut services = scripted_services();
    services.speech_to_text = Arc::new(SleepyTranscriber {
        calls: Arc::clone(&calls),
    });

    let config = ExecutorConfig {
        stage_timeout: Duration::from_millis(50),
        max_attempts: 2,
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(20),
    };
    let harness = spawn_harness(services, config);
    let (job_id, kind) = harness.run_job(test_config()).await;

    assert_eq!(kind, JobEventKind::JobFailed);
    assert_eq!(calls.load(Ordering::SeqCst), 2, "the timeout must be retried");

    let job = harness.jobs.get_job(job_id).await.unwrap();
    let error = job.error.expect("timed out job must carry an error record");
    assert_eq!(error.stage, Stage::Transcribe);
    assert_eq!(error.kind, "timeout");
}

#[tokio::test]
async fn given_cancellation_mid_stage_then_job_never_reaches_done() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let mut services = scripted_services();
    services.speech_to_text = Arc::new(GatedTranscriber {
        started: Arc::clone(&started),
        release: Arc::clone(&release),
    });

    let harness = spawn_harness(services, fast_executor_config());
    let job = harness.jobs.create_job(test_config()).await.unwrap();
    harness
        .store
        .put(&job.config.source, b"fake mp4")
        .await
        .unwrap();

    let mut events = harness.notifier.subscribe();
    harness
        .sender
        .send(DubbingMessage::new(job.id))
        .await
        .unwrap();

    // Wait until the transcription call is in flight, then cancel and
    // let the call finish.
    tokio::time::timeout(Duration::from_secs(5), started.notified())
        .await
        .unwrap();
    harness.jobs.cancel(job.id).await.unwrap();
    release.notify_one();

    let kind = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.unwrap();
            if event.job_id == job.id && event.kind.is_job_terminal() {
                return event.kind;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(kind, JobEventKind::JobCanceled);
    let snapshot = harness.jobs.get_job(job.id).await.unwrap();
    assert_eq!(snapshot.state, JobState::Canceled);
}

#[tokio::test]
async fn given_recorded_artifacts_when_resuming_then_completed_stages_are_skipped() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut services = scripted_services();
    services.speech_to_text = Arc::new(CountingTranscriber {
        calls: Arc::clone(&calls),
    });

    let harness = spawn_harness(services, fast_executor_config());

    // A previous executor claimed the job, finished two stages, and
    // crashed before transcribing further.
    let job = harness.jobs.create_job(test_config()).await.unwrap();
    harness
        .store
        .put(&job.config.source, b"fake mp4")
        .await
        .unwrap();
    harness
        .jobs
        .transition(job.id, JobState::Queued, JobState::Running)
        .await
        .unwrap();

    let audio_ref = ArtifactRef::for_job(&job.id, Stage::ExtractAudio.artifact_name());
    harness.store.put(&audio_ref, b"RIFFfake").await.unwrap();
    harness
        .jobs
        .record_artifact(job.id, Stage::ExtractAudio, &audio_ref)
        .await
        .unwrap();

    let transcript_ref = ArtifactRef::for_job(&job.id, Stage::Transcribe.artifact_name());
    harness
        .store
        .put(&transcript_ref, b"Recovered transcript.")
        .await
        .unwrap();
    harness
        .jobs
        .record_artifact(job.id, Stage::Transcribe, &transcript_ref)
        .await
        .unwrap();

    let mut events = harness.notifier.subscribe();
    harness
        .sender
        .send(DubbingMessage::resume(job.id))
        .await
        .unwrap();

    let kind = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let event = events.recv().await.unwrap();
            if event.job_id == job.id && event.kind.is_job_terminal() {
                return event.kind;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(kind, JobEventKind::JobDone);
    assert_eq!(
        calls.load(Ordering::SeqCst),
        0,
        "completed stages must not re-run"
    );

    let snapshot = harness.jobs.get_job(job.id).await.unwrap();
    assert_eq!(snapshot.state, JobState::Done);
    let stages: Vec<Stage> = snapshot.artifacts.iter().map(|(s, _)| *s).collect();
    assert_eq!(stages, Stage::SEQUENCE.to_vec());
}

#[tokio::test]
async fn given_identical_jobs_when_running_then_cached_stages_are_reused() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut services = scripted_services();
    services.speech_to_text = Arc::new(CountingTranscriber {
        calls: Arc::clone(&calls),
    });

    let harness = spawn_harness(services, fast_executor_config());

    let (first, kind) = harness.run_job(test_config()).await;
    assert_eq!(kind, JobEventKind::JobDone);
    let (second, kind) = harness.run_job(test_config()).await;
    assert_eq!(kind, JobEventKind::JobDone);

    assert_ne!(first.as_uuid(), second.as_uuid());
    assert_eq!(
        calls.load(Ordering::SeqCst),
        1,
        "identical audio and config must transcribe once"
    );
}

#[tokio::test]
async fn given_captions_disabled_when_running_then_caption_track_is_empty() {
    let harness = spawn_harness(scripted_services(), fast_executor_config());

    let mut config = test_config();
    config.generate_captions = false;
    let (job_id, kind) = harness.run_job(config).await;
    assert_eq!(kind, JobEventKind::JobDone);

    let job = harness.jobs.get_job(job_id).await.unwrap();
    let artifact = job
        .artifact_for(Stage::AlignCaptions)
        .expect("caption artifact is still recorded");
    let bytes = harness.store.fetch(artifact).await.unwrap();
    let track: dubflow::domain::CaptionTrack = serde_json::from_slice(&bytes).unwrap();
    assert!(track.is_empty());
}
