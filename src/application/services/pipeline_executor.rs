use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tracing::Instrument;

use crate::application::ports::{
    ArtifactStore, ArtifactStoreError, AudioExtractor, CaptionAligner, MediaServiceError,
    ProgressNotifier, SpeechSynthesizer, SpeechToText, Translator, VideoRemuxer,
};
use crate::domain::{
    ArtifactRef, CaptionTrack, Job, JobEvent, JobEventKind, JobFailure, JobId, JobState, Stage,
    StageInput,
};

use super::job_manager::{JobManager, JobManagerError};
use super::stage_signature::stage_signature;

/// Work item handed to the executor pool. `resume` is set when the job
/// was recovered after a restart and is already in `running`.
#[derive(Debug)]
pub struct DubbingMessage {
    pub job_id: JobId,
    pub resume: bool,
}

impl DubbingMessage {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            resume: false,
        }
    }

    pub fn resume(job_id: JobId) -> Self {
        Self {
            job_id,
            resume: true,
        }
    }
}

/// Retry and timeout budget for external service calls.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub stage_timeout: Duration,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            stage_timeout: Duration::from_secs(600),
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

/// The external collaborators each pipeline stage is bound to.
#[derive(Clone)]
pub struct MediaServices {
    pub audio_extractor: Arc<dyn AudioExtractor>,
    pub speech_to_text: Arc<dyn SpeechToText>,
    pub translator: Arc<dyn Translator>,
    pub speech_synthesizer: Arc<dyn SpeechSynthesizer>,
    pub caption_aligner: Arc<dyn CaptionAligner>,
    pub video_remuxer: Arc<dyn VideoRemuxer>,
}

/// Runs claimed jobs through the fixed stage sequence. Clones share one
/// queue, so several workers can be spawned; the job manager's
/// compare-and-set claim keeps each job on exactly one of them.
#[derive(Clone)]
pub struct PipelineExecutor {
    receiver: Arc<Mutex<mpsc::Receiver<DubbingMessage>>>,
    jobs: Arc<JobManager>,
    store: Arc<dyn ArtifactStore>,
    notifier: Arc<dyn ProgressNotifier>,
    services: MediaServices,
    config: ExecutorConfig,
}

impl PipelineExecutor {
    pub fn new(
        receiver: mpsc::Receiver<DubbingMessage>,
        jobs: Arc<JobManager>,
        store: Arc<dyn ArtifactStore>,
        notifier: Arc<dyn ProgressNotifier>,
        services: MediaServices,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
            jobs,
            store,
            notifier,
            services,
            config,
        }
    }

    pub async fn run(self) {
        tracing::info!("Pipeline worker started");
        loop {
            let msg = {
                let mut receiver = self.receiver.lock().await;
                receiver.recv().await
            };
            let Some(msg) = msg else { break };

            let span = tracing::info_span!("dubbing_job", job_id = %msg.job_id);
            if let Err(e) = self.process_job(msg).instrument(span).await {
                tracing::error!(error = %e, "Dubbing job aborted");
            }
        }
        tracing::info!("Pipeline worker stopped: channel closed");
    }

    async fn process_job(&self, msg: DubbingMessage) -> Result<(), JobManagerError> {
        let job_id = msg.job_id;

        // Claim the job. Losing the compare-and-set means another worker
        // has it, or it was canceled while queued.
        match self
            .jobs
            .transition(job_id, JobState::Queued, JobState::Running)
            .await
        {
            Ok(()) => {}
            Err(JobManagerError::Conflict(_)) if msg.resume => {
                let job = self.jobs.get_job(job_id).await?;
                if job.state != JobState::Running {
                    tracing::debug!(state = %job.state, "Recovered job no longer resumable");
                    return Ok(());
                }
                tracing::info!("Resuming interrupted job");
            }
            Err(JobManagerError::Conflict(_)) => {
                tracing::debug!("Job already claimed or no longer queued");
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        for stage in Stage::SEQUENCE {
            let job = self.jobs.get_job(job_id).await?;

            // Cancellation is cooperative: checked between stages, never
            // mid-call.
            if job.state == JobState::Canceled {
                self.jobs.set_current_stage(job_id, None).await?;
                self.publish(job_id, None, JobEventKind::JobCanceled).await;
                tracing::info!(stage = %stage, "Job canceled before stage");
                return Ok(());
            }

            if job.artifact_for(stage).is_some() {
                tracing::debug!(stage = %stage, "Stage artifact already recorded, skipping");
                continue;
            }

            self.jobs.set_current_stage(job_id, Some(stage)).await?;
            self.publish(job_id, Some(stage), JobEventKind::StageStarted)
                .await;

            match self.run_stage(&job, stage).await {
                Ok(artifact) => {
                    self.jobs.record_artifact(job_id, stage, &artifact).await?;
                    self.publish(job_id, Some(stage), JobEventKind::StageCompleted)
                        .await;
                }
                Err(err) => {
                    self.publish(job_id, Some(stage), JobEventKind::StageFailed)
                        .await;
                    let failure = JobFailure {
                        stage,
                        kind: err.kind().to_string(),
                        message: err.to_string(),
                    };
                    match self.jobs.fail(job_id, failure).await {
                        Ok(()) => {
                            self.publish(job_id, Some(stage), JobEventKind::JobFailed)
                                .await;
                        }
                        // Canceled mid-stage: the in-flight call already
                        // finished, honor the cancellation instead.
                        Err(JobManagerError::Conflict(_)) => {
                            self.publish(job_id, None, JobEventKind::JobCanceled).await;
                        }
                        Err(e) => return Err(e),
                    }
                    return Ok(());
                }
            }
        }

        self.jobs.set_current_stage(job_id, None).await?;
        match self
            .jobs
            .transition(job_id, JobState::Running, JobState::Done)
            .await
        {
            Ok(()) => {
                self.publish(job_id, None, JobEventKind::JobDone).await;
                tracing::info!("Dubbing completed");
            }
            Err(JobManagerError::Conflict(_)) => {
                self.publish(job_id, None, JobEventKind::JobCanceled).await;
                tracing::info!("Job canceled before completion");
            }
            Err(e) => return Err(e),
        }

        Ok(())
    }

    /// One stage: fetch inputs, consult the content-addressed cache,
    /// otherwise invoke the bound service with retry, and persist the
    /// output under its signature.
    async fn run_stage(&self, job: &Job, stage: Stage) -> Result<ArtifactRef, StageError> {
        let inputs = self.fetch_inputs(job, stage).await?;

        let borrowed: Vec<(&str, &[u8])> = inputs
            .iter()
            .map(|(name, data)| (*name, data.as_slice()))
            .collect();
        let signature = stage_signature(stage, &job.config, &borrowed);
        let artifact = ArtifactRef::cached(&signature);

        match self.store.exists(&artifact).await {
            Ok(true) => {
                tracing::debug!(stage = %stage, "Stage cache hit");
                return Ok(artifact);
            }
            Ok(false) => {}
            Err(e) => return Err(StageError::Store(e)),
        }

        let output = self.invoke_with_retry(job, stage, &inputs).await?;
        self.store
            .put(&artifact, &output)
            .await
            .map_err(StageError::Store)?;

        Ok(artifact)
    }

    async fn fetch_inputs(
        &self,
        job: &Job,
        stage: Stage,
    ) -> Result<Vec<(&'static str, Vec<u8>)>, StageError> {
        let mut inputs = Vec::with_capacity(stage.requires().len());
        for requirement in stage.requires() {
            let (name, artifact) = match requirement {
                StageInput::SourceVideo => ("source", job.config.source.clone()),
                StageInput::Output(dep) => {
                    let artifact = job
                        .artifact_for(*dep)
                        .cloned()
                        .ok_or_else(|| StageError::MissingInput(dep.artifact_name().to_string()))?;
                    (dep.artifact_name(), artifact)
                }
            };
            let data = self.store.fetch(&artifact).await.map_err(|e| match e {
                ArtifactStoreError::NotFound(_) => StageError::MissingInput(name.to_string()),
                other => StageError::Store(other),
            })?;
            inputs.push((name, data));
        }
        Ok(inputs)
    }

    async fn invoke_with_retry(
        &self,
        job: &Job,
        stage: Stage,
        inputs: &[(&'static str, Vec<u8>)],
    ) -> Result<Vec<u8>, StageError> {
        let mut attempt: u32 = 1;
        let mut backoff = self.config.initial_backoff;

        loop {
            let call = self.invoke(job, stage, inputs);
            let err = match tokio::time::timeout(self.config.stage_timeout, call).await {
                Ok(Ok(output)) => return Ok(output),
                Ok(Err(e)) => StageCallError::Service(e),
                Err(_) => StageCallError::Timeout(self.config.stage_timeout),
            };

            if !err.is_transient() || attempt >= self.config.max_attempts {
                return Err(StageError::Call(err));
            }

            tracing::warn!(
                stage = %stage,
                attempt,
                error = %err,
                backoff_ms = backoff.as_millis() as u64,
                "Transient stage failure, retrying"
            );
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(self.config.max_backoff);
            attempt += 1;
        }
    }

    async fn invoke(
        &self,
        job: &Job,
        stage: Stage,
        inputs: &[(&'static str, Vec<u8>)],
    ) -> Result<Vec<u8>, MediaServiceError> {
        let config = &job.config;
        match stage {
            Stage::ExtractAudio => {
                let video = find_input(inputs, "source")?;
                self.services.audio_extractor.extract_audio(video).await
            }
            Stage::Transcribe => {
                let audio = find_input(inputs, Stage::ExtractAudio.artifact_name())?;
                self.services
                    .speech_to_text
                    .transcribe(audio, config.source_language)
                    .await
                    .map(String::into_bytes)
            }
            Stage::Translate => {
                let transcript = utf8_input(inputs, Stage::Transcribe.artifact_name())?;
                self.services
                    .translator
                    .translate(
                        &transcript,
                        config.source_language,
                        config.target_language,
                    )
                    .await
                    .map(String::into_bytes)
            }
            Stage::Synthesize => {
                let translated = utf8_input(inputs, Stage::Translate.artifact_name())?;
                self.services
                    .speech_synthesizer
                    .synthesize(&translated, config.target_language, config.voice_style)
                    .await
            }
            Stage::AlignCaptions => {
                let track = if config.generate_captions {
                    let translated = utf8_input(inputs, Stage::Translate.artifact_name())?;
                    let audio = find_input(inputs, Stage::Synthesize.artifact_name())?;
                    self.services.caption_aligner.align(&translated, audio).await?
                } else {
                    CaptionTrack::new(Vec::new())
                        .map_err(|e| MediaServiceError::Permanent(e.to_string()))?
                };
                serde_json::to_vec(&track)
                    .map_err(|e| MediaServiceError::Permanent(format!("caption encoding: {}", e)))
            }
            Stage::Remux => {
                let video = find_input(inputs, "source")?;
                let audio = find_input(inputs, Stage::Synthesize.artifact_name())?;
                self.services.video_remuxer.remux(video, audio).await
            }
        }
    }

    async fn publish(&self, job_id: JobId, stage: Option<Stage>, kind: JobEventKind) {
        self.notifier
            .publish(JobEvent::now(job_id, stage, kind))
            .await;
    }
}

fn find_input<'a>(
    inputs: &'a [(&'static str, Vec<u8>)],
    name: &str,
) -> Result<&'a [u8], MediaServiceError> {
    inputs
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, data)| data.as_slice())
        .ok_or_else(|| MediaServiceError::Permanent(format!("stage input not wired: {}", name)))
}

fn utf8_input(
    inputs: &[(&'static str, Vec<u8>)],
    name: &str,
) -> Result<String, MediaServiceError> {
    let data = find_input(inputs, name)?;
    String::from_utf8(data.to_vec())
        .map_err(|e| MediaServiceError::Permanent(format!("artifact {} is not UTF-8: {}", name, e)))
}

/// Failure of an external call after classification, carrying whether a
/// retry is worthwhile.
#[derive(Debug, thiserror::Error)]
enum StageCallError {
    #[error("{0}")]
    Service(MediaServiceError),
    #[error("external call exceeded {}s budget", .0.as_secs())]
    Timeout(Duration),
}

impl StageCallError {
    fn is_transient(&self) -> bool {
        match self {
            StageCallError::Service(e) => e.is_transient(),
            StageCallError::Timeout(_) => true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum StageError {
    #[error("{0}")]
    Call(StageCallError),
    #[error("required input missing: {0}")]
    MissingInput(String),
    #[error("artifact store: {0}")]
    Store(ArtifactStoreError),
}

impl StageError {
    fn kind(&self) -> &'static str {
        match self {
            StageError::Call(StageCallError::Service(e)) => e.kind(),
            StageError::Call(StageCallError::Timeout(_)) => "timeout",
            StageError::MissingInput(_) => "missing_input",
            StageError::Store(_) => "storage",
        }
    }
}
