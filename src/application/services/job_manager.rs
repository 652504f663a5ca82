use std::sync::Arc;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{ArtifactRef, DubConfig, Job, JobFailure, JobId, JobState, Stage};

/// Exclusive owner of job lifecycle. Every state mutation goes through
/// this service; workers never touch job records directly, which is what
/// keeps two of them from double-processing the same job.
pub struct JobManager {
    repository: Arc<dyn JobRepository>,
}

impl JobManager {
    pub fn new(repository: Arc<dyn JobRepository>) -> Self {
        Self { repository }
    }

    /// Validates the config and persists a fresh `queued` job with no
    /// artifacts.
    pub async fn create_job(&self, config: DubConfig) -> Result<Job, JobManagerError> {
        if config.source_filename.trim().is_empty() {
            return Err(JobManagerError::InvalidConfig(
                "source file name must not be empty".to_string(),
            ));
        }
        if config.source_size_bytes == 0 {
            return Err(JobManagerError::InvalidConfig(
                "source file must not be empty".to_string(),
            ));
        }
        if config.source.as_str().is_empty() {
            return Err(JobManagerError::InvalidConfig(
                "source file reference must not be empty".to_string(),
            ));
        }

        let job = Job::new(config);
        self.repository.create(&job).await?;

        tracing::info!(job_id = %job.id, "Job created");
        Ok(job)
    }

    pub async fn get_job(&self, id: JobId) -> Result<Job, JobManagerError> {
        match self.repository.get_by_id(id).await? {
            Some(job) => Ok(job),
            None => Err(JobManagerError::NotFound(id.to_string())),
        }
    }

    /// Atomic compare-and-set on the job state. `Conflict` means another
    /// caller got there first; the job was not modified.
    pub async fn transition(
        &self,
        id: JobId,
        from: JobState,
        to: JobState,
    ) -> Result<(), JobManagerError> {
        if !from.can_transition_to(to) {
            return Err(JobManagerError::Conflict(format!(
                "transition {} -> {} is not allowed",
                from, to
            )));
        }
        self.repository.transition(id, from, to, None).await?;
        tracing::debug!(job_id = %id, from = %from, to = %to, "Job state transition");
        Ok(())
    }

    /// Terminal failure: records the failing stage and cause alongside
    /// the `Failed` state.
    pub async fn fail(&self, id: JobId, failure: JobFailure) -> Result<(), JobManagerError> {
        self.repository
            .transition(id, JobState::Running, JobState::Failed, Some(&failure))
            .await?;
        tracing::warn!(
            job_id = %id,
            stage = %failure.stage,
            kind = %failure.kind,
            "Job failed"
        );
        Ok(())
    }

    pub async fn set_current_stage(
        &self,
        id: JobId,
        stage: Option<Stage>,
    ) -> Result<(), JobManagerError> {
        self.repository.set_current_stage(id, stage).await?;
        Ok(())
    }

    /// Write-once artifact recording; `Conflict` if the stage already
    /// produced one.
    pub async fn record_artifact(
        &self,
        id: JobId,
        stage: Stage,
        artifact: &ArtifactRef,
    ) -> Result<(), JobManagerError> {
        self.repository.record_artifact(id, stage, artifact).await?;
        tracing::debug!(job_id = %id, stage = %stage, artifact = %artifact, "Artifact recorded");
        Ok(())
    }

    /// Cooperative cancellation: `queued` jobs cancel immediately,
    /// `running` jobs are marked and honored by the executor between
    /// stages. Terminal jobs yield `Conflict`.
    pub async fn cancel(&self, id: JobId) -> Result<(), JobManagerError> {
        match self
            .repository
            .transition(id, JobState::Queued, JobState::Canceled, None)
            .await
        {
            Ok(()) => {
                tracing::info!(job_id = %id, "Queued job canceled");
                return Ok(());
            }
            Err(RepositoryError::Conflict(_)) => {}
            Err(e) => return Err(e.into()),
        }

        self.repository
            .transition(id, JobState::Running, JobState::Canceled, None)
            .await?;
        tracing::info!(job_id = %id, "Running job marked for cancellation");
        Ok(())
    }

    /// Jobs left `running` by a crashed executor; callers re-enqueue
    /// them so the pipeline resumes from the last recorded artifact.
    pub async fn recover_incomplete(&self) -> Result<Vec<Job>, JobManagerError> {
        let jobs = self.repository.list_by_state(JobState::Running).await?;
        if !jobs.is_empty() {
            tracing::info!(count = jobs.len(), "Recovered incomplete jobs for resume");
        }
        Ok(jobs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobManagerError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("repository: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for JobManagerError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(msg) => JobManagerError::NotFound(msg),
            RepositoryError::Conflict(msg) => JobManagerError::Conflict(msg),
            other => JobManagerError::Repository(other),
        }
    }
}
