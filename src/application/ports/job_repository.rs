use async_trait::async_trait;

use crate::domain::{ArtifactRef, Job, JobFailure, JobId, JobState, Stage};

use super::RepositoryError;

/// Persistence port for job records. `transition` and `record_artifact`
/// must be atomic with respect to concurrent callers; they are the only
/// serialization points that keep two workers from double-processing a
/// job.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError>;

    /// Compare-and-set the job state. Fails with `Conflict` when the
    /// current state differs from `from`. A successful transition to
    /// `Failed` stores the failure record; `Running` updates the current
    /// stage pointer.
    async fn transition(
        &self,
        id: JobId,
        from: JobState,
        to: JobState,
        failure: Option<&JobFailure>,
    ) -> Result<(), RepositoryError>;

    /// Point the job at the stage it is currently executing.
    async fn set_current_stage(
        &self,
        id: JobId,
        stage: Option<Stage>,
    ) -> Result<(), RepositoryError>;

    /// Append a stage output. Fails with `Conflict` when the stage
    /// already has an artifact; artifacts are write-once per job.
    async fn record_artifact(
        &self,
        id: JobId,
        stage: Stage,
        artifact: &ArtifactRef,
    ) -> Result<(), RepositoryError>;

    async fn list_by_state(&self, state: JobState) -> Result<Vec<Job>, RepositoryError>;
}
