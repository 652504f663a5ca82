use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{ArtifactRef, Job, JobFailure, JobId, JobState, Stage};

/// In-process job repository for tests and single-node deployments. The
/// compare-and-set runs entirely inside the write lock, which makes it
/// atomic with respect to concurrent workers on the same process.
#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id.as_uuid()) {
            return Err(RepositoryError::Conflict(format!(
                "job {} already exists",
                job.id
            )));
        }
        jobs.insert(job.id.as_uuid(), job.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(&id.as_uuid()).cloned())
    }

    async fn transition(
        &self,
        id: JobId,
        from: JobState,
        to: JobState,
        failure: Option<&JobFailure>,
    ) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&id.as_uuid())
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        if job.state != from {
            return Err(RepositoryError::Conflict(format!(
                "job {} is {}, expected {}",
                id, job.state, from
            )));
        }

        job.state = to;
        job.error = failure.cloned();
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn set_current_stage(
        &self,
        id: JobId,
        stage: Option<Stage>,
    ) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&id.as_uuid())
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        job.current_stage = stage;
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn record_artifact(
        &self,
        id: JobId,
        stage: Stage,
        artifact: &ArtifactRef,
    ) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&id.as_uuid())
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        if job.artifact_for(stage).is_some() {
            return Err(RepositoryError::Conflict(format!(
                "job {} already has an artifact for stage {}",
                id, stage
            )));
        }

        job.artifacts.push((stage, artifact.clone()));
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn list_by_state(&self, state: JobState) -> Result<Vec<Job>, RepositoryError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.values().filter(|j| j.state == state).cloned().collect())
    }
}
