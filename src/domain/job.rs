use chrono::{DateTime, Utc};

use super::artifact::ArtifactRef;
use super::dub_config::DubConfig;
use super::job_id::JobId;
use super::job_state::JobState;
use super::stage::Stage;

/// Why a job ended in `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub struct JobFailure {
    pub stage: Stage,
    pub kind: String,
    pub message: String,
}

/// A dubbing job record. State and artifacts are only ever mutated
/// through the job manager; everything else is fixed at creation.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub state: JobState,
    pub config: DubConfig,
    pub current_stage: Option<Stage>,
    /// Stage outputs in the order they were recorded. A stage appears at
    /// most once; the vector only ever grows.
    pub artifacts: Vec<(Stage, ArtifactRef)>,
    pub error: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(config: DubConfig) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            state: JobState::Queued,
            config,
            current_stage: None,
            artifacts: Vec::new(),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn artifact_for(&self, stage: Stage) -> Option<&ArtifactRef> {
        self.artifacts
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, r)| r)
    }
}
