use chrono::{DateTime, Utc};

use super::job_id::JobId;
use super::stage::Stage;

/// What happened, for progress consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEventKind {
    StageStarted,
    StageCompleted,
    StageFailed,
    JobDone,
    JobFailed,
    JobCanceled,
}

impl JobEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobEventKind::StageStarted => "stage_started",
            JobEventKind::StageCompleted => "stage_completed",
            JobEventKind::StageFailed => "stage_failed",
            JobEventKind::JobDone => "job_done",
            JobEventKind::JobFailed => "job_failed",
            JobEventKind::JobCanceled => "job_canceled",
        }
    }

    pub fn is_job_terminal(&self) -> bool {
        matches!(
            self,
            JobEventKind::JobDone | JobEventKind::JobFailed | JobEventKind::JobCanceled
        )
    }
}

/// One entry of a job's ordered progress stream. Within a job, event
/// order matches actual execution order.
#[derive(Debug, Clone)]
pub struct JobEvent {
    pub job_id: JobId,
    pub stage: Option<Stage>,
    pub kind: JobEventKind,
    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    pub fn now(job_id: JobId, stage: Option<Stage>, kind: JobEventKind) -> Self {
        Self {
            job_id,
            stage,
            kind,
            timestamp: Utc::now(),
        }
    }
}
