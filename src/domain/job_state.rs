use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a dubbing job. Transitions are monotonic:
/// `Queued -> Running -> {Done | Failed | Canceled}`, and terminal
/// states are sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Queued,
    Running,
    Done,
    Failed,
    Canceled,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "QUEUED",
            JobState::Running => "RUNNING",
            JobState::Done => "DONE",
            JobState::Failed => "FAILED",
            JobState::Canceled => "CANCELED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed | JobState::Canceled)
    }

    /// Whether a transition from `self` to `to` is allowed by the state
    /// machine. No state ever leads back to `Queued`.
    pub fn can_transition_to(&self, to: JobState) -> bool {
        match (self, to) {
            (JobState::Queued, JobState::Running) => true,
            (JobState::Queued, JobState::Canceled) => true,
            (JobState::Running, JobState::Done) => true,
            (JobState::Running, JobState::Failed) => true,
            (JobState::Running, JobState::Canceled) => true,
            _ => false,
        }
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(JobState::Queued),
            "RUNNING" => Ok(JobState::Running),
            "DONE" => Ok(JobState::Done),
            "FAILED" => Ok(JobState::Failed),
            "CANCELED" => Ok(JobState::Canceled),
            _ => Err(format!("Invalid job state: {}", s)),
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
