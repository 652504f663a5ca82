mod artifact;
mod caption;
mod dub_config;
mod event;
mod job;
mod job_id;
mod job_state;
mod stage;

pub use artifact::ArtifactRef;
pub use caption::{CaptionEntry, CaptionError, CaptionTrack};
pub use dub_config::{DubConfig, Language, VoiceStyle};
pub use event::{JobEvent, JobEventKind};
pub use job::{Job, JobFailure};
pub use job_id::JobId;
pub use job_state::JobState;
pub use stage::{Stage, StageInput};
