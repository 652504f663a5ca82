mod job_manager;
mod pipeline_executor;
mod stage_signature;

pub use job_manager::{JobManager, JobManagerError};
pub use pipeline_executor::{
    DubbingMessage, ExecutorConfig, MediaServices, PipelineExecutor,
};
pub use stage_signature::stage_signature;
