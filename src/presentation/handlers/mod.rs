mod artifact_download;
mod cancel;
mod health;
mod job_events;
mod job_status;
mod upload;

pub use artifact_download::artifact_download_handler;
pub use cancel::cancel_handler;
pub use health::health_handler;
pub use job_events::job_events_handler;
pub use job_status::job_status_handler;
pub use upload::upload_handler;
