use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::{JobEvent, JobId};

/// Publishes the per-job progress stream. Pollers read the ordered log
/// (at-least-once); push consumers subscribe to the broadcast channel.
/// Event order within one job matches stage execution order; there is no
/// ordering guarantee across jobs.
#[async_trait]
pub trait ProgressNotifier: Send + Sync {
    async fn publish(&self, event: JobEvent);

    async fn events_for(&self, job_id: JobId) -> Vec<JobEvent>;

    fn subscribe(&self) -> broadcast::Receiver<JobEvent>;
}
