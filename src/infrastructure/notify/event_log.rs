use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use crate::application::ports::ProgressNotifier;
use crate::domain::{JobEvent, JobId};

/// Progress notifier backed by an in-process ordered log per job plus a
/// broadcast channel. The log serves polling clients (at-least-once:
/// re-reads see every event again); the channel serves push consumers
/// such as the upload handler waiting for a terminal event. A slow
/// subscriber can lag off the channel, but the log keeps the full
/// ordered history.
pub struct EventLogNotifier {
    log: RwLock<HashMap<Uuid, Vec<JobEvent>>>,
    sender: broadcast::Sender<JobEvent>,
}

impl EventLogNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            log: RwLock::new(HashMap::new()),
            sender,
        }
    }
}

impl Default for EventLogNotifier {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl ProgressNotifier for EventLogNotifier {
    async fn publish(&self, event: JobEvent) {
        tracing::debug!(
            job_id = %event.job_id,
            stage = event.stage.map(|s| s.as_str()).unwrap_or("-"),
            kind = event.kind.as_str(),
            "Job event"
        );

        {
            let mut log = self.log.write().await;
            log.entry(event.job_id.as_uuid())
                .or_default()
                .push(event.clone());
        }

        // Nobody listening is fine; the log is the durable view.
        let _ = self.sender.send(event);
    }

    async fn events_for(&self, job_id: JobId) -> Vec<JobEvent> {
        self.log
            .read()
            .await
            .get(&job_id.as_uuid())
            .cloned()
            .unwrap_or_default()
    }

    fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }
}
