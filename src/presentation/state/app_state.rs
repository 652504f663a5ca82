use std::sync::Arc;

use tokio::sync::mpsc;

use crate::application::ports::{ArtifactStore, ProgressNotifier};
use crate::application::services::{DubbingMessage, JobManager};
use crate::presentation::config::Settings;

#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobManager>,
    pub store: Arc<dyn ArtifactStore>,
    pub notifier: Arc<dyn ProgressNotifier>,
    pub dubbing_sender: mpsc::Sender<DubbingMessage>,
    pub settings: Settings,
}
