use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use dubflow::application::ports::{JobRepository, ProgressNotifier};
use dubflow::application::services::{DubbingMessage, JobManager, PipelineExecutor};
use dubflow::infrastructure::media::MediaServiceFactory;
use dubflow::infrastructure::notify::EventLogNotifier;
use dubflow::infrastructure::observability::{TracingConfig, init_tracing};
use dubflow::infrastructure::persistence::{InMemoryJobRepository, PgJobRepository, create_pool};
use dubflow::infrastructure::storage::ArtifactStoreFactory;
use dubflow::presentation::config::JobStoreProviderSetting;
use dubflow::presentation::{AppState, Environment, Settings, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(anyhow::Error::msg)?;

    let settings = Settings::load(environment)?;

    init_tracing(
        TracingConfig {
            environment: environment.to_string(),
            default_level: settings.logging.level.clone(),
            json_format: settings.logging.enable_json,
        },
        settings.server.port,
    );

    let repository: Arc<dyn JobRepository> = match settings.jobs.provider {
        JobStoreProviderSetting::Memory => Arc::new(InMemoryJobRepository::new()),
        JobStoreProviderSetting::Postgres => {
            let pool = create_pool(&settings.jobs).await?;
            sqlx::migrate!().run(&pool).await?;
            Arc::new(PgJobRepository::new(pool))
        }
    };

    let jobs = Arc::new(JobManager::new(repository));
    let store = ArtifactStoreFactory::create(&settings.storage)?;
    let notifier: Arc<dyn ProgressNotifier> = Arc::new(EventLogNotifier::default());
    let services = MediaServiceFactory::create(&settings.media);

    let (dubbing_sender, dubbing_receiver) = mpsc::channel(settings.pipeline.queue_capacity);

    let executor = PipelineExecutor::new(
        dubbing_receiver,
        Arc::clone(&jobs),
        Arc::clone(&store),
        Arc::clone(&notifier),
        services,
        settings.pipeline.executor_config(),
    );

    let workers = settings.pipeline.workers.max(1);
    for _ in 0..workers {
        tokio::spawn(executor.clone().run());
    }
    tracing::info!(workers, "Pipeline workers spawned");

    // Jobs left running by a previous process resume from their last
    // recorded artifact.
    for job in jobs.recover_incomplete().await? {
        dubbing_sender.send(DubbingMessage::resume(job.id)).await?;
    }

    let state = AppState {
        jobs,
        store,
        notifier,
        dubbing_sender,
        settings: settings.clone(),
    };

    let router = create_router(state);

    let addr = SocketAddr::new(
        settings.server.host.parse()?,
        settings.server.port,
    );
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
