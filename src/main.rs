use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, bail};
use futures::future::join_all;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use rowstream::application::ports::{JobQueue, JobRepository, RowErrorRepository};
use rowstream::application::services::{
    Dispatcher, RowOutcomeRecorder, StreamProcessor, spawn_consumers,
};
use rowstream::infrastructure::observability::init_tracing;
use rowstream::infrastructure::parsing::CsvRowSource;
use rowstream::infrastructure::persistence::{
    InMemoryJobRepository, InMemoryRowErrorRepository, PgJobRepository, PgRowErrorRepository,
    create_pool, run_migrations,
};
use rowstream::infrastructure::queue::{InMemoryJobQueue, PgJobQueue};
use rowstream::infrastructure::storage::LocalUploadStore;
use rowstream::infrastructure::validation::create_row_hook;
use rowstream::presentation::config::BackendSetting;
use rowstream::presentation::{AppState, Environment, Settings, create_router};

struct Queue {
    port: Arc<dyn JobQueue>,
    close: Box<dyn Fn() + Send + Sync>,
}

fn build_queue(settings: &Settings, pool: Option<&PgPool>) -> anyhow::Result<Queue> {
    match settings.queue.backend {
        BackendSetting::Postgres => {
            let Some(pool) = pool else {
                bail!("queue.backend = postgres requires database.backend = postgres");
            };
            let queue = Arc::new(
                PgJobQueue::new(pool.clone(), settings.queue.name.clone())
                    .with_poll_interval(settings.queue.poll_interval())
                    .with_visibility_timeout(settings.queue.visibility_timeout()),
            );
            let closer = Arc::clone(&queue);
            Ok(Queue {
                port: queue,
                close: Box::new(move || closer.close()),
            })
        }
        BackendSetting::InMemory => {
            let queue = InMemoryJobQueue::new().with_settled_capacity(0);
            let closer = queue.clone();
            Ok(Queue {
                port: Arc::new(queue),
                close: Box::new(move || closer.close()),
            })
        }
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("Failed to load configuration")?;

    init_tracing(&settings.logging.tracing_config(environment));
    tracing::info!(
        environment = %environment,
        mode = ?settings.app.mode,
        database = ?settings.database.backend,
        queue = ?settings.queue.backend,
        "Application starting"
    );

    let pool = match settings.database.backend {
        BackendSetting::Postgres => {
            let pool = create_pool(&settings.database.url, settings.database.max_connections)
                .await
                .context("Failed to connect to database")?;
            if settings.database.run_migrations {
                run_migrations(&pool).await?;
            }
            Some(pool)
        }
        BackendSetting::InMemory => None,
    };

    let (job_repository, row_error_repository): (
        Arc<dyn JobRepository>,
        Arc<dyn RowErrorRepository>,
    ) = match &pool {
        Some(pool) => (
            Arc::new(
                PgJobRepository::new(pool.clone())
                    .with_vocabulary(settings.processing.status_vocabulary),
            ),
            Arc::new(PgRowErrorRepository::new(pool.clone())),
        ),
        None => (
            Arc::new(InMemoryJobRepository::new()),
            Arc::new(InMemoryRowErrorRepository::new()),
        ),
    };

    let queue = build_queue(&settings, pool.as_ref())?;
    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let mut consumers = Vec::new();
    if settings.app.mode.runs_workers() {
        let recorder = RowOutcomeRecorder::new(
            create_row_hook(&settings.validation.required_columns),
            Arc::clone(&row_error_repository),
        )
        .with_raw_rows(settings.processing.capture_raw_rows);
        let processor = Arc::new(StreamProcessor::new(
            Arc::clone(&job_repository),
            Arc::new(CsvRowSource::new()),
            recorder,
            settings.processing.stream_processor_config(),
        ));
        consumers = spawn_consumers(
            settings.worker.consumers,
            Arc::clone(&queue.port),
            processor,
            shutdown.clone(),
        );
        tracing::info!(consumers = consumers.len(), "Workers started");
    }

    if settings.app.mode.serves_http() {
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&job_repository),
            Arc::clone(&queue.port),
            settings.dispatch.dispatcher_config(),
        ));
        let state = AppState {
            job_repository,
            row_error_repository,
            upload_store: Arc::new(LocalUploadStore::new(settings.storage.upload_dir.clone())?),
            dispatcher,
            upload_dir: settings.storage.upload_dir.clone(),
            vocabulary: settings.processing.status_vocabulary,
        };

        let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
            .parse()
            .context("Invalid server address")?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        axum::serve(listener, create_router(state))
            .with_graceful_shutdown(shutdown.clone().cancelled_owned())
            .await?;
    } else {
        shutdown.cancelled().await;
    }

    (queue.close)();
    for result in join_all(consumers).await {
        if let Err(e) = result {
            tracing::error!(error = %e, "Consumer task panicked");
        }
    }
    if let Some(pool) = pool {
        pool.close().await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
