use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use catalog_cache::{
    config::Config,
    health,
    jobs::JobQueue,
    processor::Processor,
    seeker::HttpSeeker,
    service::{CatalogService, Service},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = Config::from_env()?;

    info!("Connecting to PostgreSQL");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections())
        .connect(config.database_url())
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let queue = Arc::new(JobQueue::new(
        config.redis_url(),
        config.queue_jobs_key(),
        config.queue_status_key(),
        config.queue_conn_timeout(),
    )?);
    let service: Arc<dyn CatalogService + Send + Sync> = Arc::new(Service::new(pool, queue));
    let seeker = Arc::new(HttpSeeker::new(
        config.seeker_base_url(),
        config.seeker_timeout(),
        config.seeker_retry_times(),
        config.seeker_retry_period(),
    )?);
    let processor = Processor::new(service.clone(), seeker, config.sync_worker_num());

    let token = CancellationToken::new();
    let shutdown_token = token.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal, initiating graceful shutdown...");
        shutdown_token.cancel();
    });

    // Liveness endpoint for the orchestrator's probes.
    let health_listener = tokio::net::TcpListener::bind(config.health_bind_addr()).await?;
    info!("Worker liveness endpoint on {}", config.health_bind_addr());
    let health_token = token.clone();
    let health_server = tokio::spawn(async move {
        if let Err(e) = axum::serve(health_listener, health::liveness_router())
            .with_graceful_shutdown(async move { health_token.cancelled().await })
            .await
        {
            error!("Liveness endpoint failed: {}", e);
        }
    });

    info!("Worker ready, polling for sync jobs");
    let period = config.sync_poll_period();
    let mut poll = time::interval_at(time::Instant::now() + period, period);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                info!("Worker shutting down");
                break;
            }
            _ = poll.tick() => {
                match service.pop_job().await {
                    Ok(job) => {
                        info!("Received {job:?}");
                        if let Err(err) = processor.process(&job).await {
                            error!("Sync failed: {err:#}");
                        }
                    }
                    // An empty queue is the idle case, not a fault.
                    Err(err) if err.is_queue_empty() => {}
                    Err(err) => error!("Failed to pop job: {err}"),
                }
            }
        }
    }

    let _ = health_server.await;
    Ok(())
}
