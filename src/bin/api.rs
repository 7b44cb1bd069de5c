use std::sync::Arc;

use anyhow::Result;
use axum::{Router, routing::get};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use catalog_cache::{
    app_state::{AppState, BasicAuthCredentials},
    catalog,
    config::Config,
    entities::{Brand, Product, Store, SyncOutcome, SyncStatus},
    health,
    jobs::{AutoExec, JobQueue},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        catalog_cache::catalog::handlers::get_products,
        catalog_cache::catalog::handlers::sync_products,
        catalog_cache::catalog::handlers::get_brand,
        catalog_cache::catalog::handlers::sync_brand,
        catalog_cache::catalog::handlers::get_stores,
        catalog_cache::catalog::handlers::sync_store,
        catalog_cache::catalog::handlers::get_status,
        catalog_cache::health::health_check,
    ),
    components(schemas(Store, Brand, Product, SyncStatus, SyncOutcome)),
    tags(
        (name = "catalog", description = "Cached catalog reads"),
        (name = "sync", description = "Sync job triggers"),
        (name = "status", description = "Sync status record"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

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

    let state = AppState::new(
        pool,
        queue,
        BasicAuthCredentials {
            user: config.basic_auth_user().to_string(),
            password: config.basic_auth_pwd().to_string(),
        },
    );

    // Periodic full-catalog refresh, running for as long as the server does.
    let autoexec = AutoExec::start(state.service.clone(), config.autoexec_period());

    let app = catalog::api_router(state.clone())
        .merge(
            Router::new()
                .route("/healthz", get(health::health_check))
                .with_state(state),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

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

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!("Catalog API listening on {}", config.bind_addr());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;

    autoexec.close().await;
    info!("Catalog API stopped");
    Ok(())
}
