use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;
use sqlx::{Pool, Postgres};
use tracing::{error, info};
use utoipa::ToSchema;

use crate::app_state::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    database: String,
    queue: String,
}

#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    responses(
        (status = 200, description = "Health check successful", body = HealthResponse),
        (status = 503, description = "Service unavailable")
    )
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let database = check_database_health(&state.db_pool).await;
    let queue = state.queue.ping().await;

    match (&database, &queue) {
        (Ok(()), Ok(())) => {
            info!("Health check passed");
            Ok(Json(HealthResponse {
                status: "OK".to_string(),
                database: "healthy".to_string(),
                queue: "healthy".to_string(),
            }))
        }
        _ => {
            if let Err(err) = &database {
                error!("Database health check failed: {err}");
            }
            if let Err(err) = &queue {
                error!("Queue health check failed: {err}");
            }
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

async fn check_database_health(pool: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").fetch_one(pool).await?;
    Ok(())
}

/// Bare liveness router for the worker's health listener. Nothing is
/// checked; answering at all is the signal.
pub fn liveness_router() -> Router {
    Router::new().route("/healthz", get(liveness))
}

async fn liveness() -> StatusCode {
    StatusCode::OK
}
