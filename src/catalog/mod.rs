//! HTTP surface of the cache: open read endpoints, basic-authed sync
//! triggers, and the probe-facing status endpoint.

pub mod dtos;
pub mod handlers;

use axum::{
    Router,
    routing::{get, post},
};

use crate::app_state::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/products",
            get(handlers::get_products).post(handlers::sync_products),
        )
        .route(
            "/api/v1/brands/{id}",
            get(handlers::get_brand).post(handlers::sync_brand),
        )
        .route("/api/v1/stores", get(handlers::get_stores))
        .route("/api/v1/stores/{id}", post(handlers::sync_store))
        .route("/api/v1/status", get(handlers::get_status))
        .with_state(state)
}
