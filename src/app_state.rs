use crate::jobs::JobQueue;
use crate::service::{CatalogService, Service};
use sqlx::{Pool, Postgres};
use std::sync::Arc;

/// Credentials the sync trigger endpoints are gated behind.
#[derive(Clone)]
pub struct BasicAuthCredentials {
    pub user: String,
    pub password: String,
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn CatalogService + Send + Sync>,
    pub db_pool: Pool<Postgres>,
    pub queue: Arc<JobQueue>,
    pub basic_auth: BasicAuthCredentials,
}

impl AppState {
    pub fn new(pool: Pool<Postgres>, queue: Arc<JobQueue>, basic_auth: BasicAuthCredentials) -> Self {
        Self {
            service: Arc::new(Service::new(pool.clone(), queue.clone())),
            db_pool: pool,
            queue,
            basic_auth,
        }
    }
}
