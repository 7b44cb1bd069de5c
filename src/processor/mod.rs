//! Turns queued jobs into cache writes.
//!
//! A job fans out into a tree of tasks (stores, then their product pages)
//! executed by a [`pool::WorkerGroup`]. The processor waits for the whole
//! tree, keeps the first error, and records the outcome under the sync
//! status key either way.

mod executor;
pub mod pool;


pub use pool::{WorkerGroup, WorkerHandle};

use std::sync::Arc;

use chrono::Utc;
use tracing::error;

use crate::entities::{SyncOutcome, SyncStatus};
use crate::jobs::Job;
use crate::seeker::Seeker;
use crate::service::CatalogService;

use executor::Executor;

pub struct Processor {
    service: Arc<dyn CatalogService + Send + Sync>,
    seeker: Arc<dyn Seeker + Send + Sync>,
    worker_num: usize,
}

impl Processor {
    pub fn new(
        service: Arc<dyn CatalogService + Send + Sync>,
        seeker: Arc<dyn Seeker + Send + Sync>,
        worker_num: usize,
    ) -> Self {
        Self {
            service,
            seeker,
            worker_num,
        }
    }

    /// Runs one job to completion and returns the first error its task tree
    /// hit, after every task has finished. Success or not, the sync status
    /// record is rewritten; a failure to write it is logged and swallowed
    /// because it must not overwrite the job's own outcome.
    pub async fn process(&self, job: &Job) -> anyhow::Result<()> {
        let group = WorkerGroup::new(self.worker_num);
        let executor = Executor {
            service: self.service.clone(),
            seeker: self.seeker.clone(),
            handle: group.handle(),
        };

        match job.clone() {
            Job::ExternalKey(key) => group.fork(executor.sync_external_key(key)),
            Job::StoreId { external_key, id } => {
                group.fork(executor.sync_single_store(external_key, id))
            }
            Job::BrandId(id) => group.fork(executor.sync_brand_only(id)),
        }

        let result = group.wait().await;

        let status = SyncStatus {
            last_sync_time: Utc::now(),
            last_sync_status: if result.is_ok() {
                SyncOutcome::Success
            } else {
                SyncOutcome::Failed
            },
        };
        if let Err(err) = self.service.update_sync_status(&status).await {
            error!("Failed to record sync status: {err}");
        }

        result
    }
}
