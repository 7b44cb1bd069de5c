use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span};

use crate::jobs::Job;
use crate::service::CatalogService;

/// Periodic self-trigger. Every period it queues one external-key sync job
/// per distinct key the cache has already seen, so the whole catalog
/// refreshes without outside traffic.
pub struct AutoExec {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl AutoExec {
    /// Starts the background ticker. The first run fires one period in, not
    /// at startup.
    pub fn start(service: Arc<dyn CatalogService + Send + Sync>, period: Duration) -> Self {
        let token = CancellationToken::new();
        let run_token = token.clone();
        let handle = tokio::spawn(
            async move {
                let mut ticker = time::interval_at(time::Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = run_token.cancelled() => {
                            info!("Auto exec shutting down");
                            break;
                        }
                        _ = ticker.tick() => exec(service.as_ref()).await,
                    }
                }
            }
            .instrument(info_span!("autoexec")),
        );
        Self { token, handle }
    }

    /// Stops future ticks and waits for the background task. A run already
    /// in flight finishes its pushes first.
    pub async fn close(self) {
        self.token.cancel();
        if let Err(err) = self.handle.await {
            error!("Auto exec task failed to shut down cleanly: {err}");
        }
    }
}

/// One trigger pass. A push failure is logged and the remaining keys still
/// get their jobs.
async fn exec(service: &(dyn CatalogService + Send + Sync)) {
    let keys = match service.get_external_keys().await {
        Ok(keys) => keys,
        Err(err) => {
            error!("Failed to list external keys: {err}");
            return;
        }
    };

    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key.clone()) {
            continue;
        }
        if let Err(err) = service.push_job(&Job::ExternalKey(key.clone())).await {
            error!("Failed to queue sync for external key {key:?}: {err}");
        }
    }
    debug!("Queued sync for {} distinct external keys", seen.len());
}
