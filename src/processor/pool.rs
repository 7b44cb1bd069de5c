use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{Notify, Semaphore};

/// Capped fan-out with first-error capture.
///
/// `fork` never blocks: every task is spawned immediately and waits for one
/// of `worker_num` permits before its body runs. A running task can
/// therefore always fork sub-tasks, even when it holds the last permit.
/// `wait` resolves once every forked task has finished and yields the first
/// error any of them produced; later errors are dropped.
pub struct WorkerGroup {
    inner: Arc<GroupInner>,
}

/// Cloneable forking handle, for tasks that fan out further.
#[derive(Clone)]
pub struct WorkerHandle {
    inner: Arc<GroupInner>,
}

struct GroupInner {
    permits: Arc<Semaphore>,
    pending: AtomicUsize,
    done: Notify,
    first_err: Mutex<Option<anyhow::Error>>,
}

impl GroupInner {
    fn fork<F>(self: &Arc<Self>, task: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let inner = self.clone();
        let permits = self.permits.clone();
        tokio::spawn(async move {
            // The semaphore is never closed while tasks exist.
            let Ok(_permit) = permits.acquire_owned().await else {
                inner.finish_task();
                return;
            };
            if let Err(err) = task.await {
                let mut slot = inner.first_err.lock().unwrap_or_else(|e| e.into_inner());
                if slot.is_none() {
                    *slot = Some(err);
                }
            }
            inner.finish_task();
        });
    }

    fn finish_task(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.done.notify_one();
        }
    }
}

impl WorkerGroup {
    pub fn new(worker_num: usize) -> Self {
        Self {
            inner: Arc::new(GroupInner {
                permits: Arc::new(Semaphore::new(worker_num.max(1))),
                pending: AtomicUsize::new(0),
                done: Notify::new(),
                first_err: Mutex::new(None),
            }),
        }
    }

    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            inner: self.inner.clone(),
        }
    }

    pub fn fork<F>(&self, task: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.inner.fork(task);
    }

    /// Waits for every forked task, transitively, and returns the first
    /// captured error. Consuming `self` keeps the waiter unique: after this,
    /// only in-flight tasks can still fork.
    pub async fn wait(self) -> anyhow::Result<()> {
        loop {
            if self.inner.pending.load(Ordering::SeqCst) == 0 {
                break;
            }
            // notify_one leaves a permit behind when it races this await,
            // so the wakeup cannot be lost.
            self.inner.done.notified().await;
        }
        let mut slot = self.inner.first_err.lock().unwrap_or_else(|e| e.into_inner());
        match slot.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl WorkerHandle {
    pub fn fork<F>(&self, task: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.inner.fork(task);
    }
}
