use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

use crate::entities::SyncStatus;
use crate::jobs::job::{self, CodecError, Job};

/// Redis-backed deduplicating job queue.
///
/// Pending jobs live in one set, so pushing an already-queued job is a
/// no-op and popping hands a job to exactly one consumer. There is no
/// visibility timeout and no ack: a popped job that fails is gone.
pub struct JobQueue {
    client: redis::Client,
    jobs_key: String,
    status_key: String,
    conn_timeout: Duration,
}

impl JobQueue {
    pub fn new(
        redis_url: &str,
        jobs_key: impl Into<String>,
        status_key: impl Into<String>,
        conn_timeout: Duration,
    ) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            jobs_key: jobs_key.into(),
            status_key: status_key.into(),
            conn_timeout,
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, QueueError> {
        match tokio::time::timeout(
            self.conn_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(conn) => Ok(conn?),
            Err(_) => Err(QueueError::ConnectTimeout(self.conn_timeout)),
        }
    }

    /// Queue a job. Idempotent for structurally equal jobs.
    pub async fn push_job(&self, job: &Job) -> Result<(), QueueError> {
        let member = job.encode()?;
        let mut conn = self.connection().await?;
        conn.sadd::<_, _, i64>(&self.jobs_key, member).await?;
        Ok(())
    }

    /// Take one pending job, or `QueueError::Empty` when there is none.
    ///
    /// `Empty` is the idle case of the poll loop, not a fault.
    pub async fn pop_job(&self) -> Result<Job, QueueError> {
        let mut conn = self.connection().await?;
        let member: Option<String> = conn.spop(&self.jobs_key).await?;
        match member {
            Some(raw) => Ok(Job::decode(&raw)?),
            None => Err(QueueError::Empty),
        }
    }

    /// Overwrite the last-sync record.
    pub async fn update_sync_status(&self, status: &SyncStatus) -> Result<(), QueueError> {
        let payload = job::encode_payload(status)?;
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(&self.status_key, payload).await?;
        Ok(())
    }

    /// Read the last-sync record, `None` when no sync has run yet.
    pub async fn get_sync_status(&self) -> Result<Option<SyncStatus>, QueueError> {
        let mut conn = self.connection().await?;
        let payload: Option<String> = conn.get(&self.status_key).await?;
        match payload {
            Some(raw) => Ok(Some(job::decode_payload(&raw)?)),
            None => Ok(None),
        }
    }

    /// Check Redis connectivity (for health checks).
    pub async fn ping(&self) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The jobs set is empty.
    #[error("no job queued")]
    Empty,

    #[error("redis command failed: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("redis connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("malformed queue payload: {0}")]
    Decode(#[from] CodecError),
}
