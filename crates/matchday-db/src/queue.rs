//! Redis-backed notification delay queue.
//!
//! Jobs live in a sorted set scored by their due time in epoch
//! milliseconds. The consumer polls for members whose score has passed,
//! claims each one with `ZREM` (only one consumer wins the removal), and
//! re-enqueues failed deliveries with a doubled delay until the attempt
//! budget is spent.
//!
//! Unlike the in-process queue this survives restarts: whatever was
//! scheduled before a crash is still in the sorted set afterwards.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use matchday_core::error::AppError;
use matchday_core::models::NotificationJob;
use matchday_core::queue::DeliveryPolicy;
use matchday_core::traits::NotificationQueue;
use matchday_core::InMemoryQueue;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Sorted set holding pending notification jobs.
const QUEUE_KEY: &str = "matchday:notifications";

/// How often the consumer polls for due jobs.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Jobs claimed per poll.
const CLAIM_BATCH: isize = 16;

fn redis_err(e: redis::RedisError) -> AppError {
    AppError::CacheError(e.to_string())
}

/// Wire format for queued jobs; `attempt` is the upcoming delivery attempt.
#[derive(Debug, Serialize, Deserialize)]
struct QueuedJob {
    job: NotificationJob,
    attempt: u32,
}

/// Sorted-set delay queue over Redis.
#[derive(Clone)]
pub struct RedisDelayQueue {
    conn: ConnectionManager,
    policy: DeliveryPolicy,
}

impl RedisDelayQueue {
    pub fn new(conn: ConnectionManager, policy: DeliveryPolicy) -> Self {
        Self { conn, policy }
    }

    async fn schedule(&self, job: NotificationJob, attempt: u32, delay: Duration) -> Result<(), AppError> {
        let due = Utc::now().timestamp_millis() + delay.as_millis() as i64;
        let member = serde_json::to_string(&QueuedJob { job, attempt })?;
        let mut conn = self.conn.clone();
        let _: () = conn.zadd(QUEUE_KEY, member, due).await.map_err(redis_err)?;
        Ok(())
    }

    /// Consumes due jobs until cancelled, handing each to `handler`.
    pub async fn process<H, Fut>(
        &self,
        handler: H,
        cancel: CancellationToken,
    ) -> Result<(), AppError>
    where
        H: Fn(NotificationJob) -> Fut + Send + Sync,
        Fut: Future<Output = Result<(), AppError>> + Send,
    {
        info!("redis notification consumer started");
        loop {
            if let Err(e) = self.drain_due(&handler).await {
                warn!(error = %e, "notification poll failed");
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
        info!("redis notification consumer stopped");
        Ok(())
    }

    async fn drain_due<H, Fut>(&self, handler: &H) -> Result<(), AppError>
    where
        H: Fn(NotificationJob) -> Fut + Send + Sync,
        Fut: Future<Output = Result<(), AppError>> + Send,
    {
        let now = Utc::now().timestamp_millis();
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn
            .zrangebyscore_limit(QUEUE_KEY, "-inf", now, 0, CLAIM_BATCH)
            .await
            .map_err(redis_err)?;

        for member in members {
            // ZREM claims the job: with several consumers only one removal
            // succeeds.
            let removed: i32 = conn
                .zrem(QUEUE_KEY, &member)
                .await
                .map_err(redis_err)?;
            if removed == 0 {
                continue;
            }

            let queued: QueuedJob = match serde_json::from_str(&member) {
                Ok(q) => q,
                Err(e) => {
                    error!(error = %e, "dropping malformed notification job");
                    continue;
                }
            };

            match handler(queued.job.clone()).await {
                Ok(()) => {
                    debug!(
                        reminder_id = %queued.job.reminder_id,
                        attempt = queued.attempt,
                        "notification delivered"
                    );
                }
                Err(e) if queued.attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(queued.attempt);
                    warn!(
                        reminder_id = %queued.job.reminder_id,
                        attempt = queued.attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "notification delivery failed, rescheduling"
                    );
                    self.schedule(queued.job, queued.attempt + 1, delay).await?;
                }
                Err(e) => {
                    error!(
                        reminder_id = %queued.job.reminder_id,
                        attempts = queued.attempt,
                        error = %e,
                        "notification dropped after exhausting delivery attempts"
                    );
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for RedisDelayQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RedisDelayQueue")
    }
}

impl NotificationQueue for RedisDelayQueue {
    async fn enqueue(&self, job: NotificationJob, delay: Duration) -> Result<(), AppError> {
        self.schedule(job, 1, delay).await
    }
}

/// Queue backend selected at startup: Redis when configured, otherwise the
/// in-process queue.
#[derive(Debug, Clone)]
pub enum QueueBackend {
    Redis(RedisDelayQueue),
    Memory(InMemoryQueue),
}

impl QueueBackend {
    /// Runs the backend's consumer loop until cancelled.
    pub async fn process<H, Fut>(
        &self,
        handler: H,
        cancel: CancellationToken,
    ) -> Result<(), AppError>
    where
        H: Fn(NotificationJob) -> Fut + Send + Sync,
        Fut: Future<Output = Result<(), AppError>> + Send,
    {
        match self {
            QueueBackend::Redis(queue) => queue.process(handler, cancel).await,
            QueueBackend::Memory(queue) => queue.process(handler, cancel).await,
        }
    }
}

impl NotificationQueue for QueueBackend {
    async fn enqueue(&self, job: NotificationJob, delay: Duration) -> Result<(), AppError> {
        match self {
            QueueBackend::Redis(queue) => queue.enqueue(job, delay).await,
            QueueBackend::Memory(queue) => queue.enqueue(job, delay).await,
        }
    }
}
