//! In-process notification queue.
//!
//! Default queue backend when no Redis is configured. Delayed delivery is
//! implemented with a spawned sleep per job feeding an unbounded channel;
//! the consumer side processes jobs sequentially with a doubling-backoff
//! redelivery policy (3 attempts starting at 2 seconds).
//!
//! Jobs live only in process memory: a restart drops anything not yet
//! delivered. The reminder scheduler's periodic scan re-enqueues whatever
//! is still pending, which bounds the loss to one tick.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::models::NotificationJob;
use crate::traits::NotificationQueue;

/// Redelivery policy for failed notification jobs.
#[derive(Debug, Clone)]
pub struct DeliveryPolicy {
    /// Total delivery attempts per job.
    pub max_attempts: u32,
    /// Delay before the first redelivery; doubles on each further attempt.
    pub base_delay: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl DeliveryPolicy {
    /// Delay before redelivery attempt `attempt` (1-based retry count).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Channel-backed delayed queue.
///
/// Clones share the channel; exactly one clone may consume via
/// [`InMemoryQueue::process`].
#[derive(Debug, Clone)]
pub struct InMemoryQueue {
    tx: mpsc::UnboundedSender<NotificationJob>,
    rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<NotificationJob>>>>,
    policy: DeliveryPolicy,
}

impl InMemoryQueue {
    pub fn new(policy: DeliveryPolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(Some(rx))),
            policy,
        }
    }

    /// Consumes the queue until cancelled, handing each job to `handler`.
    ///
    /// Failed deliveries are retried per the [`DeliveryPolicy`]; a job that
    /// exhausts its attempts is dropped with an error log. Returns an error
    /// if another clone already consumes the queue.
    pub async fn process<H, Fut>(
        &self,
        handler: H,
        cancel: CancellationToken,
    ) -> Result<(), AppError>
    where
        H: Fn(NotificationJob) -> Fut + Send + Sync,
        Fut: Future<Output = Result<(), AppError>> + Send,
    {
        let mut rx = self
            .rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| AppError::Generic("notification queue is already consumed".into()))?;

        info!("notification queue consumer started");
        loop {
            let job = tokio::select! {
                _ = cancel.cancelled() => break,
                job = rx.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };
            self.deliver(&handler, job).await;
        }
        info!("notification queue consumer stopped");
        Ok(())
    }

    async fn deliver<H, Fut>(&self, handler: &H, job: NotificationJob)
    where
        H: Fn(NotificationJob) -> Fut + Send + Sync,
        Fut: Future<Output = Result<(), AppError>> + Send,
    {
        let mut attempt = 1;
        loop {
            match handler(job.clone()).await {
                Ok(()) => {
                    debug!(reminder_id = %job.reminder_id, attempt, "notification delivered");
                    return;
                }
                Err(e) if attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        reminder_id = %job.reminder_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "notification delivery failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        reminder_id = %job.reminder_id,
                        attempts = attempt,
                        error = %e,
                        "notification dropped after exhausting delivery attempts"
                    );
                    return;
                }
            }
        }
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new(DeliveryPolicy::default())
    }
}

impl NotificationQueue for InMemoryQueue {
    async fn enqueue(&self, job: NotificationJob, delay: Duration) -> Result<(), AppError> {
        if delay.is_zero() {
            return self
                .tx
                .send(job)
                .map_err(|_| AppError::Generic("notification queue is closed".into()));
        }

        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(job).is_err() {
                warn!("notification queue closed before delayed job became due");
            }
        });
        Ok(())
    }
}
