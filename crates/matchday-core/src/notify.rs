//! Reminder scheduling for upcoming events.
//!
//! Every tick (30 minutes by default) the [`ReminderScheduler`] asks the
//! store for pending reminders whose event starts inside the lookahead
//! window (2 hours), computes how long until each reminder should fire,
//! and enqueues a delayed [`NotificationJob`] for it.
//!
//! Reminders whose fire time has already passed are skipped rather than
//! delivered late. A reminder stays `pending` in the store until the queue
//! consumer delivers it, so an in-flight reminder would reappear on the
//! next tick; a seen-set suppresses those duplicates. Delivered reminders
//! drop out of the due list, and each scan prunes the seen-set down to
//! the ids still due, so it never outgrows the lookahead window.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::NotificationJob;
use crate::traits::{EventStore, NotificationQueue};

/// Reminder scheduler tuning knobs.
#[derive(Debug, Clone)]
pub struct ReminderConfig {
    /// How often the pending-reminder scan runs.
    pub tick_interval: StdDuration,
    /// How far ahead of now to look for event starts.
    pub lookahead: Duration,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            tick_interval: StdDuration::from_secs(30 * 60),
            lookahead: Duration::hours(2),
        }
    }
}

/// Scans for due reminders and hands them to the notification queue.
#[derive(Debug, Clone)]
pub struct ReminderScheduler<S, Q> {
    store: S,
    queue: Q,
    config: ReminderConfig,
    scheduled: Arc<Mutex<HashSet<Uuid>>>,
}

impl<S: EventStore, Q: NotificationQueue> ReminderScheduler<S, Q> {
    pub fn new(store: S, queue: Q, config: ReminderConfig) -> Self {
        Self {
            store,
            queue,
            config,
            scheduled: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// One scan pass: enqueue every newly due reminder.
    ///
    /// Returns how many reminders were enqueued this pass.
    pub async fn schedule_due(&self) -> Result<usize, AppError> {
        let now = Utc::now();
        let until = now + self.config.lookahead;
        let reminders = self.store.due_reminders(until).await?;

        // Delivered reminders leave the due list; drop their seen entries
        // so the set only ever holds in-flight ids.
        let due_ids: HashSet<Uuid> = reminders.iter().map(|r| r.id).collect();
        self.scheduled.lock().unwrap().retain(|id| due_ids.contains(id));

        let mut enqueued = 0;
        for reminder in reminders {
            if self.scheduled.lock().unwrap().contains(&reminder.id) {
                continue;
            }

            let fire_at = reminder.fire_at();
            if fire_at <= now {
                debug!(
                    reminder_id = %reminder.id,
                    event = %reminder.event_title,
                    "reminder fire time already passed, skipping"
                );
                continue;
            }

            // to_std cannot fail here, fire_at is in the future
            let delay = (fire_at - now).to_std().unwrap_or(StdDuration::ZERO);
            let job = NotificationJob {
                reminder_id: reminder.id,
                event_id: reminder.event_id,
                event_title: reminder.event_title.clone(),
                channel: reminder.channel.clone(),
            };

            match self.queue.enqueue(job, delay).await {
                Ok(()) => {
                    self.scheduled.lock().unwrap().insert(reminder.id);
                    debug!(
                        reminder_id = %reminder.id,
                        event = %reminder.event_title,
                        delay_secs = delay.as_secs(),
                        "reminder enqueued"
                    );
                    enqueued += 1;
                }
                Err(e) => {
                    warn!(reminder_id = %reminder.id, error = %e, "failed to enqueue reminder");
                }
            }
        }

        if enqueued > 0 {
            info!(enqueued, "reminder scan complete");
        }
        Ok(enqueued)
    }

    /// Runs the scan loop until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            tick_secs = self.config.tick_interval.as_secs(),
            lookahead_mins = self.config.lookahead.num_minutes(),
            "reminder scheduler started"
        );
        loop {
            if let Err(e) = self.schedule_due().await {
                warn!(error = %e, "reminder scan failed");
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.tick_interval) => {}
            }
        }
        info!("reminder scheduler stopped");
    }
}
