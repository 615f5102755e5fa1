//! Integration tests for ReminderScheduler and InMemoryQueue.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::integration::common::{MockQueue, MockStore};
use matchday_core::models::{DueReminder, NotificationJob};
use matchday_core::traits::{EventStore, NotificationQueue};
use matchday_core::{AppError, DeliveryPolicy, InMemoryQueue, ReminderConfig, ReminderScheduler};

fn reminder(minutes_until_start: i64, minutes_before: i32) -> DueReminder {
    DueReminder {
        id: Uuid::new_v4(),
        event_id: Uuid::new_v4(),
        event_title: "Monaco Grand Prix".to_string(),
        start_time: Utc::now() + Duration::minutes(minutes_until_start),
        minutes_before,
        channel: "push".to_string(),
    }
}

/// A reminder inside the lookahead window is enqueued with a delay that
/// lands it `minutes_before` ahead of the event start.
#[tokio::test]
async fn test_upcoming_reminder_is_enqueued() {
    // Arrange: event in 90 minutes, remind 15 minutes before
    let store = MockStore::new();
    let queue = MockQueue::new();
    store.add_reminder(reminder(90, 15));
    let scheduler = ReminderScheduler::new(store, queue.clone(), ReminderConfig::default());

    // Act
    let enqueued = scheduler.schedule_due().await.unwrap();

    // Assert
    assert_eq!(enqueued, 1);
    let jobs = queue.jobs();
    assert_eq!(jobs.len(), 1);
    let (job, delay) = &jobs[0];
    assert_eq!(job.channel, "push");
    // Fire in ~75 minutes; allow slack for test execution time
    let secs = delay.as_secs();
    assert!((74 * 60..=75 * 60).contains(&secs), "delay was {}s", secs);
}

/// Reminders whose fire time has already passed are skipped, not
/// delivered late.
#[tokio::test]
async fn test_past_due_reminder_is_skipped() {
    // Arrange: event in 10 minutes, remind 15 minutes before - too late
    let store = MockStore::new();
    let queue = MockQueue::new();
    store.add_reminder(reminder(10, 15));
    let scheduler = ReminderScheduler::new(store, queue.clone(), ReminderConfig::default());

    // Act
    let enqueued = scheduler.schedule_due().await.unwrap();

    // Assert
    assert_eq!(enqueued, 0);
    assert!(queue.jobs().is_empty());
}

/// Events beyond the lookahead window are not considered yet.
#[tokio::test]
async fn test_lookahead_window_bounds_the_scan() {
    let store = MockStore::new();
    let queue = MockQueue::new();
    store.add_reminder(reminder(5 * 60, 15));
    let scheduler = ReminderScheduler::new(store, queue.clone(), ReminderConfig::default());

    let enqueued = scheduler.schedule_due().await.unwrap();

    assert_eq!(enqueued, 0);
}

/// A reminder already handed to the queue is not enqueued again on the
/// next scan pass, even while it is still pending in the store.
#[tokio::test]
async fn test_scan_passes_do_not_duplicate() {
    // Arrange
    let store = MockStore::new();
    let queue = MockQueue::new();
    store.add_reminder(reminder(90, 15));
    let scheduler = ReminderScheduler::new(store, queue.clone(), ReminderConfig::default());

    // Act
    scheduler.schedule_due().await.unwrap();
    let second_pass = scheduler.schedule_due().await.unwrap();

    // Assert
    assert_eq!(second_pass, 0);
    assert_eq!(queue.jobs().len(), 1);
}

/// Once a reminder is delivered it leaves the due list and its seen
/// entry is pruned, so the set does not grow without bound and a
/// re-armed reminder is picked up fresh.
#[tokio::test]
async fn test_delivered_reminders_are_pruned_from_seen_set() {
    // Arrange
    let store = MockStore::new();
    let queue = MockQueue::new();
    let r = reminder(90, 15);
    let reminder_id = r.id;
    store.add_reminder(r);
    let scheduler = ReminderScheduler::new(store.clone(), queue.clone(), ReminderConfig::default());

    // Act: enqueue, deliver, then an operator re-arms the reminder
    scheduler.schedule_due().await.unwrap();
    store.mark_reminder_sent(reminder_id).await.unwrap();
    scheduler.schedule_due().await.unwrap();
    store.rearm_reminder(reminder_id);
    let third_pass = scheduler.schedule_due().await.unwrap();

    // Assert: the re-armed reminder is enqueued again
    assert_eq!(third_pass, 1);
    assert_eq!(queue.jobs().len(), 2);
}

/// End-to-end through the in-memory queue: a delayed job reaches the
/// handler after its delay elapses.
#[tokio::test(start_paused = true)]
async fn test_in_memory_queue_delivers_after_delay() {
    // Arrange
    let queue = InMemoryQueue::default();
    let delivered = Arc::new(AtomicU32::new(0));
    let cancel = CancellationToken::new();

    let consumer = {
        let queue = queue.clone();
        let delivered = delivered.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            queue
                .process(
                    move |_job| {
                        let delivered = delivered.clone();
                        async move {
                            delivered.fetch_add(1, Ordering::SeqCst);
                            Ok(())
                        }
                    },
                    cancel,
                )
                .await
        })
    };

    let job = NotificationJob {
        reminder_id: Uuid::new_v4(),
        event_id: Uuid::new_v4(),
        event_title: "UFC 300".to_string(),
        channel: "email".to_string(),
    };

    // Act
    queue
        .enqueue(job, StdDuration::from_secs(60))
        .await
        .unwrap();
    tokio::time::sleep(StdDuration::from_secs(61)).await;

    // Assert
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
    cancel.cancel();
    consumer.await.unwrap().unwrap();
}

/// Failed deliveries are retried with doubling backoff and give up after
/// the configured number of attempts.
#[tokio::test(start_paused = true)]
async fn test_in_memory_queue_retries_then_drops() {
    // Arrange
    let queue = InMemoryQueue::new(DeliveryPolicy {
        max_attempts: 3,
        base_delay: StdDuration::from_secs(2),
    });
    let attempts = Arc::new(AtomicU32::new(0));
    let cancel = CancellationToken::new();

    let consumer = {
        let queue = queue.clone();
        let attempts = attempts.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            queue
                .process(
                    move |_job| {
                        let attempts = attempts.clone();
                        async move {
                            attempts.fetch_add(1, Ordering::SeqCst);
                            Err::<(), _>(AppError::Generic("smtp down".into()))
                        }
                    },
                    cancel,
                )
                .await
        })
    };

    let job = NotificationJob {
        reminder_id: Uuid::new_v4(),
        event_id: Uuid::new_v4(),
        event_title: "UFC 300".to_string(),
        channel: "email".to_string(),
    };

    // Act
    queue.enqueue(job, StdDuration::ZERO).await.unwrap();
    // 2s + 4s of backoff, plus slack
    tokio::time::sleep(StdDuration::from_secs(10)).await;

    // Assert
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    cancel.cancel();
    consumer.await.unwrap().unwrap();
}

/// Only one clone may consume the queue.
#[tokio::test]
async fn test_queue_single_consumer() {
    let queue = InMemoryQueue::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    // First consumer takes the receiver (and exits immediately, cancelled)
    queue
        .process(|_job| async { Ok(()) }, cancel.clone())
        .await
        .unwrap();

    // Second consumer is refused
    let result = queue.process(|_job| async { Ok(()) }, cancel).await;
    assert!(result.is_err());
}
