//! Integration tests for SyncErrorHandler.
//!
//! Time-sensitive tests use `start_paused` so the staged backoff delays
//! auto-advance instead of slowing the suite down.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::integration::common::MockStore;
use matchday_core::{AppError, RetryPolicy, SyncContext, SyncErrorHandler};
use tokio::time::{Duration, Instant};

const SPORT_ID: i32 = 1;

fn handler(store: &MockStore) -> SyncErrorHandler<MockStore> {
    SyncErrorHandler::new(store.clone(), RetryPolicy::default())
}

fn ctx() -> SyncContext {
    SyncContext::new(SPORT_ID, "Formula 1").with_endpoint("https://ergast.test/api/f1")
}

/// A network failure is retried until the operation succeeds.
#[tokio::test(start_paused = true)]
async fn test_network_errors_are_retried() {
    // Arrange
    let store = MockStore::new();
    let handler = handler(&store);
    let attempts = Arc::new(AtomicU32::new(0));

    // Act: fail twice with a network error, then succeed
    let result = handler
        .run(&ctx(), || {
            let attempts = attempts.clone();
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(AppError::NetworkError("connection reset".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

    // Assert
    assert_eq!(result.unwrap(), 2);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    // Both failed attempts were persisted, carrying the source identity
    let errors = store.sync_errors();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].error_type, "network");
    assert_eq!(errors[0].sport_name.as_deref(), Some("Formula 1"));
    assert_eq!(errors[0].endpoint.as_deref(), Some("https://ergast.test/api/f1"));
    assert_eq!(errors[1].attempt, 1);
    assert_eq!(errors[1].max_retries, 3);
}

/// Retries follow the staged delay table: 1s, then 5s, then 15s.
#[tokio::test(start_paused = true)]
async fn test_backoff_uses_staged_delays() {
    // Arrange
    let store = MockStore::new();
    let handler = handler(&store);
    let started = Instant::now();
    let offsets: Arc<Mutex<Vec<Duration>>> = Arc::new(Mutex::new(Vec::new()));

    // Act
    let _: Result<(), _> = handler
        .run(&ctx(), || {
            let offsets = offsets.clone();
            async move {
                offsets.lock().unwrap().push(started.elapsed());
                Err(AppError::NetworkError("connection reset".into()))
            }
        })
        .await;

    // Assert: attempts at t=0, 1s, 6s, 21s
    let offsets = offsets.lock().unwrap();
    assert_eq!(
        *offsets,
        vec![
            Duration::ZERO,
            Duration::from_secs(1),
            Duration::from_secs(6),
            Duration::from_secs(21),
        ]
    );
}

/// Non-network failures stop the cycle immediately, no matter how many
/// retries the policy allows.
#[tokio::test]
async fn test_api_errors_fail_fast() {
    // Arrange
    let store = MockStore::new();
    let handler = handler(&store);
    let attempts = Arc::new(AtomicU32::new(0));

    // Act
    let result: Result<(), _> = handler
        .run(&ctx(), || {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(AppError::RateLimitExceeded)
            }
        })
        .await;

    // Assert
    assert!(matches!(result, Err(AppError::RateLimitExceeded)));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(store.sync_errors().len(), 1);
    assert_eq!(store.sync_errors()[0].error_type, "api");
}

/// Retries are bounded: max_retries extra attempts, then the error
/// surfaces. Every failed attempt counts toward the disable threshold.
#[tokio::test(start_paused = true)]
async fn test_retries_are_exhausted() {
    // Arrange
    let store = MockStore::new();
    let handler = handler(&store);
    let attempts = Arc::new(AtomicU32::new(0));

    // Act
    let result: Result<(), _> = handler
        .run(&ctx(), || {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(AppError::Timeout(10))
            }
        })
        .await;

    // Assert: 1 initial + 3 retries
    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 4);
    assert_eq!(store.sync_errors().len(), 4);
    assert_eq!(handler.health(SPORT_ID).consecutive_errors, 4);
}

/// Ten consecutive failed attempts disable the source; a disabled source
/// rejects further runs without calling the operation.
#[tokio::test]
async fn test_source_disabled_after_threshold() {
    // Arrange
    let store = MockStore::new();
    let handler = handler(&store);

    // Act: 10 cycles that fail fast
    for _ in 0..10 {
        let _ = handler
            .run(&ctx(), || async { Err::<(), _>(AppError::ValidationError("bad feed".into())) })
            .await;
    }

    // Assert
    assert!(handler.is_disabled(SPORT_ID));
    let result = handler.run(&ctx(), || async { Ok(()) }).await;
    assert!(matches!(result, Err(AppError::SourceDisabled(id)) if id == SPORT_ID));

    // reset() re-enables the source
    handler.reset(SPORT_ID);
    assert!(!handler.is_disabled(SPORT_ID));
    assert!(handler.run(&ctx(), || async { Ok(()) }).await.is_ok());
}

/// Failed retry attempts within one cycle count toward the threshold, and
/// crossing it stops the retry loop even with retries left.
#[tokio::test(start_paused = true)]
async fn test_network_attempts_count_toward_disable() {
    // Arrange
    let store = MockStore::new();
    let handler = handler(&store);
    let attempts = Arc::new(AtomicU32::new(0));
    let failing_fetch = || {
        let attempts = attempts.clone();
        async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(AppError::NetworkError("connection reset".into()))
        }
    };

    // Act: persistent network failure, 4 attempts per full cycle
    for _ in 0..2 {
        let _ = handler.run(&ctx(), failing_fetch).await;
    }
    assert_eq!(handler.health(SPORT_ID).consecutive_errors, 8);
    let _ = handler.run(&ctx(), failing_fetch).await;

    // Assert: the third cycle stops at the threshold instead of burning
    // its full retry budget
    assert!(handler.is_disabled(SPORT_ID));
    assert_eq!(attempts.load(Ordering::SeqCst), 10);
    assert_eq!(handler.health(SPORT_ID).consecutive_errors, 10);
}

/// A successful cycle clears the consecutive failure counter, so sources
/// only get disabled by an unbroken failure streak.
#[tokio::test]
async fn test_success_resets_failure_streak() {
    // Arrange
    let store = MockStore::new();
    let handler = handler(&store);

    for _ in 0..9 {
        let _ = handler
            .run(&ctx(), || async { Err::<(), _>(AppError::ValidationError("bad feed".into())) })
            .await;
    }
    assert_eq!(handler.health(SPORT_ID).consecutive_errors, 9);

    // Act
    handler.run(&ctx(), || async { Ok(()) }).await.unwrap();

    // Assert
    assert_eq!(handler.health(SPORT_ID).consecutive_errors, 0);
    assert!(!handler.is_disabled(SPORT_ID));
}

/// Failure streaks are tracked per source.
#[tokio::test]
async fn test_health_is_per_source() {
    // Arrange
    let store = MockStore::new();
    let handler = handler(&store);

    // Act
    let _ = handler
        .run(&SyncContext::new(1, "Formula 1"), || async {
            Err::<(), _>(AppError::ValidationError("bad feed".into()))
        })
        .await;
    handler
        .run(&SyncContext::new(2, "Formula E"), || async { Ok(()) })
        .await
        .unwrap();

    // Assert
    assert_eq!(handler.health(1).consecutive_errors, 1);
    assert_eq!(handler.health(2).consecutive_errors, 0);
}
