//! Integration tests for SyncScheduler.

use crate::integration::common::{
    MockCache, MockLock, MockSource, MockStore, event, payload, source_entry, team,
};
use matchday_core::scheduler::{last_run_key, lock_key};
use matchday_core::{
    AppError, ReconcileService, RetryPolicy, SchedulerConfig, SyncErrorHandler, SyncLock,
    SyncScheduler,
};

const SPORT_ID: i32 = 1;

type TestScheduler = SyncScheduler<MockStore, MockSource, MockCache, MockLock>;

struct Fixture {
    store: MockStore,
    cache: MockCache,
    lock: MockLock,
    scheduler: TestScheduler,
}

fn fixture(source: MockSource) -> Fixture {
    let store = MockStore::new();
    let cache = MockCache::new();
    let lock = MockLock::new();
    let mut scheduler = SyncScheduler::new(
        ReconcileService::new(store.clone()),
        SyncErrorHandler::new(store.clone(), RetryPolicy::default()),
        cache.clone(),
        lock.clone(),
        SchedulerConfig::default(),
    );
    scheduler
        .add_source(source_entry(SPORT_ID, "Formula 1"), source)
        .unwrap();
    Fixture {
        store,
        cache,
        lock,
        scheduler,
    }
}

fn sample_source() -> MockSource {
    MockSource::ok(payload(
        vec![team("mclaren", "McLaren")],
        vec![event("2026-silverstone", "British Grand Prix", 36)],
    ))
}

/// run_once performs a full fetch-reconcile cycle, records lastRun, and
/// releases the lock.
#[tokio::test]
async fn test_run_once_happy_path() {
    // Arrange
    let f = fixture(sample_source());

    // Act
    let report = f.scheduler.run_once(SPORT_ID).await.unwrap();

    // Assert
    assert_eq!(report.teams.created, 1);
    assert_eq!(report.events.created, 1);
    assert!(f.store.get_event(SPORT_ID, "2026-silverstone").is_some());
    assert!(f.cache.peek(&last_run_key(SPORT_ID)).is_some());
    assert!(!f.lock.is_held(&lock_key(SPORT_ID)).await.unwrap());
}

/// When another process holds the lock the cycle is refused, and the
/// foreign lock stays in place.
#[tokio::test]
async fn test_run_once_respects_foreign_lock() {
    // Arrange
    let f = fixture(sample_source());
    f.lock.hold(&lock_key(SPORT_ID));

    // Act
    let result = f.scheduler.run_once(SPORT_ID).await;

    // Assert
    assert!(matches!(result, Err(AppError::SyncInProgress(id)) if id == SPORT_ID));
    assert!(f.lock.is_held(&lock_key(SPORT_ID)).await.unwrap());
    assert!(f.store.get_event(SPORT_ID, "2026-silverstone").is_none());
}

/// The lock is released even when the cycle fails.
#[tokio::test]
async fn test_lock_released_on_failure() {
    // Arrange
    let source = MockSource::failing_then_ok(
        99,
        || AppError::ValidationError("bad feed".into()),
        payload(vec![], vec![]),
    );
    let f = fixture(source);

    // Act
    let result = f.scheduler.run_once(SPORT_ID).await;

    // Assert
    assert!(result.is_err());
    assert!(!f.lock.is_held(&lock_key(SPORT_ID)).await.unwrap());
}

/// Unknown sport ids are rejected up front.
#[tokio::test]
async fn test_run_once_unknown_source() {
    let f = fixture(sample_source());
    let result = f.scheduler.run_once(99).await;
    assert!(matches!(result, Err(AppError::SourceNotFound(_))));
}

/// Sources disabled in config cannot be run, manually or otherwise.
#[tokio::test]
async fn test_disabled_source_rejected() {
    // Arrange
    let store = MockStore::new();
    let mut scheduler = SyncScheduler::new(
        ReconcileService::new(store.clone()),
        SyncErrorHandler::new(store.clone(), RetryPolicy::default()),
        MockCache::new(),
        MockLock::new(),
        SchedulerConfig::default(),
    );
    let mut entry = source_entry(SPORT_ID, "Formula 1");
    entry.enabled = false;
    scheduler.add_source(entry, sample_source()).unwrap();

    // Act / Assert
    assert!(matches!(
        scheduler.run_once(SPORT_ID).await,
        Err(AppError::SourceDisabled(_))
    ));
    assert!(matches!(
        scheduler.trigger(SPORT_ID).await,
        Err(AppError::SourceDisabled(_))
    ));
}

/// An invalid cron expression is rejected at registration time.
#[tokio::test]
async fn test_add_source_validates_schedule() {
    let store = MockStore::new();
    let mut scheduler: TestScheduler = SyncScheduler::new(
        ReconcileService::new(store.clone()),
        SyncErrorHandler::new(store, RetryPolicy::default()),
        MockCache::new(),
        MockLock::new(),
        SchedulerConfig::default(),
    );
    let mut entry = source_entry(SPORT_ID, "Formula 1");
    entry.schedule = "whenever".to_string();

    let result = scheduler.add_source(entry, sample_source());
    assert!(matches!(result, Err(AppError::InvalidSchedule(_, _))));
}

/// trigger() takes the lock synchronously and reports a conflict
/// immediately; the cycle itself completes in the background.
#[tokio::test]
async fn test_trigger_runs_in_background() {
    // Arrange
    let f = fixture(sample_source());

    // Act
    f.scheduler.trigger(SPORT_ID).await.unwrap();

    // A second trigger while the first holds the lock is a conflict
    let second = f.scheduler.trigger(SPORT_ID).await;
    assert!(matches!(second, Err(AppError::SyncInProgress(_))));

    // Let the spawned cycle finish
    for _ in 0..100 {
        tokio::task::yield_now().await;
        if !f.lock.is_held(&lock_key(SPORT_ID)).await.unwrap() {
            break;
        }
    }

    // Assert
    assert!(f.store.get_event(SPORT_ID, "2026-silverstone").is_some());
    assert!(!f.lock.is_held(&lock_key(SPORT_ID)).await.unwrap());
}

/// status() reflects lastRun, the lock, and the stored event count.
#[tokio::test]
async fn test_status_reports_sources() {
    // Arrange
    let f = fixture(sample_source());
    f.scheduler.run_once(SPORT_ID).await.unwrap();

    // Act
    let statuses = f.scheduler.status().await.unwrap();

    // Assert
    assert_eq!(statuses.len(), 1);
    let status = &statuses[0];
    assert_eq!(status.sport_id, SPORT_ID);
    assert_eq!(status.name, "Formula 1");
    assert!(status.enabled);
    assert!(status.last_run.is_some());
    assert!(!status.is_running);
    assert_eq!(status.event_count, 1);
}

/// The startup pass syncs every enabled source sequentially and keeps
/// going past a failing one.
#[tokio::test]
async fn test_initial_sync_continues_past_failures() {
    // Arrange
    let store = MockStore::new();
    let mut scheduler = SyncScheduler::new(
        ReconcileService::new(store.clone()),
        SyncErrorHandler::new(store.clone(), RetryPolicy::default()),
        MockCache::new(),
        MockLock::new(),
        SchedulerConfig::default(),
    );
    let broken = MockSource::failing_then_ok(
        99,
        || AppError::ValidationError("bad feed".into()),
        payload(vec![], vec![]),
    );
    let healthy = MockSource::ok(payload(
        vec![],
        vec![event("ufc-300", "UFC 300", 200)],
    ));
    scheduler
        .add_source(source_entry(1, "Broken"), broken)
        .unwrap();
    scheduler
        .add_source(source_entry(2, "UFC"), healthy)
        .unwrap();

    // Act
    scheduler.initial_sync().await;

    // Assert
    assert!(store.get_event(2, "ufc-300").is_some());
}
