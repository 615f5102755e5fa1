//! Trait definitions for external dependencies.
//!
//! This module defines traits that abstract over external dependencies
//! (sport feed adapters, the catalog store, Redis), enabling:
//!
//! - **Testability**: Mock implementations for unit testing
//! - **Flexibility**: Different backends (Postgres vs in-memory, Redis vs none)
//! - **Decoupling**: The sync engine doesn't depend on specific implementations
//!
//! Redis is optional at runtime: [`NoopCache`] and [`NoopLock`] stand in when
//! no Redis URL is configured, degrading to cache misses and always-granted
//! locks within a single process.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    ApiSnapshot, CanonicalEvent, CanonicalTeam, DueReminder, NewSnapshot, NotificationJob,
    StoredEvent, StoredTeam, SyncErrorRecord,
};

/// Payload returned by one upstream fetch: the normalized rows plus the raw
/// response body kept for snapshotting.
#[derive(Debug, Clone)]
pub struct SourcePayload {
    pub teams: Vec<CanonicalTeam>,
    pub events: Vec<CanonicalEvent>,
    /// Raw upstream body, persisted as a diagnostic snapshot.
    pub raw: serde_json::Value,
    /// Endpoint the payload came from.
    pub endpoint: String,
}

/// Adapter over one upstream sport API.
///
/// Implementations fetch the upstream schedule and normalize it into
/// canonical teams and events. A fetch that succeeds but finds nothing
/// returns empty vectors; upstream failures are errors so the retry
/// machinery can classify them.
pub trait SportsSource: Send + Sync + Clone {
    /// Fetches and normalizes the current upstream schedule for a sport.
    fn fetch(&self, sport_id: i32)
        -> impl Future<Output = Result<SourcePayload, AppError>> + Send;

    /// Nominal upstream endpoint this adapter talks to, recorded with
    /// sync failures.
    fn endpoint(&self) -> String;
}

/// Store for the sports catalog.
///
/// Reconciliation works row-at-a-time: find by external id, then insert or
/// update. Implementations back this with Postgres in production and a
/// HashMap in tests.
pub trait EventStore: Send + Sync + Clone {
    fn find_team(
        &self,
        sport_id: i32,
        external_id: &str,
    ) -> impl Future<Output = Result<Option<StoredTeam>, AppError>> + Send;

    fn insert_team(
        &self,
        sport_id: i32,
        team: &CanonicalTeam,
    ) -> impl Future<Output = Result<StoredTeam, AppError>> + Send;

    fn update_team(
        &self,
        id: i32,
        team: &CanonicalTeam,
    ) -> impl Future<Output = Result<StoredTeam, AppError>> + Send;

    fn find_event(
        &self,
        sport_id: i32,
        external_id: &str,
    ) -> impl Future<Output = Result<Option<StoredEvent>, AppError>> + Send;

    fn insert_event(
        &self,
        sport_id: i32,
        event: &CanonicalEvent,
        parent_id: Option<Uuid>,
        team_ids: &[i32],
    ) -> impl Future<Output = Result<StoredEvent, AppError>> + Send;

    /// Refreshes an event row and its participant links.
    fn update_event(
        &self,
        id: Uuid,
        event: &CanonicalEvent,
        parent_id: Option<Uuid>,
        team_ids: &[i32],
    ) -> impl Future<Output = Result<StoredEvent, AppError>> + Send;

    /// Number of events currently stored for a sport.
    fn event_count(&self, sport_id: i32) -> impl Future<Output = Result<i64, AppError>> + Send;

    /// Persists one failed sync attempt for later inspection.
    fn insert_sync_error(
        &self,
        record: &SyncErrorRecord,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Appends a raw upstream response snapshot. The snapshot log keeps
    /// one row per cycle; expiry bounds its growth.
    fn insert_snapshot(
        &self,
        snapshot: &NewSnapshot,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Recent unexpired snapshots for a sport, newest first.
    fn recent_snapshots(
        &self,
        sport_id: i32,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<ApiSnapshot>, AppError>> + Send;

    /// Pending reminders whose event starts within the lookahead window.
    fn due_reminders(
        &self,
        until: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<DueReminder>, AppError>> + Send;

    fn mark_reminder_sent(
        &self,
        reminder_id: Uuid,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Small string cache with per-key TTL.
///
/// Used for upstream response caching (`api:{sport}:...` keys) and for the
/// per-source `lastRun` markers.
pub trait KeyValueCache: Send + Sync + Clone {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, AppError>> + Send;

    /// Sets a value; `ttl_secs = None` means no expiry.
    fn set(
        &self,
        key: &str,
        value: &str,
        ttl_secs: Option<u64>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Distributed mutual exclusion for sync cycles.
///
/// `acquire` must be atomic set-if-absent with expiry so a crashed holder
/// cannot wedge a source forever.
pub trait SyncLock: Send + Sync + Clone {
    /// Attempts to take the lock. Returns false if it is already held.
    fn acquire(
        &self,
        key: &str,
        ttl_secs: u64,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    fn release(&self, key: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    fn is_held(&self, key: &str) -> impl Future<Output = Result<bool, AppError>> + Send;
}

/// Delayed delivery queue for reminder notifications.
pub trait NotificationQueue: Send + Sync + Clone {
    /// Schedules a job for delivery after `delay`.
    fn enqueue(
        &self,
        job: NotificationJob,
        delay: std::time::Duration,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

// =============================================================================
// No-op backends
// =============================================================================

/// Cache backend that stores nothing. Every lookup is a miss.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl KeyValueCache for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, AppError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_secs: Option<u64>) -> Result<(), AppError> {
        Ok(())
    }
}

/// Lock backend that always grants.
///
/// Correct only for single-process deployments; the scheduler's own task
/// structure already prevents overlapping runs in-process.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLock;

impl SyncLock for NoopLock {
    async fn acquire(&self, _key: &str, _ttl_secs: u64) -> Result<bool, AppError> {
        Ok(true)
    }

    async fn release(&self, _key: &str) -> Result<(), AppError> {
        Ok(())
    }

    async fn is_held(&self, _key: &str) -> Result<bool, AppError> {
        Ok(false)
    }
}
