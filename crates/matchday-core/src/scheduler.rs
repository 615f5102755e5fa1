//! Cron-driven sync scheduling with distributed locking.
//!
//! This module provides the [`SyncScheduler`] that owns the configured
//! sources and runs a sync cycle for each of them on its cron schedule.
//!
//! # Architecture
//!
//! Each enabled source gets its own task:
//! ```text
//! loop {
//!     1. Compute next cron fire time
//!     2. Sleep until then (or shutdown)
//!     3. Acquire the source's distributed lock
//!     4. Fetch + reconcile under the retry policy
//!     5. Record lastRun, release the lock
//! }
//! ```
//!
//! # Distributed lock
//!
//! Before a cycle runs, the scheduler takes `sync:{sport_id}:lock` with a
//! 300 second TTL. If the lock is held - by this process or another replica -
//! the cycle is skipped. The TTL bounds how long a crashed holder can block
//! a source.
//!
//! # Startup
//!
//! On startup the scheduler runs one sequential pass over all enabled
//! sources so a fresh deployment has data before the first cron fire.
//!
//! # Graceful Shutdown
//!
//! [`SyncScheduler::run`] reacts to a `CancellationToken`: sleeping tasks
//! wake and exit, an in-flight cycle finishes and releases its lock.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::SourceEntry;
use crate::error::AppError;
use crate::models::SourceStatus;
use crate::reconcile::{ReconcileService, SyncReport};
use crate::retry::{SyncContext, SyncErrorHandler};
use crate::traits::{EventStore, KeyValueCache, SportsSource, SyncLock};

/// How long a sync lock lives if its holder never releases it.
pub const LOCK_TTL_SECS: u64 = 300;

/// Scheduler tuning knobs.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// TTL for the per-source sync lock.
    pub lock_ttl_secs: u64,
    /// Whether to run one sequential sync pass on startup.
    pub run_initial_sync: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lock_ttl_secs: LOCK_TTL_SECS,
            run_initial_sync: true,
        }
    }
}

/// A configured source bound to its adapter and parsed schedule.
#[derive(Debug, Clone)]
struct ScheduledSource<A> {
    entry: SourceEntry,
    adapter: A,
    schedule: Schedule,
}

/// Cron-driven sync orchestrator.
///
/// Generic over the store, the source adapter, the cache, and the lock so
/// production (Postgres + Redis) and tests (in-memory everything) share the
/// same control flow. Clones share the retry handler's health map and the
/// in-process lastRun map.
#[derive(Debug, Clone)]
pub struct SyncScheduler<S, A, C, L> {
    reconcile: ReconcileService<S>,
    handler: SyncErrorHandler<S>,
    cache: C,
    lock: L,
    config: SchedulerConfig,
    sources: Vec<ScheduledSource<A>>,
    // In-process lastRun fallback for deployments without a cache backend.
    last_runs: Arc<Mutex<HashMap<i32, String>>>,
}

impl<S, A, C, L> SyncScheduler<S, A, C, L>
where
    S: EventStore + 'static,
    A: SportsSource + 'static,
    C: KeyValueCache + 'static,
    L: SyncLock + 'static,
{
    pub fn new(
        reconcile: ReconcileService<S>,
        handler: SyncErrorHandler<S>,
        cache: C,
        lock: L,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            reconcile,
            handler,
            cache,
            lock,
            config,
            sources: Vec::new(),
            last_runs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registers a source, validating its cron schedule.
    pub fn add_source(&mut self, entry: SourceEntry, adapter: A) -> Result<(), AppError> {
        let schedule = parse_cron(&entry.schedule)
            .map_err(|e| AppError::InvalidSchedule(entry.schedule.clone(), e.to_string()))?;
        self.sources.push(ScheduledSource {
            entry,
            adapter,
            schedule,
        });
        Ok(())
    }

    pub fn handler(&self) -> &SyncErrorHandler<S> {
        &self.handler
    }

    fn find_source(&self, sport_id: i32) -> Result<&ScheduledSource<A>, AppError> {
        self.sources
            .iter()
            .find(|s| s.entry.sport_id == sport_id)
            .ok_or_else(|| AppError::SourceNotFound(sport_id.to_string()))
    }

    /// Runs one sync cycle for a source, taking and releasing its lock.
    ///
    /// Fails with [`AppError::SyncInProgress`] when the lock is already
    /// held, and with [`AppError::SourceDisabled`] when the source is
    /// disabled in config.
    pub async fn run_once(&self, sport_id: i32) -> Result<SyncReport, AppError> {
        let source = self.find_source(sport_id)?;
        if !source.entry.enabled {
            return Err(AppError::SourceDisabled(sport_id));
        }

        let key = lock_key(sport_id);
        if !self.lock.acquire(&key, self.config.lock_ttl_secs).await? {
            return Err(AppError::SyncInProgress(sport_id));
        }

        let result = self.run_locked(source).await;
        if let Err(e) = self.lock.release(&key).await {
            warn!(sport_id, error = %e, "failed to release sync lock");
        }
        result
    }

    /// Manually triggers a sync cycle without waiting for it.
    ///
    /// The lock is taken synchronously so a conflict surfaces immediately
    /// as [`AppError::SyncInProgress`]; the cycle itself runs on a spawned
    /// task and releases the lock when done.
    pub async fn trigger(&self, sport_id: i32) -> Result<(), AppError> {
        let source = self.find_source(sport_id)?;
        if !source.entry.enabled {
            return Err(AppError::SourceDisabled(sport_id));
        }

        let key = lock_key(sport_id);
        if !self.lock.acquire(&key, self.config.lock_ttl_secs).await? {
            return Err(AppError::SyncInProgress(sport_id));
        }

        info!(sport_id, name = %source.entry.name, "manual sync triggered");
        let scheduler = self.clone();
        let source = source.clone();
        tokio::spawn(async move {
            let sport_id = source.entry.sport_id;
            match scheduler.run_locked(&source).await {
                Ok(report) => info!(
                    sport_id,
                    teams = report.teams.successful(),
                    events = report.events.successful(),
                    failed = report.teams.failed + report.events.failed,
                    "manual sync complete"
                ),
                Err(e) => warn!(sport_id, error = %e, "manual sync failed"),
            }
            if let Err(e) = scheduler.lock.release(&lock_key(sport_id)).await {
                warn!(sport_id, error = %e, "failed to release sync lock");
            }
        });
        Ok(())
    }

    /// Fetch + reconcile under the retry policy. Assumes the lock is held.
    async fn run_locked(&self, source: &ScheduledSource<A>) -> Result<SyncReport, AppError> {
        let sport_id = source.entry.sport_id;
        let adapter = &source.adapter;
        let reconcile = &self.reconcile;

        let ctx = SyncContext::new(sport_id, source.entry.name.clone())
            .with_endpoint(adapter.endpoint());
        let report = self
            .handler
            .run(&ctx, || async {
                let payload = adapter.fetch(sport_id).await?;
                reconcile.sync_payload(sport_id, &payload).await
            })
            .await?;

        let now = Utc::now().to_rfc3339();
        self.last_runs.lock().unwrap().insert(sport_id, now.clone());
        if let Err(e) = self
            .cache
            .set(&last_run_key(sport_id), &now, None)
            .await
        {
            warn!(sport_id, error = %e, "failed to record lastRun");
        }

        info!(
            sport_id,
            name = %source.entry.name,
            teams_created = report.teams.created,
            teams_updated = report.teams.updated,
            events_created = report.events.created,
            events_updated = report.events.updated,
            failed = report.teams.failed + report.events.failed,
            "sync cycle complete"
        );
        Ok(report)
    }

    /// Point-in-time status of every configured source.
    pub async fn status(&self) -> Result<Vec<SourceStatus>, AppError> {
        let mut out = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let sport_id = source.entry.sport_id;
            let last_run = match self.cache.get(&last_run_key(sport_id)).await? {
                Some(ts) => Some(ts),
                None => self.last_runs.lock().unwrap().get(&sport_id).cloned(),
            };
            let is_running = self.lock.is_held(&lock_key(sport_id)).await?;
            let event_count = self.reconcile.store().event_count(sport_id).await?;
            out.push(SourceStatus {
                sport_id,
                name: source.entry.name.clone(),
                enabled: source.entry.enabled && !self.handler.is_disabled(sport_id),
                schedule: source.entry.schedule.clone(),
                last_run,
                is_running,
                event_count,
            });
        }
        Ok(out)
    }

    /// Runs the scheduler until cancelled.
    ///
    /// Performs the startup pass, then drives one cron loop per enabled
    /// source.
    pub async fn run(&self, cancel: CancellationToken) {
        if self.config.run_initial_sync {
            self.initial_sync().await;
        }

        let mut handles = Vec::new();
        for source in self.sources.iter().filter(|s| s.entry.enabled) {
            let scheduler = self.clone();
            let source = source.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                scheduler.run_source_loop(source, cancel).await;
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
        info!("sync scheduler stopped");
    }

    /// Sequential sync of every enabled source, used at startup.
    pub async fn initial_sync(&self) {
        info!(
            sources = self.sources.iter().filter(|s| s.entry.enabled).count(),
            "running initial sync pass"
        );
        for source in self.sources.iter().filter(|s| s.entry.enabled) {
            if let Err(e) = self.run_once(source.entry.sport_id).await {
                warn!(
                    sport_id = source.entry.sport_id,
                    name = %source.entry.name,
                    error = %e,
                    "initial sync failed"
                );
            }
        }
    }

    async fn run_source_loop(&self, source: ScheduledSource<A>, cancel: CancellationToken) {
        let sport_id = source.entry.sport_id;
        info!(sport_id, name = %source.entry.name, schedule = %source.entry.schedule, "source scheduled");

        loop {
            let Some(next_fire) = source.schedule.upcoming(Utc).next() else {
                warn!(sport_id, "cron schedule yields no future fire times");
                break;
            };
            let wait = (next_fire - Utc::now()).to_std().unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            match self.run_once(sport_id).await {
                Ok(_) => {}
                Err(AppError::SyncInProgress(_)) => {
                    info!(sport_id, "scheduled sync skipped, cycle already running");
                }
                Err(AppError::SourceDisabled(_)) => {
                    info!(sport_id, "scheduled sync skipped, source disabled");
                }
                Err(e) => {
                    warn!(sport_id, error = %e, "scheduled sync failed");
                }
            }
        }
    }
}

/// Redis key guarding one source's sync cycle.
pub fn lock_key(sport_id: i32) -> String {
    format!("sync:{}:lock", sport_id)
}

/// Redis key holding one source's last completed run timestamp.
pub fn last_run_key(sport_id: i32) -> String {
    format!("sync:{}:lastRun", sport_id)
}

/// Parse a cron expression, auto-prepending "0 " for 5-field expressions.
///
/// The `cron` crate requires 6 fields (sec min hr dom mon dow), but
/// schedules are typically written as 5-field cron (min hr dom mon dow).
pub fn parse_cron(expr: &str) -> Result<Schedule, cron::error::Error> {
    let parts: Vec<&str> = expr.split_whitespace().collect();
    if parts.len() == 5 {
        let six_field = format!("0 {}", expr);
        Schedule::from_str(&six_field)
    } else {
        Schedule::from_str(expr)
    }
}
