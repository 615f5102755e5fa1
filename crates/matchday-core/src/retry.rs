//! Retry and source-disable policy for sync cycles.
//!
//! Each source gets a health record tracking consecutive failures. Failed
//! fetches are retried with a staged backoff, but only when the failure is
//! network-class; every other class fails the cycle immediately. When a
//! source keeps failing across cycles it is disabled until an operator or
//! a successful manual trigger re-enables it.
//!
//! # Flow
//!
//! ```text
//! attempt --[Ok]--> reset consecutive counter, done
//!    |
//!    +--[Err]--> persist record, bump consecutive counter
//!                    |
//!                    +--[counter >= threshold]--> source disabled, Err
//!                    |
//!                    +--[network error, retries left]--> sleep --> attempt
//!                    |
//!                    +--[other error or retries exhausted]--> Err
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::models::SyncErrorRecord;
use crate::traits::EventStore;

/// Configuration for retry and disable behavior.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum retry attempts after the initial try.
    pub max_retries: u32,
    /// Staged delays, indexed by retry number.
    pub delays: Vec<Duration>,
    /// Delay used when `delays` runs out.
    pub fallback_delay: Duration,
    /// Consecutive failed attempts before the source is disabled.
    pub disable_threshold: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delays: vec![
                Duration::from_secs(1),
                Duration::from_secs(5),
                Duration::from_secs(15),
            ],
            fallback_delay: Duration::from_secs(30),
            disable_threshold: 10,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy from environment variables with fallback to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: std::env::var("SYNC_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retries),
            disable_threshold: std::env::var("SYNC_DISABLE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.disable_threshold),
            ..defaults
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.delays
            .get(retry as usize)
            .copied()
            .unwrap_or(self.fallback_delay)
    }
}

/// Identity of the source a retry loop runs for, carried into every
/// persisted error record so the audit log can say what was being fetched.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub sport_id: i32,
    pub sport_name: String,
    /// Nominal upstream endpoint the cycle talks to.
    pub endpoint: Option<String>,
}

impl SyncContext {
    pub fn new(sport_id: i32, sport_name: impl Into<String>) -> Self {
        Self {
            sport_id,
            sport_name: sport_name.into(),
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// Health record for one source.
#[derive(Debug, Default, Clone, Copy)]
struct SourceHealth {
    consecutive_errors: u32,
    disabled: bool,
}

/// Point-in-time health snapshot for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SourceHealthSnapshot {
    pub consecutive_errors: u32,
    pub disabled: bool,
}

/// Retry executor with per-source failure accounting.
///
/// Clones share the same health map, mirroring how the scheduler hands one
/// handler to every per-source task.
#[derive(Debug, Clone)]
pub struct SyncErrorHandler<S> {
    store: S,
    policy: RetryPolicy,
    health: Arc<Mutex<HashMap<i32, SourceHealth>>>,
}

impl<S: EventStore> SyncErrorHandler<S> {
    pub fn new(store: S, policy: RetryPolicy) -> Self {
        Self {
            store,
            policy,
            health: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns true if the source is currently disabled.
    pub fn is_disabled(&self, sport_id: i32) -> bool {
        self.health
            .lock()
            .unwrap()
            .get(&sport_id)
            .map(|h| h.disabled)
            .unwrap_or(false)
    }

    /// Health snapshot for one source.
    pub fn health(&self, sport_id: i32) -> SourceHealthSnapshot {
        let guard = self.health.lock().unwrap();
        let h = guard.get(&sport_id).copied().unwrap_or_default();
        SourceHealthSnapshot {
            consecutive_errors: h.consecutive_errors,
            disabled: h.disabled,
        }
    }

    /// Re-enables a disabled source and resets its failure counter.
    pub fn reset(&self, sport_id: i32) {
        let mut guard = self.health.lock().unwrap();
        guard.insert(sport_id, SourceHealth::default());
    }

    /// Runs `operation` under the retry policy.
    ///
    /// Network-class failures are retried up to `max_retries` times with the
    /// staged delays; any other failure class stops immediately. Every
    /// failed attempt is persisted to the sync error log and bumps the
    /// source's consecutive-failure counter; success resets it. Crossing the
    /// disable threshold disables the source and stops the loop even when
    /// retries remain.
    pub async fn run<T, F, Fut>(&self, ctx: &SyncContext, mut operation: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let sport_id = ctx.sport_id;
        if self.is_disabled(sport_id) {
            return Err(AppError::SourceDisabled(sport_id));
        }

        let mut attempt: u32 = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    self.on_success(sport_id);
                    return Ok(value);
                }
                Err(e) => {
                    self.persist_attempt(ctx, &e, attempt).await;
                    let disabled = self.on_failed_attempt(ctx, &e);

                    let retries_left = attempt < self.policy.max_retries;
                    if disabled || !e.is_retryable() || !retries_left {
                        return Err(e);
                    }

                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        sport_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "sync attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn on_success(&self, sport_id: i32) {
        let mut guard = self.health.lock().unwrap();
        let health = guard.entry(sport_id).or_default();
        if health.consecutive_errors > 0 {
            info!(
                sport_id,
                cleared = health.consecutive_errors,
                "source recovered, failure counter reset"
            );
        }
        health.consecutive_errors = 0;
    }

    /// Bumps the consecutive-failure counter, disabling the source at the
    /// threshold. Returns whether the source is now disabled.
    fn on_failed_attempt(&self, ctx: &SyncContext, error: &AppError) -> bool {
        let mut guard = self.health.lock().unwrap();
        let health = guard.entry(ctx.sport_id).or_default();
        health.consecutive_errors += 1;

        if health.consecutive_errors >= self.policy.disable_threshold && !health.disabled {
            health.disabled = true;
            error!(
                sport_id = ctx.sport_id,
                sport = %ctx.sport_name,
                consecutive_errors = health.consecutive_errors,
                error = %error,
                "source disabled after repeated failures"
            );
        }
        health.disabled
    }

    async fn persist_attempt(&self, ctx: &SyncContext, error: &AppError, attempt: u32) {
        let record = SyncErrorRecord {
            sport_id: ctx.sport_id,
            sport_name: Some(ctx.sport_name.clone()),
            error_type: error.kind().as_str().to_string(),
            message: error.to_string(),
            endpoint: ctx.endpoint.clone(),
            attempt,
            max_retries: self.policy.max_retries,
            occurred_at: Utc::now(),
        };
        if let Err(e) = self.store.insert_sync_error(&record).await {
            warn!(sport_id = ctx.sport_id, error = %e, "failed to persist sync error record");
        }
    }
}
