//! Matchday Core - Domain types, business logic, and services.
//!
//! This crate provides the core functionality of the sync engine, including:
//!
//! - **Domain models**: [`CanonicalEvent`], [`StoredEvent`], [`EventStatus`], etc.
//! - **Services**: [`ReconcileService`] for folding upstream payloads into the
//!   catalog, [`SyncScheduler`] for cron-driven cycles, [`ReminderScheduler`]
//!   for event notifications
//! - **Retry machinery**: [`SyncErrorHandler`] with classification-aware
//!   backoff and source disabling
//! - **Traits**: [`SportsSource`], [`EventStore`], [`KeyValueCache`],
//!   [`SyncLock`], [`NotificationQueue`] for dependency injection
//!
//! # Architecture
//!
//! This crate is reusable by different frontends (server, one-shot CLI runs).
//! Business logic is decoupled from I/O concerns through traits:
//!
//! - [`SportsSource`] - abstracts upstream sport APIs (e.g. Ergast)
//! - [`EventStore`] - abstracts catalog persistence (e.g. PostgreSQL)
//! - [`KeyValueCache`] / [`SyncLock`] - abstract Redis, with no-op fallbacks
//! - [`NotificationQueue`] - abstracts reminder delivery, with an in-process
//!   default ([`InMemoryQueue`])
//!
//! # Example
//!
//! ```ignore
//! use matchday_core::{ReconcileService, RetryPolicy, SchedulerConfig, SyncErrorHandler, SyncScheduler};
//! use matchday_core::traits::{NoopCache, NoopLock};
//!
//! let reconcile = ReconcileService::new(store.clone());
//! let handler = SyncErrorHandler::new(store, RetryPolicy::default());
//! let mut scheduler = SyncScheduler::new(reconcile, handler, NoopCache, NoopLock, SchedulerConfig::default());
//! scheduler.add_source(entry, adapter)?;
//! scheduler.run(cancel).await;
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod queue;
pub mod reconcile;
pub mod retry;
pub mod scheduler;
pub mod traits;

// Configuration
pub use config::{SourceEntry, SourcesConfig, default_config_path, load_sources_config};

// Error handling
pub use error::{AppError, ErrorKind};

// Domain models
pub use models::{
    ApiSnapshot, CanonicalEvent, CanonicalTeam, DueReminder, EventStatus, NewSnapshot,
    NotificationJob, SourceStatus, StoredEvent, StoredTeam, SyncErrorRecord,
};

// Reminder scheduling and delivery
pub use notify::{ReminderConfig, ReminderScheduler};
pub use queue::{DeliveryPolicy, InMemoryQueue};

// Reconciliation
pub use reconcile::{ReconcileService, SyncOutcome, SyncReport, SyncStats};

// Retry machinery
pub use retry::{RetryPolicy, SourceHealthSnapshot, SyncContext, SyncErrorHandler};

// Scheduling
pub use scheduler::{SchedulerConfig, SyncScheduler, parse_cron};

// Traits
pub use traits::{
    EventStore, KeyValueCache, NoopCache, NoopLock, NotificationQueue, SourcePayload,
    SportsSource, SyncLock,
};
