use tokio_util::sync::CancellationToken;

use matchday_core::SyncScheduler;
use matchday_db::{CacheBackend, LockBackend, SportsRepository};
use matchday_sources::SourceKind;

/// The adapter type the server schedules: every configured sport feed,
/// sharing the server's cache backend for response caching.
pub type Adapter = SourceKind<CacheBackend>;

/// The concrete scheduler wiring used in production.
pub type Scheduler = SyncScheduler<SportsRepository, Adapter, CacheBackend, LockBackend>;

/// Shared application state for all handlers.
///
/// This is wrapped in Arc internally by Axum when using `with_state()`,
/// so all fields must implement Clone (which they do via internal `Arc<Pool>`).
#[derive(Clone)]
pub struct AppState {
    /// Sync scheduler, shared with the background cron tasks
    pub scheduler: Scheduler,

    /// Catalog repository for direct database queries
    pub repo: SportsRepository,

    /// Cancellation token for graceful shutdown
    pub shutdown_token: CancellationToken,
}

impl AppState {
    pub fn new(scheduler: Scheduler, repo: SportsRepository, shutdown_token: CancellationToken) -> Self {
        Self {
            scheduler,
            repo,
            shutdown_token,
        }
    }
}
