//! Response DTOs for API endpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use matchday_core::{ApiSnapshot, SourceHealthSnapshot, SourceStatus};

// =============================================================================
// Health
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("healthy")
    pub status: String,
    /// Server version
    pub version: String,
}

// =============================================================================
// Sync
// =============================================================================

/// Status of all configured sync sources.
#[derive(Debug, Serialize, ToSchema)]
pub struct SyncStatusResponse {
    pub sources: Vec<SourceStatusDto>,
}

/// Point-in-time status of one configured source.
#[derive(Debug, Serialize, ToSchema)]
pub struct SourceStatusDto {
    /// Sport identifier the source syncs
    pub sport_id: i32,
    /// Human-readable source name
    pub name: String,
    /// Whether the source will run (config-enabled and not error-disabled)
    pub enabled: bool,
    /// Cron schedule expression
    pub schedule: String,
    /// RFC 3339 timestamp of the last completed run
    pub last_run: Option<String>,
    /// Whether a sync cycle currently holds the source's lock
    pub is_running: bool,
    /// Number of catalog events stored for this sport
    pub event_count: i64,
    /// Consecutive failed cycles since the last success
    pub consecutive_errors: u32,
}

impl SourceStatusDto {
    pub fn from_parts(status: SourceStatus, health: SourceHealthSnapshot) -> Self {
        Self {
            sport_id: status.sport_id,
            name: status.name,
            enabled: status.enabled,
            schedule: status.schedule,
            last_run: status.last_run,
            is_running: status.is_running,
            event_count: status.event_count,
            consecutive_errors: health.consecutive_errors,
        }
    }
}

/// Acknowledgement of a manually triggered sync.
#[derive(Debug, Serialize, ToSchema)]
pub struct TriggerResponse {
    pub sport_id: i32,
    /// Always "accepted"; progress is visible via /sync/status
    pub status: String,
}

// =============================================================================
// Snapshots
// =============================================================================

/// A stored raw upstream response.
#[derive(Debug, Serialize, ToSchema)]
pub struct SnapshotResponse {
    /// Cache key the snapshot was stored under
    pub key: String,
    /// Upstream endpoint the response came from
    pub endpoint: String,
    /// HTTP status of the upstream response
    pub status_code: i32,
    /// Raw response body
    #[schema(value_type = Object)]
    pub response: Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<ApiSnapshot> for SnapshotResponse {
    fn from(s: ApiSnapshot) -> Self {
        Self {
            key: s.key,
            endpoint: s.endpoint,
            status_code: s.status_code,
            response: s.response,
            created_at: s.created_at,
            expires_at: s.expires_at,
        }
    }
}
