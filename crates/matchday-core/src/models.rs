//! Domain models for the sports catalog.
//!
//! Two families of types live here:
//!
//! - **Canonical** types ([`CanonicalTeam`], [`CanonicalEvent`]) are what a
//!   source adapter produces from an upstream feed: normalized, keyed by
//!   `external_id`, carrying no database identity.
//! - **Stored** types ([`StoredTeam`], [`StoredEvent`]) mirror the database
//!   rows and carry generated ids.
//!
//! Reconciliation maps canonical rows onto stored rows by `external_id`
//! within a sport.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// =============================================================================
// Event Status
// =============================================================================

/// Lifecycle status of a catalog event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Event is in the future.
    Scheduled,
    /// Event is presumed underway.
    Live,
    /// Event start time has passed the live window.
    Finished,
    /// Event was cancelled upstream.
    Cancelled,
    /// Event was postponed upstream.
    Postponed,
}

impl EventStatus {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Scheduled => "scheduled",
            EventStatus::Live => "live",
            EventStatus::Finished => "finished",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Postponed => "postponed",
        }
    }

    /// Derives a status from the event start time.
    ///
    /// Upstream schedule feeds rarely carry live/finished flags, so the
    /// status is inferred: future starts are scheduled, starts within the
    /// last two hours are presumed live, anything older is finished.
    pub fn from_start_time(start: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if start > now {
            EventStatus::Scheduled
        } else if now - start <= Duration::hours(2) {
            EventStatus::Live
        } else {
            EventStatus::Finished
        }
    }
}

/// Error type for parsing EventStatus from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEventStatusError(String);

impl std::fmt::Display for ParseEventStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid event status: {}", self.0)
    }
}

impl std::error::Error for ParseEventStatusError {}

impl std::str::FromStr for EventStatus {
    type Err = ParseEventStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(EventStatus::Scheduled),
            "live" => Ok(EventStatus::Live),
            "finished" => Ok(EventStatus::Finished),
            "cancelled" => Ok(EventStatus::Cancelled),
            "postponed" => Ok(EventStatus::Postponed),
            _ => Err(ParseEventStatusError(s.to_string())),
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Canonical types (adapter output)
// =============================================================================

/// A team or participant as produced by a source adapter.
///
/// For individual sports the "team" is the entrant: an F1 constructor, a
/// fighter, a rider. `external_id` is the upstream key used to match
/// against existing rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalTeam {
    pub external_id: String,
    pub name: String,
    pub short_name: Option<String>,
    pub country: Option<String>,
    pub logo_url: Option<String>,
    /// Sport-specific extras (driver numbers, weight classes, ...).
    #[serde(default)]
    pub metadata: Value,
}

impl CanonicalTeam {
    pub fn new(external_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            name: name.into(),
            short_name: None,
            country: None,
            logo_url: None,
            metadata: Value::Null,
        }
    }
}

/// An event or session as produced by a source adapter.
///
/// Multi-session events (an F1 race weekend, a fight card) arrive as a
/// parent event plus children referencing the parent's `external_id`
/// through `parent_external_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub external_id: String,
    pub league: String,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// IANA timezone name; defaults to UTC when the feed gives none.
    pub timezone: String,
    pub venue: Option<String>,
    pub status: EventStatus,
    pub parent_external_id: Option<String>,
    /// practice, qualifying, sprint, race, ...
    pub session_type: Option<String>,
    /// External ids of participating teams, resolved to db ids at store time.
    #[serde(default)]
    pub team_external_ids: Vec<String>,
    #[serde(default)]
    pub metadata: Value,
}

// =============================================================================
// Stored types (database rows)
// =============================================================================

/// A team row as stored in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredTeam {
    pub id: i32,
    pub sport_id: i32,
    pub name: String,
    pub short_name: Option<String>,
    pub country: Option<String>,
    pub logo_url: Option<String>,
    pub external_id: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An event row as stored in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredEvent {
    pub id: Uuid,
    pub sport_id: i32,
    pub league: String,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub timezone: String,
    pub venue: Option<String>,
    pub status: String,
    pub parent_event_id: Option<Uuid>,
    pub session_type: Option<String>,
    pub external_id: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Sync bookkeeping
// =============================================================================

/// A persisted record of a sync failure, written once per failed attempt.
///
/// Cycle-level failures carry the source name and endpoint from the retry
/// context; row-level reconciliation failures leave them unset and name
/// the offending row in `message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncErrorRecord {
    pub sport_id: i32,
    pub sport_name: Option<String>,
    /// Classification bucket, see [`crate::error::ErrorKind`].
    pub error_type: String,
    pub message: String,
    /// Upstream endpoint the failing cycle was fetching.
    pub endpoint: Option<String>,
    /// Attempt number within the retry loop, starting at 0.
    pub attempt: u32,
    /// Retry budget in force when the failure was recorded.
    pub max_retries: u32,
    pub occurred_at: DateTime<Utc>,
}

/// A snapshot of a raw upstream response, kept for diagnosis and replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSnapshot {
    pub key: String,
    pub endpoint: String,
    pub response: Value,
    pub status_code: i32,
    /// Time to live in seconds.
    pub ttl: i64,
    pub expires_at: DateTime<Utc>,
}

impl NewSnapshot {
    /// Builds a snapshot expiring 24 hours from `now`.
    pub fn expiring_in_a_day(
        key: impl Into<String>,
        endpoint: impl Into<String>,
        response: Value,
        status_code: i32,
        now: DateTime<Utc>,
    ) -> Self {
        let ttl = 24 * 3600;
        Self {
            key: key.into(),
            endpoint: endpoint.into(),
            response,
            status_code,
            ttl,
            expires_at: now + Duration::seconds(ttl),
        }
    }
}

/// A stored upstream-response snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApiSnapshot {
    pub key: String,
    pub endpoint: String,
    pub response: Value,
    pub status_code: i32,
    pub ttl: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Reminders
// =============================================================================

/// A reminder due for dispatch, joined with its event's start time.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DueReminder {
    pub id: Uuid,
    pub event_id: Uuid,
    pub event_title: String,
    pub start_time: DateTime<Utc>,
    /// How long before the event start the reminder should fire.
    pub minutes_before: i32,
    /// Delivery channel: email, push, sms.
    pub channel: String,
}

impl DueReminder {
    /// When this reminder should fire.
    pub fn fire_at(&self) -> DateTime<Utc> {
        self.start_time - Duration::minutes(self.minutes_before as i64)
    }
}

/// A reminder dispatch job carried through the notification queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationJob {
    pub reminder_id: Uuid,
    pub event_id: Uuid,
    pub event_title: String,
    pub channel: String,
}

// =============================================================================
// Source status
// =============================================================================

/// Point-in-time view of one configured source, served by the status API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStatus {
    pub sport_id: i32,
    pub name: String,
    pub enabled: bool,
    pub schedule: String,
    /// RFC 3339 timestamp of the last completed run, if any.
    pub last_run: Option<String>,
    pub is_running: bool,
    pub event_count: i64,
}
