//! Sports catalog repository for PostgreSQL.
//!
//! Implements [`EventStore`] over the `teams`, `events`, `event_teams`,
//! `sync_errors`, `api_cache`, and `reminders` tables. Reconciliation is
//! row-at-a-time (find by external id, then insert or update) so the
//! service layer can attribute created/updated outcomes per row.

use chrono::{DateTime, Utc};
use matchday_core::error::AppError;
use matchday_core::models::{
    ApiSnapshot, CanonicalEvent, CanonicalTeam, DueReminder, NewSnapshot, StoredEvent, StoredTeam,
    SyncErrorRecord,
};
use matchday_core::traits::EventStore;
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

/// Column list for team SELECT/RETURNING clauses. Must remain a const
/// literal since format!() bypasses sqlx validation.
const TEAM_COLUMNS: &str =
    "id, sport_id, name, short_name, country, logo_url, external_id, metadata, created_at, updated_at";

const EVENT_COLUMNS: &str = "id, sport_id, league, title, description, start_time, end_time, timezone, venue, status, parent_event_id, session_type, external_id, metadata, created_at, updated_at";

const SNAPSHOT_COLUMNS: &str =
    "key, endpoint, response, status_code, ttl, expires_at, created_at";

/// Repository for the sports catalog in PostgreSQL.
///
/// # Examples
///
/// ```no_run
/// use sqlx::postgres::PgPoolOptions;
/// use matchday_db::SportsRepository;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = PgPoolOptions::new()
///     .max_connections(5)
///     .connect("postgresql://localhost/matchday")
///     .await?;
///
/// let repo = SportsRepository::new(pool);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SportsRepository {
    pool: Pool<Postgres>,
}

impl SportsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn metadata_or_empty(value: &serde_json::Value) -> serde_json::Value {
        if value.is_null() {
            serde_json::json!({})
        } else {
            value.clone()
        }
    }
}

impl EventStore for SportsRepository {
    async fn find_team(
        &self,
        sport_id: i32,
        external_id: &str,
    ) -> Result<Option<StoredTeam>, AppError> {
        let team: Option<StoredTeam> = sqlx::query_as(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE sport_id = $1 AND external_id = $2"
        ))
        .bind(sport_id)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(team)
    }

    async fn insert_team(
        &self,
        sport_id: i32,
        team: &CanonicalTeam,
    ) -> Result<StoredTeam, AppError> {
        let stored: StoredTeam = sqlx::query_as(&format!(
            r#"
            INSERT INTO teams (sport_id, name, short_name, country, logo_url, external_id, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TEAM_COLUMNS}
            "#
        ))
        .bind(sport_id)
        .bind(&team.name)
        .bind(&team.short_name)
        .bind(&team.country)
        .bind(&team.logo_url)
        .bind(&team.external_id)
        .bind(Self::metadata_or_empty(&team.metadata))
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn update_team(&self, id: i32, team: &CanonicalTeam) -> Result<StoredTeam, AppError> {
        let stored: StoredTeam = sqlx::query_as(&format!(
            r#"
            UPDATE teams SET
                name = $2,
                short_name = $3,
                country = $4,
                logo_url = $5,
                metadata = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TEAM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&team.name)
        .bind(&team.short_name)
        .bind(&team.country)
        .bind(&team.logo_url)
        .bind(Self::metadata_or_empty(&team.metadata))
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn find_event(
        &self,
        sport_id: i32,
        external_id: &str,
    ) -> Result<Option<StoredEvent>, AppError> {
        let event: Option<StoredEvent> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE sport_id = $1 AND external_id = $2"
        ))
        .bind(sport_id)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn insert_event(
        &self,
        sport_id: i32,
        event: &CanonicalEvent,
        parent_id: Option<Uuid>,
        team_ids: &[i32],
    ) -> Result<StoredEvent, AppError> {
        let mut tx = self.pool.begin().await?;

        let stored: StoredEvent = sqlx::query_as(&format!(
            r#"
            INSERT INTO events (
                sport_id, league, title, description, start_time, end_time,
                timezone, venue, status, parent_event_id, session_type,
                external_id, metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(sport_id)
        .bind(&event.league)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(&event.timezone)
        .bind(&event.venue)
        .bind(event.status.as_str())
        .bind(parent_id)
        .bind(&event.session_type)
        .bind(&event.external_id)
        .bind(Self::metadata_or_empty(&event.metadata))
        .fetch_one(&mut *tx)
        .await?;

        if !team_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO event_teams (event_id, team_id)
                SELECT $1, UNNEST($2::int4[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(stored.id)
            .bind(team_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(stored)
    }

    async fn update_event(
        &self,
        id: Uuid,
        event: &CanonicalEvent,
        parent_id: Option<Uuid>,
        team_ids: &[i32],
    ) -> Result<StoredEvent, AppError> {
        let mut tx = self.pool.begin().await?;

        let stored: StoredEvent = sqlx::query_as(&format!(
            r#"
            UPDATE events SET
                league = $2,
                title = $3,
                description = $4,
                start_time = $5,
                end_time = $6,
                timezone = $7,
                venue = $8,
                status = $9,
                parent_event_id = $10,
                session_type = $11,
                metadata = $12,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&event.league)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(&event.timezone)
        .bind(&event.venue)
        .bind(event.status.as_str())
        .bind(parent_id)
        .bind(&event.session_type)
        .bind(Self::metadata_or_empty(&event.metadata))
        .fetch_one(&mut *tx)
        .await?;

        // Participant links follow the payload: stale links go, new ones land.
        sqlx::query("DELETE FROM event_teams WHERE event_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if !team_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO event_teams (event_id, team_id)
                SELECT $1, UNNEST($2::int4[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(id)
            .bind(team_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(stored)
    }

    async fn event_count(&self, sport_id: i32) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE sport_id = $1")
            .bind(sport_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_sync_error(&self, record: &SyncErrorRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sync_errors (
                sport_id, sport_name, error_type, message, endpoint,
                attempt, max_retries, occurred_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.sport_id)
        .bind(&record.sport_name)
        .bind(&record.error_type)
        .bind(&record.message)
        .bind(&record.endpoint)
        .bind(record.attempt as i32)
        .bind(record.max_retries as i32)
        .bind(record.occurred_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_snapshot(&self, snapshot: &NewSnapshot) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO api_cache (key, endpoint, response, status_code, ttl, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&snapshot.key)
        .bind(&snapshot.endpoint)
        .bind(&snapshot.response)
        .bind(snapshot.status_code)
        .bind(snapshot.ttl)
        .bind(snapshot.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_snapshots(
        &self,
        sport_id: i32,
        limit: i64,
    ) -> Result<Vec<ApiSnapshot>, AppError> {
        // Snapshot keys are api:{sport_id}:{endpoint}
        let snapshots: Vec<ApiSnapshot> = sqlx::query_as(&format!(
            r#"
            SELECT {SNAPSHOT_COLUMNS} FROM api_cache
            WHERE key LIKE $1 AND expires_at > NOW()
            ORDER BY created_at DESC
            LIMIT $2
            "#
        ))
        .bind(format!("api:{}:%", sport_id))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(snapshots)
    }

    async fn due_reminders(&self, until: DateTime<Utc>) -> Result<Vec<DueReminder>, AppError> {
        let reminders: Vec<DueReminder> = sqlx::query_as(
            r#"
            SELECT r.id, r.event_id, e.title AS event_title, e.start_time,
                   r.minutes_before, r.type AS channel
            FROM reminders r
            JOIN events e ON e.id = r.event_id
            WHERE r.status = 'pending'
              AND r.is_active
              AND e.start_time > NOW()
              AND e.start_time <= $1
            ORDER BY e.start_time
            "#,
        )
        .bind(until)
        .fetch_all(&self.pool)
        .await?;
        Ok(reminders)
    }

    async fn mark_reminder_sent(&self, reminder_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE reminders SET status = 'sent', sent_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(reminder_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
