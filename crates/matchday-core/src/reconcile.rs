//! Reconciliation of upstream payloads into the catalog.
//!
//! This module provides the core business logic for folding a normalized
//! upstream payload into the stored catalog: match by external id, insert
//! what is new, update what already exists.
//!
//! # Architecture
//!
//! The [`ReconcileService`] is generic over [`EventStore`], so the same
//! pipeline runs against Postgres in production and an in-memory store in
//! tests.
//!
//! # Ordering
//!
//! Teams are reconciled before events so event rows can reference team ids.
//! Events are reconciled in two passes: parents first, then sessions that
//! reference a parent, so `parent_event_id` can always be resolved.
//!
//! # Row failures
//!
//! A failed row does not abort the cycle. It is counted in
//! [`SyncStats::failed`], logged, and recorded in the sync error log; the
//! remaining rows still land. The raw-response snapshot at the end of the
//! cycle is best effort: a failed write is logged and the cycle still
//! succeeds.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{CanonicalEvent, NewSnapshot, SyncErrorRecord};
use crate::traits::{EventStore, SourcePayload};

/// Outcome of reconciling a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// New row - first time seeing this external id.
    Created,
    /// Existing row refreshed from the upstream payload.
    Updated,
    /// Processing failed for this row.
    Failed,
}

/// Statistics for one family of rows (teams or events) in a sync cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SyncStats {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
}

impl SyncStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an outcome, incrementing the appropriate counter.
    pub fn record(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Created => self.created += 1,
            SyncOutcome::Updated => self.updated += 1,
            SyncOutcome::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.failed
    }

    pub fn successful(&self) -> usize {
        self.created + self.updated
    }
}

/// Combined statistics for a full sync cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SyncReport {
    pub teams: SyncStats,
    pub events: SyncStats,
}

/// Folds upstream payloads into the catalog.
#[derive(Debug, Clone)]
pub struct ReconcileService<S> {
    store: S,
}

impl<S: EventStore> ReconcileService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reconciles one payload for one sport and snapshots the raw response.
    pub async fn sync_payload(
        &self,
        sport_id: i32,
        payload: &SourcePayload,
    ) -> Result<SyncReport, AppError> {
        let mut report = SyncReport::default();

        let team_ids = self
            .sync_teams(sport_id, payload, &mut report.teams)
            .await?;
        self.sync_events(sport_id, payload, &team_ids, &mut report.events)
            .await?;

        let snapshot = NewSnapshot::expiring_in_a_day(
            format!("api:{}:{}", sport_id, payload.endpoint),
            payload.endpoint.clone(),
            payload.raw.clone(),
            200,
            Utc::now(),
        );
        if let Err(e) = self.store.insert_snapshot(&snapshot).await {
            warn!(sport_id, error = %e, "failed to store response snapshot");
        }

        debug!(
            sport_id,
            teams_created = report.teams.created,
            teams_updated = report.teams.updated,
            events_created = report.events.created,
            events_updated = report.events.updated,
            failed = report.teams.failed + report.events.failed,
            "reconciliation cycle complete"
        );
        Ok(report)
    }

    /// Upserts teams and returns the external id → db id map used for
    /// event participant resolution.
    async fn sync_teams(
        &self,
        sport_id: i32,
        payload: &SourcePayload,
        stats: &mut SyncStats,
    ) -> Result<HashMap<String, i32>, AppError> {
        let mut ids = HashMap::with_capacity(payload.teams.len());

        for team in &payload.teams {
            let outcome = match self.store.find_team(sport_id, &team.external_id).await {
                Ok(Some(existing)) => match self.store.update_team(existing.id, team).await {
                    Ok(updated) => {
                        ids.insert(team.external_id.clone(), updated.id);
                        SyncOutcome::Updated
                    }
                    Err(e) => self.record_row_failure(sport_id, &team.external_id, e).await,
                },
                Ok(None) => match self.store.insert_team(sport_id, team).await {
                    Ok(created) => {
                        ids.insert(team.external_id.clone(), created.id);
                        SyncOutcome::Created
                    }
                    Err(e) => self.record_row_failure(sport_id, &team.external_id, e).await,
                },
                Err(e) => self.record_row_failure(sport_id, &team.external_id, e).await,
            };
            stats.record(outcome);
        }

        Ok(ids)
    }

    async fn sync_events(
        &self,
        sport_id: i32,
        payload: &SourcePayload,
        team_ids: &HashMap<String, i32>,
        stats: &mut SyncStats,
    ) -> Result<(), AppError> {
        // Parent events first so sessions can link to them.
        let mut parent_db_ids: HashMap<String, Uuid> = HashMap::new();
        let (parents, children): (Vec<_>, Vec<_>) = payload
            .events
            .iter()
            .partition(|e| e.parent_external_id.is_none());

        for event in parents {
            let outcome = self
                .sync_one_event(sport_id, event, None, team_ids, &mut parent_db_ids)
                .await;
            stats.record(outcome);
        }

        for event in children {
            // Partitioning guarantees the reference is Some here.
            let parent_id = match &event.parent_external_id {
                Some(ext) => match parent_db_ids.get(ext).copied() {
                    Some(id) => Some(id),
                    None => match self.store.find_event(sport_id, ext).await {
                        Ok(found) => found.map(|p| p.id),
                        Err(e) => {
                            stats.record(
                                self.record_row_failure(sport_id, &event.external_id, e).await,
                            );
                            continue;
                        }
                    },
                },
                None => None,
            };
            let outcome = self
                .sync_one_event(sport_id, event, parent_id, team_ids, &mut parent_db_ids)
                .await;
            stats.record(outcome);
        }

        Ok(())
    }

    /// Maps an event's team references to stored ids.
    ///
    /// References missed by the current cycle's team map (events-only
    /// feeds, or a team row that failed this cycle) are looked up in the
    /// store, so links to already-known teams survive. References that
    /// resolve nowhere are dropped.
    async fn resolve_participants(
        &self,
        sport_id: i32,
        event: &CanonicalEvent,
        team_ids: &HashMap<String, i32>,
    ) -> Vec<i32> {
        let mut out = Vec::with_capacity(event.team_external_ids.len());
        for ext in &event.team_external_ids {
            if let Some(id) = team_ids.get(ext) {
                out.push(*id);
                continue;
            }
            match self.store.find_team(sport_id, ext).await {
                Ok(Some(stored)) => out.push(stored.id),
                Ok(None) => {
                    debug!(sport_id, external_id = %ext, "event references unknown team");
                }
                Err(e) => {
                    warn!(sport_id, external_id = %ext, error = %e, "team lookup failed");
                }
            }
        }
        out
    }

    async fn sync_one_event(
        &self,
        sport_id: i32,
        event: &CanonicalEvent,
        parent_id: Option<Uuid>,
        team_ids: &HashMap<String, i32>,
        parent_db_ids: &mut HashMap<String, Uuid>,
    ) -> SyncOutcome {
        let participants = self.resolve_participants(sport_id, event, team_ids).await;

        match self.store.find_event(sport_id, &event.external_id).await {
            Ok(Some(existing)) => {
                match self
                    .store
                    .update_event(existing.id, event, parent_id, &participants)
                    .await
                {
                    Ok(updated) => {
                        parent_db_ids.insert(event.external_id.clone(), updated.id);
                        SyncOutcome::Updated
                    }
                    Err(e) => self.record_row_failure(sport_id, &event.external_id, e).await,
                }
            }
            Ok(None) => {
                match self
                    .store
                    .insert_event(sport_id, event, parent_id, &participants)
                    .await
                {
                    Ok(created) => {
                        parent_db_ids.insert(event.external_id.clone(), created.id);
                        SyncOutcome::Created
                    }
                    Err(e) => self.record_row_failure(sport_id, &event.external_id, e).await,
                }
            }
            Err(e) => self.record_row_failure(sport_id, &event.external_id, e).await,
        }
    }

    /// Logs and persists a row-level failure, then yields `Failed`.
    async fn record_row_failure(
        &self,
        sport_id: i32,
        external_id: &str,
        error: AppError,
    ) -> SyncOutcome {
        warn!(sport_id, external_id, error = %error, "row reconciliation failed");
        let record = SyncErrorRecord {
            sport_id,
            sport_name: None,
            error_type: error.kind().as_str().to_string(),
            message: format!("row {}: {}", external_id, error),
            endpoint: None,
            attempt: 0,
            max_retries: 0,
            occurred_at: Utc::now(),
        };
        if let Err(e) = self.store.insert_sync_error(&record).await {
            warn!(sport_id, error = %e, "failed to persist sync error record");
        }
        SyncOutcome::Failed
    }
}
