//! Sync management endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use matchday_core::EventStore;

use crate::dto::{SnapshotQuery, SnapshotResponse, SourceStatusDto, SyncStatusResponse, TriggerResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Default and maximum snapshot page sizes.
const SNAPSHOT_LIMIT: i64 = 10;
const SNAPSHOT_LIMIT_MAX: i64 = 50;

/// Get the status of all configured sync sources.
#[utoipa::path(
    get,
    path = "/api/v1/sync/status",
    responses(
        (status = 200, description = "Status of every configured source", body = SyncStatusResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "sync"
)]
pub async fn get_sync_status(
    State(state): State<AppState>,
) -> Result<Json<SyncStatusResponse>, ApiError> {
    let statuses = state.scheduler.status().await.map_err(ApiError::from)?;

    let sources = statuses
        .into_iter()
        .map(|status| {
            let health = state.scheduler.handler().health(status.sport_id);
            SourceStatusDto::from_parts(status, health)
        })
        .collect();

    Ok(Json(SyncStatusResponse { sources }))
}

/// Trigger a sync cycle for one sport.
///
/// Takes the source's lock and returns immediately; the cycle runs in the
/// background. Use GET /api/v1/sync/status to check progress.
#[utoipa::path(
    post,
    path = "/api/v1/sync/trigger/{sport_id}",
    params(
        ("sport_id" = i32, Path, description = "Sport identifier"),
    ),
    responses(
        (status = 202, description = "Sync started", body = TriggerResponse),
        (status = 404, description = "No source configured for this sport"),
        (status = 409, description = "Sync already in progress, or source disabled"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "sync"
)]
pub async fn trigger_sync(
    State(state): State<AppState>,
    Path(sport_id): Path<i32>,
) -> Result<(StatusCode, Json<TriggerResponse>), ApiError> {
    state.scheduler.trigger(sport_id).await.map_err(ApiError::from)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            sport_id,
            status: "accepted".to_string(),
        }),
    ))
}

/// List recent raw upstream response snapshots for one sport.
#[utoipa::path(
    get,
    path = "/api/v1/sync/snapshots/{sport_id}",
    params(
        ("sport_id" = i32, Path, description = "Sport identifier"),
        SnapshotQuery,
    ),
    responses(
        (status = 200, description = "Recent unexpired snapshots, newest first", body = Vec<SnapshotResponse>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "sync"
)]
pub async fn get_snapshots(
    State(state): State<AppState>,
    Path(sport_id): Path<i32>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<Vec<SnapshotResponse>>, ApiError> {
    let limit = query.limit.unwrap_or(SNAPSHOT_LIMIT).clamp(1, SNAPSHOT_LIMIT_MAX);
    let snapshots = state
        .repo
        .recent_snapshots(sport_id, limit)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(
        snapshots.into_iter().map(SnapshotResponse::from).collect(),
    ))
}
