//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::dto::{
    HealthResponse, SnapshotQuery, SnapshotResponse, SourceStatusDto, SyncStatusResponse,
    TriggerResponse,
};
use crate::handlers::{health, sync};

/// OpenAPI documentation for the Matchday API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Matchday API",
        version = "0.3.0",
        description = "Sync engine for the Matchday sports catalog.

Matchday keeps a catalog of sports events (races, fight cards, sessions)
in sync with upstream schedule APIs. Sources run on cron schedules under
a distributed lock; this API exposes their status and a manual trigger.

## Quick Start

1. Check server health: `GET /api/v1/health`
2. Inspect sources: `GET /api/v1/sync/status`
3. Force a sync: `POST /api/v1/sync/trigger/1`
",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        health::health_check,
        sync::get_sync_status,
        sync::trigger_sync,
        sync::get_snapshots,
    ),
    components(
        schemas(
            SnapshotQuery,
            HealthResponse,
            SyncStatusResponse,
            SourceStatusDto,
            TriggerResponse,
            SnapshotResponse,
        )
    ),
    tags(
        (name = "system", description = "System health"),
        (name = "sync", description = "Sync status, triggering, and diagnostics"),
    )
)]
pub struct ApiDoc;
