//! Request DTOs for API endpoints.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Query parameters for the snapshot listing.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct SnapshotQuery {
    /// Maximum number of snapshots to return (default: 10, max: 50)
    #[param(example = 10)]
    pub limit: Option<i64>,
}
