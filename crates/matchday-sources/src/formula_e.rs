//! Formula E adapter.
//!
//! The official Formula E API requires authenticated access, so this
//! adapter currently yields an empty schedule. It still exercises the full
//! sync path (locking, snapshots, lastRun marker) so the source can be
//! enabled and monitored before the feed integration lands.

use matchday_core::error::AppError;
use matchday_core::traits::{SourcePayload, SportsSource};
use tracing::info;

const BASE_URL: &str = "https://api.formula-e.com";

#[derive(Debug, Clone, Copy, Default)]
pub struct FormulaESource;

impl SportsSource for FormulaESource {
    async fn fetch(&self, sport_id: i32) -> Result<SourcePayload, AppError> {
        info!(sport_id, "Formula E feed not yet integrated, syncing empty schedule");
        Ok(SourcePayload {
            teams: Vec::new(),
            events: Vec::new(),
            raw: serde_json::json!({ "races": [] }),
            endpoint: format!("{}/schedule", BASE_URL),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/schedule", BASE_URL)
    }
}
