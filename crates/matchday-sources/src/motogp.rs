//! MotoGP adapter.
//!
//! The MotoGP results API requires authenticated access, so this adapter
//! currently yields an empty schedule. An empty season is a legitimate
//! payload for the engine: teams are optional for events-only feeds.

use matchday_core::error::AppError;
use matchday_core::traits::{SourcePayload, SportsSource};
use tracing::info;

const BASE_URL: &str = "https://api.motogp.com";

#[derive(Debug, Clone, Copy, Default)]
pub struct MotoGpSource;

impl SportsSource for MotoGpSource {
    async fn fetch(&self, sport_id: i32) -> Result<SourcePayload, AppError> {
        info!(sport_id, "MotoGP feed not yet integrated, syncing empty schedule");
        Ok(SourcePayload {
            teams: Vec::new(),
            events: Vec::new(),
            raw: serde_json::json!({ "events": [] }),
            endpoint: format!("{}/calendar", BASE_URL),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/calendar", BASE_URL)
    }
}
