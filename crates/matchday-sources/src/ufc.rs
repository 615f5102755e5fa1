//! UFC adapter.
//!
//! There is no public UFC schedule API; the official feed sits behind
//! authenticated access. Until that integration lands this adapter emits
//! one placeholder card shaped like a real one: the headline fighters as
//! participant "teams" and the card as a standalone numbered event
//! referencing them, so the fight-sport path through reconciliation
//! (participant resolution included) stays exercised.

use chrono::{Duration, Utc};
use matchday_core::error::AppError;
use matchday_core::models::{CanonicalEvent, CanonicalTeam, EventStatus};
use matchday_core::traits::{SourcePayload, SportsSource};
use tracing::info;

const BASE_URL: &str = "https://api.ufc.com";

#[derive(Debug, Clone, Copy, Default)]
pub struct UfcSource;

impl SportsSource for UfcSource {
    async fn fetch(&self, sport_id: i32) -> Result<SourcePayload, AppError> {
        info!(sport_id, "UFC feed not yet integrated, syncing placeholder card");

        let fighters = vec![
            fighter("ufc-fighter-tbd-1", "TBD (Red Corner)"),
            fighter("ufc-fighter-tbd-2", "TBD (Blue Corner)"),
        ];

        let start = Utc::now() + Duration::days(30);
        let event = CanonicalEvent {
            external_id: "ufc-300".to_string(),
            league: "UFC".to_string(),
            title: "UFC 300".to_string(),
            description: None,
            start_time: start,
            end_time: None,
            timezone: "UTC".to_string(),
            venue: Some("T-Mobile Arena".to_string()),
            status: EventStatus::Scheduled,
            parent_external_id: None,
            session_type: None,
            team_external_ids: fighters.iter().map(|f| f.external_id.clone()).collect(),
            metadata: serde_json::json!({
                "eventNumber": 300,
                "mainEvent": "TBD vs TBD",
                "location": "Las Vegas, NV",
            }),
        };

        Ok(SourcePayload {
            teams: fighters,
            events: vec![event],
            raw: serde_json::json!({ "events": ["UFC 300"] }),
            endpoint: format!("{}/events", BASE_URL),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/events", BASE_URL)
    }
}

fn fighter(external_id: &str, name: &str) -> CanonicalTeam {
    CanonicalTeam::new(external_id, name)
}
