//! Formula 1 adapter over the Ergast API.
//!
//! Ergast API reference: <https://ergast.com/mrd/>
//!
//! Two endpoints are fetched per sync: the current season's constructors
//! (who become the catalog's teams) and its race schedule. Each race
//! weekend expands into a parent race event plus one child event per
//! session the feed carries (practice, qualifying, sprint).

use chrono::{DateTime, Datelike, Utc};
use matchday_core::error::AppError;
use matchday_core::models::{CanonicalEvent, CanonicalTeam, EventStatus};
use matchday_core::traits::{KeyValueCache, SourcePayload, SportsSource};
use serde::Deserialize;
use serde_json::Value;

use crate::client::SourceClient;

const DEFAULT_BASE_URL: &str = "https://ergast.com/api/f1";

/// Session start time used when the feed omits one.
const DEFAULT_TIME: &str = "14:00:00Z";

// =============================================================================
// Ergast response models
// =============================================================================

#[derive(Debug, Deserialize)]
struct ErgastEnvelope<T> {
    #[serde(rename = "MRData")]
    mr_data: T,
}

#[derive(Debug, Deserialize)]
struct ConstructorData {
    #[serde(rename = "ConstructorTable")]
    constructor_table: ConstructorTable,
}

#[derive(Debug, Deserialize)]
struct ConstructorTable {
    #[serde(rename = "Constructors", default)]
    constructors: Vec<ErgastConstructor>,
}

#[derive(Debug, Deserialize)]
struct ErgastConstructor {
    #[serde(rename = "constructorId")]
    constructor_id: String,
    name: String,
    nationality: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScheduleData {
    #[serde(rename = "RaceTable")]
    race_table: RaceTable,
}

#[derive(Debug, Deserialize)]
struct RaceTable {
    #[serde(rename = "Races", default)]
    races: Vec<ErgastRace>,
}

#[derive(Debug, Deserialize)]
struct ErgastRace {
    #[serde(rename = "raceName")]
    race_name: String,
    date: String,
    time: Option<String>,
    #[serde(rename = "Circuit")]
    circuit: ErgastCircuit,
    #[serde(rename = "FirstPractice")]
    first_practice: Option<ErgastSession>,
    #[serde(rename = "SecondPractice")]
    second_practice: Option<ErgastSession>,
    #[serde(rename = "ThirdPractice")]
    third_practice: Option<ErgastSession>,
    #[serde(rename = "Qualifying")]
    qualifying: Option<ErgastSession>,
    #[serde(rename = "Sprint")]
    sprint: Option<ErgastSession>,
}

#[derive(Debug, Deserialize)]
struct ErgastCircuit {
    #[serde(rename = "circuitName")]
    circuit_name: String,
    #[serde(rename = "Location")]
    location: ErgastLocation,
}

#[derive(Debug, Deserialize)]
struct ErgastLocation {
    locality: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct ErgastSession {
    date: String,
    time: Option<String>,
}

// =============================================================================
// Adapter
// =============================================================================

/// Formula 1 source over Ergast.
#[derive(Debug, Clone)]
pub struct F1Source<C> {
    client: SourceClient<C>,
    base_url: String,
}

impl<C: KeyValueCache> F1Source<C> {
    pub fn new(client: SourceClient<C>) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the Ergast base URL, for mirrors and tests.
    pub fn with_base_url(client: SourceClient<C>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn teams_from(raw: &Value) -> Result<Vec<CanonicalTeam>, AppError> {
        let envelope: ErgastEnvelope<ConstructorData> = serde_json::from_value(raw.clone())?;
        Ok(envelope
            .mr_data
            .constructor_table
            .constructors
            .into_iter()
            .map(|c| {
                let mut team = CanonicalTeam::new(c.constructor_id, c.name);
                team.country = c.nationality;
                team
            })
            .collect())
    }

    fn events_from(raw: &Value, year: i32, now: DateTime<Utc>) -> Result<Vec<CanonicalEvent>, AppError> {
        let envelope: ErgastEnvelope<ScheduleData> = serde_json::from_value(raw.clone())?;
        let races = envelope.mr_data.race_table.races;

        let mut events = Vec::new();
        for (index, race) in races.iter().enumerate() {
            let weekend_id = format!("{}-{}", year, slugify(&race.race_name));
            let start = parse_start(&race.date, race.time.as_deref())?;

            events.push(CanonicalEvent {
                external_id: weekend_id.clone(),
                league: "Formula 1".to_string(),
                title: race.race_name.clone(),
                description: None,
                start_time: start,
                end_time: None,
                timezone: "UTC".to_string(),
                venue: Some(race.circuit.circuit_name.clone()),
                status: EventStatus::from_start_time(start, now),
                parent_external_id: None,
                session_type: None,
                team_external_ids: Vec::new(),
                metadata: serde_json::json!({
                    "round": index + 1,
                    "season": year,
                    "location": format!(
                        "{}, {}",
                        race.circuit.location.locality, race.circuit.location.country
                    ),
                }),
            });

            let sessions = [
                ("FP1", &race.first_practice),
                ("FP2", &race.second_practice),
                ("FP3", &race.third_practice),
                ("Qualifying", &race.qualifying),
                ("Sprint", &race.sprint),
            ];
            for (label, session) in sessions {
                let Some(session) = session else { continue };
                let start = parse_start(&session.date, session.time.as_deref())?;
                events.push(CanonicalEvent {
                    external_id: format!("{}-{}", weekend_id, label.to_lowercase()),
                    league: "Formula 1".to_string(),
                    title: format!("{} - {}", race.race_name, label),
                    description: None,
                    start_time: start,
                    end_time: None,
                    timezone: "UTC".to_string(),
                    venue: Some(race.circuit.circuit_name.clone()),
                    status: EventStatus::from_start_time(start, now),
                    parent_external_id: Some(weekend_id.clone()),
                    session_type: Some(label.to_lowercase()),
                    team_external_ids: Vec::new(),
                    metadata: serde_json::json!({
                        "mainEventName": race.race_name,
                        "season": year,
                    }),
                });
            }
        }
        Ok(events)
    }
}

impl<C: KeyValueCache> SportsSource for F1Source<C> {
    async fn fetch(&self, sport_id: i32) -> Result<SourcePayload, AppError> {
        let year = Utc::now().year();
        let schedule_url = format!("{}/{}.json", self.base_url, year);
        let constructors_url = format!("{}/{}/constructors.json", self.base_url, year);

        let constructors_raw = self.client.get_json(sport_id, &constructors_url).await?;
        let schedule_raw = self.client.get_json(sport_id, &schedule_url).await?;

        let teams = Self::teams_from(&constructors_raw)?;
        let events = Self::events_from(&schedule_raw, year, Utc::now())?;

        Ok(SourcePayload {
            teams,
            events,
            raw: serde_json::json!({
                "schedule": schedule_raw,
                "constructors": constructors_raw,
            }),
            endpoint: schedule_url,
        })
    }

    fn endpoint(&self) -> String {
        self.base_url.clone()
    }
}

/// Lowercases and hyphenates a race name for use in external ids.
fn slugify(name: &str) -> String {
    name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}

/// Combines an Ergast date and optional time into a UTC instant.
///
/// Ergast dates are `YYYY-MM-DD`, times `HH:MM:SSZ`. Missing times
/// default to 14:00 UTC, matching how race weekends are usually slotted.
fn parse_start(date: &str, time: Option<&str>) -> Result<DateTime<Utc>, AppError> {
    let time = time.unwrap_or(DEFAULT_TIME);
    let combined = format!("{}T{}", date, time);
    combined
        .parse::<DateTime<Utc>>()
        .map_err(|e| AppError::ValidationError(format!("bad start time '{}': {}", combined, e)))
}
