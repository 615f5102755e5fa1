//! Integration tests for ReconcileService.
//!
//! These tests verify the reconciliation pipeline using the in-memory store.

use crate::integration::common::{MockStore, event, payload, session, team};
use matchday_core::ReconcileService;

const SPORT_ID: i32 = 1;

/// When the upstream payload contains rows the store has never seen,
/// reconciliation should insert them all and report them as created.
#[tokio::test]
async fn test_first_sync_creates_everything() {
    // Arrange
    let store = MockStore::new();
    let service = ReconcileService::new(store.clone());
    let p = payload(
        vec![team("red-bull", "Red Bull Racing"), team("ferrari", "Ferrari")],
        vec![event("2026-monaco", "Monaco Grand Prix", 72)],
    );

    // Act
    let report = service.sync_payload(SPORT_ID, &p).await.unwrap();

    // Assert
    assert_eq!(report.teams.created, 2);
    assert_eq!(report.teams.updated, 0);
    assert_eq!(report.events.created, 1);
    assert_eq!(report.events.failed, 0);
    assert_eq!(store.team_count(SPORT_ID), 2);
    assert!(store.get_event(SPORT_ID, "2026-monaco").is_some());
}

/// A second sync of the same payload should update rows in place,
/// never duplicate them.
#[tokio::test]
async fn test_second_sync_updates_in_place() {
    // Arrange
    let store = MockStore::new();
    let service = ReconcileService::new(store.clone());
    let p = payload(
        vec![team("ferrari", "Ferrari")],
        vec![event("2026-monza", "Italian Grand Prix", 100)],
    );
    service.sync_payload(SPORT_ID, &p).await.unwrap();
    let first = store.get_event(SPORT_ID, "2026-monza").unwrap();

    // Act
    let mut p2 = p.clone();
    p2.events[0].title = "Italian Grand Prix (Monza)".to_string();
    let report = service.sync_payload(SPORT_ID, &p2).await.unwrap();

    // Assert
    assert_eq!(report.teams.updated, 1);
    assert_eq!(report.events.updated, 1);
    assert_eq!(report.events.created, 0);
    let second = store.get_event(SPORT_ID, "2026-monza").unwrap();
    assert_eq!(second.id, first.id, "update must keep the row identity");
    assert_eq!(second.title, "Italian Grand Prix (Monza)");
}

/// Sessions referencing a parent event must end up linked to the parent's
/// database id, regardless of payload ordering.
#[tokio::test]
async fn test_sessions_link_to_parent() {
    // Arrange
    let store = MockStore::new();
    let service = ReconcileService::new(store.clone());
    let p = payload(
        vec![],
        vec![
            // Child deliberately listed before its parent
            session("2026-spa-fp1", "Practice 1", "2026-spa", 47),
            event("2026-spa", "Belgian Grand Prix", 48),
        ],
    );

    // Act
    let report = service.sync_payload(SPORT_ID, &p).await.unwrap();

    // Assert
    assert_eq!(report.events.created, 2);
    let parent = store.get_event(SPORT_ID, "2026-spa").unwrap();
    let child = store.get_event(SPORT_ID, "2026-spa-fp1").unwrap();
    assert_eq!(child.parent_event_id, Some(parent.id));
    assert_eq!(child.session_type.as_deref(), Some("practice"));
}

/// A failing row must not abort the cycle: the remaining rows still land,
/// the failure is counted and recorded in the sync error log.
#[tokio::test]
async fn test_row_failure_does_not_abort_cycle() {
    // Arrange
    let store = MockStore::new();
    store.poison("2026-jeddah");
    let service = ReconcileService::new(store.clone());
    let p = payload(
        vec![],
        vec![
            event("2026-jeddah", "Saudi Arabian Grand Prix", 24),
            event("2026-suzuka", "Japanese Grand Prix", 240),
        ],
    );

    // Act
    let report = service.sync_payload(SPORT_ID, &p).await.unwrap();

    // Assert
    assert_eq!(report.events.created, 1);
    assert_eq!(report.events.failed, 1);
    assert!(store.get_event(SPORT_ID, "2026-suzuka").is_some());
    assert!(store.get_event(SPORT_ID, "2026-jeddah").is_none());

    let errors = store.sync_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].sport_id, SPORT_ID);
    assert!(errors[0].message.contains("2026-jeddah"));
}

/// An event's team references resolve to the internal ids of the teams
/// stored in the same cycle.
#[tokio::test]
async fn test_event_links_to_teams_from_same_cycle() {
    // Arrange
    let store = MockStore::new();
    let service = ReconcileService::new(store.clone());
    let mut race = event("2026-monaco", "Monaco Grand Prix", 72);
    race.team_external_ids = vec!["mclaren".to_string(), "ferrari".to_string()];
    let p = payload(
        vec![team("mclaren", "McLaren"), team("ferrari", "Ferrari")],
        vec![race],
    );

    // Act
    service.sync_payload(SPORT_ID, &p).await.unwrap();

    // Assert
    let mclaren = store.get_team(SPORT_ID, "mclaren").unwrap();
    let ferrari = store.get_team(SPORT_ID, "ferrari").unwrap();
    let stored = store.get_event(SPORT_ID, "2026-monaco").unwrap();
    assert_eq!(store.event_team_ids(stored.id), vec![mclaren.id, ferrari.id]);
}

/// An events-only cycle still links participants to teams stored by an
/// earlier cycle.
#[tokio::test]
async fn test_event_links_to_previously_stored_teams() {
    // Arrange: teams arrive in cycle one
    let store = MockStore::new();
    let service = ReconcileService::new(store.clone());
    service
        .sync_payload(SPORT_ID, &payload(vec![team("mclaren", "McLaren")], vec![]))
        .await
        .unwrap();

    // Act: cycle two carries only the event
    let mut race = event("2026-monaco", "Monaco Grand Prix", 72);
    race.team_external_ids = vec!["mclaren".to_string()];
    service
        .sync_payload(SPORT_ID, &payload(vec![], vec![race]))
        .await
        .unwrap();

    // Assert
    let mclaren = store.get_team(SPORT_ID, "mclaren").unwrap();
    let stored = store.get_event(SPORT_ID, "2026-monaco").unwrap();
    assert_eq!(store.event_team_ids(stored.id), vec![mclaren.id]);
}

/// An event stored before its teams were known picks up the participant
/// links on a later sync.
#[tokio::test]
async fn test_update_heals_missing_team_links() {
    // Arrange: first cycle has the event but no teams
    let store = MockStore::new();
    let service = ReconcileService::new(store.clone());
    let mut race = event("2026-monaco", "Monaco Grand Prix", 72);
    race.team_external_ids = vec!["mclaren".to_string()];
    service
        .sync_payload(SPORT_ID, &payload(vec![], vec![race.clone()]))
        .await
        .unwrap();
    let stored = store.get_event(SPORT_ID, "2026-monaco").unwrap();
    assert!(store.event_team_ids(stored.id).is_empty());

    // Act: the team shows up in cycle two
    service
        .sync_payload(SPORT_ID, &payload(vec![team("mclaren", "McLaren")], vec![race]))
        .await
        .unwrap();

    // Assert
    let mclaren = store.get_team(SPORT_ID, "mclaren").unwrap();
    assert_eq!(store.event_team_ids(stored.id), vec![mclaren.id]);
}

/// An empty upstream payload is a valid sync: nothing written, nothing
/// failed, but the snapshot is still taken.
#[tokio::test]
async fn test_empty_payload_is_a_clean_cycle() {
    // Arrange
    let store = MockStore::new();
    let service = ReconcileService::new(store.clone());

    // Act
    let report = service.sync_payload(SPORT_ID, &payload(vec![], vec![])).await.unwrap();

    // Assert
    assert_eq!(report.teams.total(), 0);
    assert_eq!(report.events.total(), 0);
    assert_eq!(store.snapshot_count(), 1);
}

/// Every cycle appends its own snapshot; the history is bounded by
/// expiry, not overwritten.
#[tokio::test]
async fn test_snapshots_accumulate_per_cycle() {
    // Arrange
    let store = MockStore::new();
    let service = ReconcileService::new(store.clone());
    let p = payload(vec![], vec![]);

    // Act
    service.sync_payload(SPORT_ID, &p).await.unwrap();
    service.sync_payload(SPORT_ID, &p).await.unwrap();

    // Assert
    assert_eq!(store.snapshot_count(), 2);
}

/// A failed snapshot write is logged and swallowed; the reconciled rows
/// still count as a successful cycle.
#[tokio::test]
async fn test_snapshot_failure_does_not_fail_cycle() {
    // Arrange
    let store = MockStore::new();
    store.break_snapshots();
    let service = ReconcileService::new(store.clone());
    let p = payload(vec![], vec![event("2026-monza", "Italian Grand Prix", 100)]);

    // Act
    let report = service.sync_payload(SPORT_ID, &p).await.unwrap();

    // Assert
    assert_eq!(report.events.created, 1);
    assert!(store.get_event(SPORT_ID, "2026-monza").is_some());
    assert_eq!(store.snapshot_count(), 0);
}
