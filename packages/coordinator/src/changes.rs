//! Detection of new incidents and polygon transitions between polls.
//!
//! The detector moves through three phases:
//!
//! * `Uninitialized`: nothing loaded yet.
//! * `Loaded`: persisted state read. If nothing was stored, the next poll
//!   is a first refresh and only seeds the seen set.
//! * `Updated`: at least one poll processed; every poll diffs.
//!
//! Identity is purely the feed ID: a re-issued warning with the same ID is
//! not new.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use emergency_watch_incident_models::{CoordinatorData, EmergencyIncident};
use emergency_watch_store::{LoadedSeen, SeenState, SeenStore, seen};

/// A change detected between two polls.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// First time this ID appears.
    New(EmergencyIncident),
    /// The monitored point is now inside this incident's polygons.
    Entered(EmergencyIncident),
    /// The monitored point is no longer inside this incident's polygons,
    /// or the incident disappeared. Carries the last known snapshot.
    Exited(EmergencyIncident),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Loaded { first_refresh: bool },
    Updated,
}

/// Per-instance change tracker backed by a [`SeenStore`].
pub struct ChangeDetector {
    store: Arc<dyn SeenStore>,
    retention_days: u32,
    phase: Phase,
    state: SeenState,
    /// Incidents from the previous poll, used to describe exits of incidents
    /// that vanished from the feed.
    last_incidents: BTreeMap<String, EmergencyIncident>,
}

impl ChangeDetector {
    /// `retention_days` is clamped into the supported retention range.
    #[must_use]
    pub fn new(store: Arc<dyn SeenStore>, retention_days: u32) -> Self {
        Self {
            store,
            retention_days: seen::clamp_retention_days(retention_days),
            phase: Phase::Uninitialized,
            state: SeenState::default(),
            last_incidents: BTreeMap::new(),
        }
    }

    pub const fn set_retention_days(&mut self, retention_days: u32) {
        self.retention_days = seen::clamp_retention_days(retention_days);
    }

    #[must_use]
    pub const fn retention_days(&self) -> u32 {
        self.retention_days
    }

    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        !matches!(self.phase, Phase::Uninitialized)
    }

    /// Whether the next poll only seeds the seen set.
    #[must_use]
    pub const fn is_first_refresh(&self) -> bool {
        matches!(
            self.phase,
            Phase::Uninitialized | Phase::Loaded { first_refresh: true }
        )
    }

    /// The current seen state.
    #[must_use]
    pub const fn state(&self) -> &SeenState {
        &self.state
    }

    /// Loads persisted state. Legacy documents are upgraded and saved
    /// straight away.
    pub async fn load(&mut self, now: DateTime<Utc>) {
        let loaded = seen::load(self.store.as_ref(), now, self.retention_days).await;

        let first_refresh = match loaded {
            LoadedSeen::Absent => {
                self.state = SeenState::default();
                true
            }
            LoadedSeen::Current(state) => {
                log::debug!("Loaded {} previously seen incident IDs", state.seen.len());
                self.state = state;
                false
            }
            LoadedSeen::Legacy(state) => {
                self.state = state;
                seen::save(self.store.as_ref(), &self.state).await;
                false
            }
        };

        self.phase = Phase::Loaded { first_refresh };
    }

    /// Diffs `data` against the seen state, then records `data` as seen
    /// and persists it.
    ///
    /// Returns no transitions on a first refresh or when the snapshot has
    /// no known location (the seen state is left untouched in that case).
    pub async fn process(
        &mut self,
        data: &CoordinatorData,
        now: DateTime<Utc>,
    ) -> Vec<Transition> {
        if !self.is_loaded() {
            self.load(now).await;
        }

        if !data.location_available {
            log::debug!("Skipping change detection: location unavailable");
            return Vec::new();
        }

        let purged = self.state.purge(now, self.retention_days);
        if purged > 0 {
            log::debug!("Purged {purged} expired seen incidents");
        }

        let transitions = if self.is_first_refresh() {
            log::debug!(
                "First refresh, seeding {} incident IDs without notifications",
                data.incidents.len()
            );
            Vec::new()
        } else {
            self.diff(data)
        };

        let point_mode = data.instance_type.monitors_point();
        let containing = data
            .incidents
            .iter()
            .filter(|i| point_mode && i.contains_point)
            .map(|i| i.id.as_str());
        self.state
            .refresh(data.incidents.iter().map(|i| i.id.as_str()), containing, now);
        self.last_incidents = data
            .incidents
            .iter()
            .map(|i| (i.id.clone(), i.clone()))
            .collect();
        self.phase = Phase::Updated;

        seen::save(self.store.as_ref(), &self.state).await;

        transitions
    }

    fn diff(&self, data: &CoordinatorData) -> Vec<Transition> {
        let mut transitions: Vec<Transition> = data
            .incidents
            .iter()
            .filter(|i| !self.state.contains(&i.id))
            .cloned()
            .map(Transition::New)
            .collect();

        if !data.instance_type.monitors_point() {
            return transitions;
        }

        for incident in data.incidents.iter().filter(|i| i.contains_point) {
            let previously_contained =
                self.state.contains(&incident.id) && self.state.containing.contains(&incident.id);
            if !previously_contained {
                transitions.push(Transition::Entered(incident.clone()));
            }
        }

        let current: BTreeMap<&str, &EmergencyIncident> =
            data.incidents.iter().map(|i| (i.id.as_str(), i)).collect();
        for id in &self.state.containing {
            match current.get(id.as_str()) {
                Some(incident) if !incident.contains_point => {
                    transitions.push(Transition::Exited((*incident).clone()));
                }
                Some(_) => {}
                None => match self.last_incidents.get(id) {
                    Some(last) => transitions.push(Transition::Exited(last.clone())),
                    None => log::info!("Exited incident {id} (no longer in feed)"),
                },
            }
        }

        transitions
    }

    /// Deletes persisted state, e.g. when the instance is removed.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the state cannot be deleted.
    pub async fn remove(&mut self) -> Result<(), emergency_watch_store::StoreError> {
        self.store.remove().await?;
        self.state = SeenState::default();
        self.last_incidents.clear();
        self.phase = Phase::Uninitialized;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use emergency_watch_incident_models::{AlertLevel, Coordinate, GeometryType, InstanceType};
    use emergency_watch_store::MemoryStore;
    use serde_json::json;

    use crate::aggregate::Aggregator;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn incident(id: &str, contains_point: bool) -> EmergencyIncident {
        EmergencyIncident {
            id: id.to_string(),
            headline: format!("Incident {id}"),
            alert_level: AlertLevel::Severe,
            alert_text: "Watch and Act".to_string(),
            event_type: "Bushfire".to_string(),
            event_icon: "fire".to_string(),
            status: None,
            size: None,
            source: "Unknown".to_string(),
            location: Coordinate::new(-33.0, 151.0),
            updated: now(),
            distance_km: Some(1.0),
            bearing: Some(0.0),
            direction: None,
            geometry_type: GeometryType::Polygon,
            polygons: None,
            has_polygon: true,
            contains_point,
        }
    }

    fn zone(incidents: Vec<EmergencyIncident>) -> CoordinatorData {
        Aggregator::point(InstanceType::Zone, 50.0)
            .aggregate(incidents, Some(Coordinate::new(-33.0, 151.0)))
    }

    fn state(incidents: Vec<EmergencyIncident>) -> CoordinatorData {
        Aggregator::state().aggregate(incidents, None)
    }

    fn detector(store: &Arc<MemoryStore>) -> ChangeDetector {
        ChangeDetector::new(store.clone(), 30)
    }

    fn new_ids(transitions: &[Transition]) -> Vec<&str> {
        transitions
            .iter()
            .filter_map(|t| match t {
                Transition::New(i) => Some(i.id.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn first_refresh_is_silent() {
        let store = Arc::new(MemoryStore::new());
        let mut detector = detector(&store);

        let transitions = detector
            .process(&zone(vec![incident("A", true)]), now())
            .await;

        assert!(transitions.is_empty());
        assert!(detector.state().contains("A"));
        assert!(!detector.is_first_refresh());
        assert_eq!(store.save_count().await, 1);
    }

    #[tokio::test]
    async fn second_poll_reports_only_new_ids() {
        let store = Arc::new(MemoryStore::new());
        let mut detector = detector(&store);

        detector.process(&state(vec![incident("A", false)]), now()).await;
        let transitions = detector
            .process(
                &state(vec![incident("A", false), incident("B", false)]),
                now(),
            )
            .await;

        assert_eq!(new_ids(&transitions), vec!["B"]);
        assert_eq!(transitions.len(), 1);
        assert_eq!(
            detector.state().seen.keys().collect::<Vec<_>>(),
            vec!["A", "B"]
        );
    }

    #[tokio::test]
    async fn unchanged_feed_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let mut detector = detector(&store);
        let data = zone(vec![incident("A", true), incident("B", false)]);

        detector.process(&data, now()).await;
        assert!(detector.process(&data, now()).await.is_empty());
        let state_after_second = detector.state().clone();
        let saved_after_second = store.snapshot().await;

        assert!(detector.process(&data, now()).await.is_empty());
        assert_eq!(detector.state(), &state_after_second);
        assert_eq!(store.snapshot().await, saved_after_second);
        assert_eq!(
            detector.state().containing.iter().collect::<Vec<_>>(),
            vec!["A"]
        );
    }

    #[tokio::test]
    async fn retention_below_minimum_is_clamped() {
        let store = Arc::new(MemoryStore::new());
        let mut detector = ChangeDetector::new(store.clone(), 0);
        assert_eq!(detector.retention_days(), seen::MIN_RETENTION_DAYS);

        detector.set_retention_days(0);
        assert_eq!(detector.retention_days(), seen::MIN_RETENTION_DAYS);
        detector.set_retention_days(10_000);
        assert_eq!(detector.retention_days(), seen::MAX_RETENTION_DAYS);

        // Clamped to a week, so a day-old entry is still remembered.
        let yesterday = (now() - Duration::days(1)).to_rfc3339();
        let store = Arc::new(MemoryStore::with_data(json!({
            "seen_incidents": {"A": yesterday}
        })));
        let mut detector = ChangeDetector::new(store, 0);
        let transitions = detector
            .process(&state(vec![incident("A", false)]), now())
            .await;
        assert!(transitions.is_empty());
        assert!(detector.state().contains("A"));
    }

    #[tokio::test]
    async fn removed_ids_drop_out_immediately() {
        let store = Arc::new(MemoryStore::new());
        let mut detector = detector(&store);

        detector.process(&state(vec![incident("A", false)]), now()).await;
        detector.process(&state(vec![]), now()).await;
        let transitions = detector
            .process(&state(vec![incident("A", false)]), now())
            .await;

        assert_eq!(new_ids(&transitions), vec!["A"]);
    }

    #[tokio::test]
    async fn existing_store_is_not_first_refresh() {
        let store = Arc::new(MemoryStore::with_data(json!({
            "seen_incidents": {"A": "2025-05-31T00:00:00+00:00"}
        })));
        let mut detector = detector(&store);
        detector.load(now()).await;
        assert!(!detector.is_first_refresh());

        let transitions = detector
            .process(
                &state(vec![incident("A", false), incident("B", false)]),
                now(),
            )
            .await;
        assert_eq!(new_ids(&transitions), vec!["B"]);
    }

    #[tokio::test]
    async fn legacy_store_is_upgraded_and_saved() {
        let store = Arc::new(MemoryStore::with_data(json!({"seen_ids": ["A", "B"]})));
        let mut detector = detector(&store);

        detector.load(now()).await;

        assert!(!detector.is_first_refresh());
        assert_eq!(store.save_count().await, 1);
        let saved = store.snapshot().await.unwrap();
        assert!(saved.get("seen_ids").is_none());
        assert!(saved["seen_incidents"]["A"].is_string());

        let transitions = detector
            .process(
                &state(vec![incident("A", false), incident("C", false)]),
                now(),
            )
            .await;
        assert_eq!(new_ids(&transitions), vec!["C"]);
    }

    #[tokio::test]
    async fn unrecognised_store_is_first_refresh() {
        let store = Arc::new(MemoryStore::with_data(json!({"invalid": "data"})));
        let mut detector = detector(&store);
        detector.load(now()).await;
        assert!(detector.is_first_refresh());
    }

    #[tokio::test]
    async fn expired_entries_are_renotified() {
        let old = (now() - Duration::days(45)).to_rfc3339();
        let store = Arc::new(MemoryStore::with_data(json!({
            "seen_incidents": {"A": old, "B": "2025-05-31T00:00:00+00:00"}
        })));
        let mut detector = detector(&store);
        detector.load(now()).await;

        assert!(!detector.state().contains("A"));
        assert!(detector.state().contains("B"));

        let transitions = detector
            .process(
                &state(vec![incident("A", false), incident("B", false)]),
                now(),
            )
            .await;
        assert_eq!(new_ids(&transitions), vec!["A"]);
    }

    #[tokio::test]
    async fn entered_and_exited_polygon() {
        let store = Arc::new(MemoryStore::new());
        let mut detector = detector(&store);

        detector.process(&zone(vec![incident("A", false)]), now()).await;

        let entered = detector.process(&zone(vec![incident("A", true)]), now()).await;
        assert_eq!(entered, vec![Transition::Entered(incident("A", true))]);

        let exited = detector.process(&zone(vec![incident("A", false)]), now()).await;
        assert_eq!(exited, vec![Transition::Exited(incident("A", false))]);
    }

    #[tokio::test]
    async fn new_containing_incident_is_new_and_entered() {
        let store = Arc::new(MemoryStore::new());
        let mut detector = detector(&store);

        detector.process(&zone(vec![]), now()).await;
        let transitions = detector.process(&zone(vec![incident("A", true)]), now()).await;

        assert_eq!(
            transitions,
            vec![
                Transition::New(incident("A", true)),
                Transition::Entered(incident("A", true)),
            ]
        );
    }

    #[tokio::test]
    async fn vanished_containing_incident_exits_with_last_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let mut detector = detector(&store);

        detector.process(&zone(vec![incident("A", true)]), now()).await;
        let transitions = detector.process(&zone(vec![]), now()).await;

        assert_eq!(transitions, vec![Transition::Exited(incident("A", true))]);
    }

    #[tokio::test]
    async fn containment_survives_restart() {
        let store = Arc::new(MemoryStore::new());
        detector(&store)
            .process(&zone(vec![incident("A", true)]), now())
            .await;

        let mut restarted = detector(&store);
        let unchanged = restarted.process(&zone(vec![incident("A", true)]), now()).await;
        assert!(unchanged.is_empty());

        // No in-memory snapshot after a restart, so a vanished incident is
        // only logged.
        let mut restarted = detector(&store);
        assert!(restarted.process(&zone(vec![]), now()).await.is_empty());
    }

    #[tokio::test]
    async fn state_mode_never_reports_containment() {
        let store = Arc::new(MemoryStore::new());
        let mut detector = detector(&store);

        detector.process(&state(vec![]), now()).await;
        let transitions = detector.process(&state(vec![incident("A", true)]), now()).await;

        assert_eq!(transitions, vec![Transition::New(incident("A", true))]);
        assert!(detector.state().containing.is_empty());
    }

    #[tokio::test]
    async fn unavailable_location_leaves_state_untouched() {
        let store = Arc::new(MemoryStore::new());
        let mut detector = detector(&store);
        detector.process(&zone(vec![incident("A", false)]), now()).await;

        let mut unknown = CoordinatorData::empty(InstanceType::Person);
        unknown.location_available = false;
        assert!(detector.process(&unknown, now()).await.is_empty());
        assert!(detector.state().contains("A"));
        assert_eq!(store.save_count().await, 1);
    }

    #[tokio::test]
    async fn remove_clears_store() {
        let store = Arc::new(MemoryStore::new());
        let mut detector = detector(&store);
        detector.process(&zone(vec![incident("A", false)]), now()).await;

        detector.remove().await.unwrap();

        assert!(store.snapshot().await.is_none());
        assert!(!detector.is_loaded());
    }
}
