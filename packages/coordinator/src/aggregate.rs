//! Reduction of one poll's incidents into a [`CoordinatorData`] snapshot.

use std::collections::BTreeMap;

use emergency_watch_incident_models::{
    AlertLevel, Coordinate, CoordinatorData, EmergencyIncident, InstanceType,
};

/// Builds snapshots for one instance.
///
/// The radius is fixed at construction, so instances with different radii
/// never share aggregation state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregator {
    instance_type: InstanceType,
    radius_km: Option<f64>,
}

impl Aggregator {
    /// Whole-state aggregation: no radius, no nearest, no containment.
    #[must_use]
    pub const fn state() -> Self {
        Self {
            instance_type: InstanceType::State,
            radius_km: None,
        }
    }

    /// Aggregation around a monitored point.
    #[must_use]
    pub const fn point(instance_type: InstanceType, radius_km: f64) -> Self {
        Self {
            instance_type,
            radius_km: Some(radius_km),
        }
    }

    /// Instance type stamped on every snapshot.
    #[must_use]
    pub const fn instance_type(&self) -> InstanceType {
        self.instance_type
    }

    /// Nearby radius in kilometres. `None` for state instances, which
    /// report the highest alert level across the whole feed.
    #[must_use]
    pub const fn radius_km(&self) -> Option<f64> {
        self.radius_km
    }

    /// An empty snapshot for a monitored point, e.g. when the point lies
    /// outside every state and nothing was fetched.
    #[must_use]
    pub fn empty(&self, location: Option<Coordinate>) -> CoordinatorData {
        self.aggregate(Vec::new(), location)
    }

    /// Reduces `incidents` into a snapshot.
    ///
    /// `reference` is the monitored point the incidents were normalized
    /// against; it is recorded in the snapshot as-is.
    #[must_use]
    pub fn aggregate(
        &self,
        mut incidents: Vec<EmergencyIncident>,
        reference: Option<Coordinate>,
    ) -> CoordinatorData {
        // Stable, so equal distances keep feed order.
        incidents.sort_by(|a, b| sort_distance(a).total_cmp(&sort_distance(b)));

        let mut incidents_by_type: BTreeMap<String, usize> = BTreeMap::new();
        for incident in &incidents {
            *incidents_by_type
                .entry(incident.event_type.clone())
                .or_insert(0) += 1;
        }

        let mut data = CoordinatorData::empty(self.instance_type);
        data.total_count = incidents.len();
        data.incidents_by_type = incidents_by_type;
        data.current_latitude = reference.map(|c| c.latitude);
        data.current_longitude = reference.map(|c| c.longitude);

        match self.radius_km {
            None => {
                data.highest_alert_level =
                    AlertLevel::highest(incidents.iter().map(|i| i.alert_level));
            }
            Some(radius_km) => {
                let nearby: Vec<&EmergencyIncident> = incidents
                    .iter()
                    .filter(|i| i.distance_km.is_some_and(|d| d <= radius_km))
                    .collect();

                data.radius_km = Some(radius_km);
                data.nearby_count = Some(nearby.len());
                data.highest_alert_level =
                    AlertLevel::highest(nearby.iter().map(|i| i.alert_level));
                data.nearest_incident = incidents.first().cloned();
                data.nearest_distance_km = incidents.first().and_then(|i| i.distance_km);

                let containing: Vec<EmergencyIncident> =
                    incidents.iter().filter(|i| i.contains_point).cloned().collect();
                let any_at_least = |threshold: AlertLevel| {
                    containing.iter().any(|i| i.alert_level.at_least(threshold))
                };

                data.inside_polygon = !containing.is_empty();
                data.inside_emergency_warning = any_at_least(AlertLevel::Extreme);
                data.inside_watch_and_act = any_at_least(AlertLevel::Severe);
                data.inside_advice = any_at_least(AlertLevel::Moderate);
                data.highest_containing_alert_level =
                    AlertLevel::highest(containing.iter().map(|i| i.alert_level));
                data.containing_incidents = containing;
            }
        }

        data.incidents = incidents;
        data
    }
}

fn sort_distance(incident: &EmergencyIncident) -> f64 {
    incident.distance_km.unwrap_or(f64::INFINITY)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use emergency_watch_incident_models::GeometryType;

    use crate::normalize::normalize_all;
    use crate::test_support::{SYDNEY, raw_point, raw_polygon, unit_square_at};

    use super::*;

    fn incident(
        id: &str,
        level: AlertLevel,
        event_type: &str,
        distance_km: Option<f64>,
        contains_point: bool,
    ) -> EmergencyIncident {
        EmergencyIncident {
            id: id.to_string(),
            headline: id.to_string(),
            alert_level: level,
            alert_text: String::new(),
            event_type: event_type.to_string(),
            event_icon: "fire".to_string(),
            status: None,
            size: None,
            source: "Unknown".to_string(),
            location: Coordinate::new(-33.0, 151.0),
            updated: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            distance_km,
            bearing: None,
            direction: None,
            geometry_type: GeometryType::Point,
            polygons: None,
            has_polygon: false,
            contains_point,
        }
    }

    #[test]
    fn sorts_by_distance_with_unknown_last() {
        let data = Aggregator::point(InstanceType::Zone, 50.0).aggregate(
            vec![
                incident("unknown", AlertLevel::None, "Flood", None, false),
                incident("far", AlertLevel::None, "Flood", Some(40.0), false),
                incident("near", AlertLevel::None, "Flood", Some(5.0), false),
            ],
            Some(SYDNEY),
        );

        let ids: Vec<&str> = data.incidents.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "far", "unknown"]);
        assert_eq!(data.nearest_incident.unwrap().id, "near");
        assert_eq!(data.nearest_distance_km, Some(5.0));
    }

    #[test]
    fn point_outside_radius_is_not_nearby() {
        let incidents = normalize_all(
            &[raw_point("A", 151.0, -33.0, "severe", "Bushfire")],
            Some(SYDNEY),
            Utc::now(),
        );
        let data = Aggregator::point(InstanceType::Zone, 50.0).aggregate(incidents, Some(SYDNEY));

        assert_eq!(data.total_count, 1);
        assert_eq!(data.nearby_count, Some(0));
        assert_eq!(data.highest_alert_level, AlertLevel::None);
        assert_eq!(data.highest_alert_level.as_ref(), "");
        assert!(!data.active_alert());
        assert_eq!(data.current_latitude, Some(SYDNEY.latitude));
    }

    #[test]
    fn highest_alert_uses_nearby_only() {
        let data = Aggregator::point(InstanceType::Person, 50.0).aggregate(
            vec![
                incident("a", AlertLevel::Moderate, "Flood", Some(10.0), false),
                incident("b", AlertLevel::Extreme, "Bushfire", Some(60.0), false),
                incident("c", AlertLevel::Severe, "Storm", Some(20.0), false),
            ],
            Some(SYDNEY),
        );

        assert_eq!(data.nearby_count, Some(2));
        assert_eq!(data.highest_alert_level, AlertLevel::Severe);
        assert!(data.has_watch_and_act());
        assert!(!data.has_emergency_warning());
    }

    #[test]
    fn counts_types_over_all_incidents() {
        let data = Aggregator::point(InstanceType::Zone, 10.0).aggregate(
            vec![
                incident("a", AlertLevel::None, "Flood", Some(1.0), false),
                incident("b", AlertLevel::None, "Flood", Some(100.0), false),
                incident("c", AlertLevel::None, "Bushfire", None, false),
            ],
            Some(SYDNEY),
        );

        assert_eq!(data.incidents_by_type.get("Flood"), Some(&2));
        assert_eq!(data.incidents_by_type.get("Bushfire"), Some(&1));
    }

    #[test]
    fn state_mode_aggregates_everything() {
        let data = Aggregator::state().aggregate(
            vec![
                incident("a", AlertLevel::Minor, "Flood", None, false),
                incident("b", AlertLevel::Extreme, "Bushfire", None, false),
            ],
            None,
        );

        assert_eq!(data.instance_type, InstanceType::State);
        assert_eq!(data.nearby_count, None);
        assert_eq!(data.radius_km, None);
        assert!(data.nearest_incident.is_none());
        assert!(data.nearest_distance_km.is_none());
        assert_eq!(data.highest_alert_level, AlertLevel::Extreme);
        assert!(data.active_alert());
        assert!(!data.inside_polygon);
        assert!(data.current_latitude.is_none());
    }

    #[test]
    fn containment_thresholds_are_monotonic() {
        let data = Aggregator::point(InstanceType::Zone, 50.0).aggregate(
            vec![
                incident("advice", AlertLevel::Moderate, "Bushfire", Some(2.0), true),
                incident("watch", AlertLevel::Severe, "Bushfire", Some(3.0), true),
                incident("outside", AlertLevel::Extreme, "Bushfire", Some(4.0), false),
            ],
            Some(SYDNEY),
        );

        assert!(data.inside_polygon);
        assert_eq!(data.containing_incidents.len(), 2);
        assert!(!data.inside_emergency_warning);
        assert!(data.inside_watch_and_act);
        assert!(data.inside_advice);
        assert_eq!(data.highest_containing_alert_level, AlertLevel::Severe);
    }

    #[test]
    fn minor_containment_sets_no_threshold() {
        let data = Aggregator::point(InstanceType::Zone, 50.0).aggregate(
            vec![incident("info", AlertLevel::Minor, "Flood", Some(1.0), true)],
            Some(SYDNEY),
        );

        assert!(data.inside_polygon);
        assert!(!data.inside_advice);
        assert_eq!(data.highest_containing_alert_level, AlertLevel::Minor);
    }

    #[test]
    fn polygon_scenario_from_feed() {
        let reference = Coordinate::new(-33.5, 150.5);
        let incidents = normalize_all(
            &[raw_polygon("P", unit_square_at(150.0, -34.0))],
            Some(reference),
            Utc::now(),
        );
        let data =
            Aggregator::point(InstanceType::Zone, 50.0).aggregate(incidents, Some(reference));

        assert!(data.inside_polygon);
        assert!(data.inside_emergency_warning);
        assert_eq!(data.containing_incidents[0].id, "P");
    }

    #[test]
    fn aggregator_settings_are_stamped_on_snapshots() {
        let state = Aggregator::state();
        assert_eq!(state.instance_type(), InstanceType::State);
        assert_eq!(state.radius_km(), None);
        assert_eq!(state.empty(None).radius_km, state.radius_km());

        let person = Aggregator::point(InstanceType::Person, 25.0);
        assert_eq!(person.instance_type(), InstanceType::Person);
        assert_eq!(person.radius_km(), Some(25.0));
        let data = person.empty(None);
        assert_eq!(data.instance_type, person.instance_type());
        assert_eq!(data.radius_km, person.radius_km());
    }

    #[test]
    fn empty_snapshot_records_location() {
        let data =
            Aggregator::point(InstanceType::Person, 25.0).empty(Some(Coordinate::new(1.0, 2.0)));
        assert_eq!(data.total_count, 0);
        assert_eq!(data.nearby_count, Some(0));
        assert_eq!(data.radius_km, Some(25.0));
        assert_eq!(data.current_longitude, Some(2.0));
        assert!(data.location_available);
    }
}
