//! Mapping of raw feed records to [`EmergencyIncident`]s relative to a
//! monitored point.

use chrono::{DateTime, Utc};
use emergency_watch_feed_models::RawEmergency;
use emergency_watch_incident_models::{
    AlertLevel, Coordinate, EmergencyIncident, GeometryType, StoredGeometry,
    parsing::parse_timestamp,
};
use emergency_watch_spatial::{
    Extracted, bearing_to_direction, calculate_distance, extract_geometry, get_bearing,
    point_in_polygons,
};

/// Agency reported when the feed omits one.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Normalizes one raw record.
///
/// `reference` is the monitored point; `None` (state mode) leaves
/// distance, bearing, and direction unset and never marks containment.
/// Returns `None` when no representative location can be extracted.
#[must_use]
pub fn normalize(
    raw: &RawEmergency,
    reference: Option<Coordinate>,
    now: DateTime<Utc>,
) -> Option<EmergencyIncident> {
    let Extracted { location, geometry } = extract_geometry(&raw.geometry);
    let Some(location) = location else {
        log::warn!(
            "Could not extract location for emergency {} ({})",
            raw.id,
            raw.geometry.type_name()
        );
        return None;
    };
    let geometry = geometry.unwrap_or(StoredGeometry {
        geometry_type: GeometryType::Point,
        polygons: None,
    });

    let mut distance_km = None;
    let mut bearing = None;
    let mut direction = None;
    let mut contains_point = false;

    if let Some(from) = reference {
        distance_km = Some(calculate_distance(
            from.latitude,
            from.longitude,
            location.latitude,
            location.longitude,
        ));
        let b = get_bearing(
            from.latitude,
            from.longitude,
            location.latitude,
            location.longitude,
        );
        bearing = Some(b);
        direction = Some(bearing_to_direction(b));
        contains_point = point_in_polygons(&from, geometry.polygons.as_deref());
    }

    let updated = raw
        .updated_time()
        .and_then(parse_timestamp)
        .unwrap_or_else(|| {
            log::debug!("Emergency {} has no usable update time, using now", raw.id);
            now
        });

    let card = raw.card_body.as_ref();
    let has_polygon = geometry.has_polygon();

    Some(EmergencyIncident {
        id: raw.id.clone(),
        headline: raw.headline.clone(),
        alert_level: AlertLevel::from_feed(&raw.alert_level_info_prepared.level),
        alert_text: raw.alert_level_info_prepared.text.clone(),
        event_type: raw.event_label_prepared.label_text.clone(),
        event_icon: raw.event_label_prepared.icon.clone(),
        status: card.and_then(|c| c.status.clone()),
        size: card.and_then(|c| c.size.clone()),
        source: card
            .and_then(|c| c.source.clone())
            .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
        location,
        updated,
        distance_km,
        bearing,
        direction,
        geometry_type: geometry.geometry_type,
        polygons: geometry.polygons,
        has_polygon,
        contains_point,
    })
}

/// Normalizes every record, dropping those without a usable location.
#[must_use]
pub fn normalize_all(
    emergencies: &[RawEmergency],
    reference: Option<Coordinate>,
    now: DateTime<Utc>,
) -> Vec<EmergencyIncident> {
    emergencies
        .iter()
        .filter_map(|raw| normalize(raw, reference, now))
        .collect()
}
