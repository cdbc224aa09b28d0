//! `GeoJSON` rendering of incident polygons for map display.

use emergency_watch_incident_models::{EmergencyIncident, Ring, StoredPolygon};
use geojson::{Geometry, Value};

/// Renders an incident's polygon set as a `GeoJSON` geometry.
///
/// A single polygon becomes a `Polygon`, several become a `MultiPolygon`.
/// Returns `None` when the incident carries no polygons.
#[must_use]
pub fn incident_geojson(incident: &EmergencyIncident) -> Option<Geometry> {
    let polygons = incident.polygons.as_deref()?;

    match polygons {
        [] => None,
        [single] => Some(Geometry::new(Value::Polygon(polygon_rings(single)))),
        many => Some(Geometry::new(Value::MultiPolygon(
            many.iter().map(polygon_rings).collect(),
        ))),
    }
}

fn polygon_rings(polygon: &StoredPolygon) -> Vec<Vec<Vec<f64>>> {
    std::iter::once(&polygon.outer_ring)
        .chain(polygon.inner_rings.iter().flatten())
        .map(ring_positions)
        .collect()
}

fn ring_positions(ring: &Ring) -> Vec<Vec<f64>> {
    ring.iter().map(|p| vec![p[0], p[1]]).collect()
}
