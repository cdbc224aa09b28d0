//! Point-in-polygon containment against stored incident polygons.

use emergency_watch_incident_models::{Coordinate, Ring, StoredPolygon};
use geo::{BoundingRect, Contains, LineString, Point, Polygon, Validation};

/// Minimum number of distinct positions for a ring to enclose an area.
const MIN_RING_POINTS: usize = 3;

/// Returns `true` if `point` lies strictly inside at least one of
/// `polygons` and outside all of that polygon's holes.
///
/// Points on a ring boundary are not contained. Polygons that are too
/// short or invalid (e.g. self-intersecting) are skipped; the remaining
/// polygons are still tested.
#[must_use]
pub fn point_in_polygons(point: &Coordinate, polygons: Option<&[StoredPolygon]>) -> bool {
    let Some(polygons) = polygons else {
        return false;
    };

    let point = Point::new(point.longitude, point.latitude);

    polygons.iter().enumerate().any(|(index, stored)| {
        let Some(polygon) = to_geo_polygon(stored) else {
            log::debug!("Skipping malformed polygon {index} for containment");
            return false;
        };

        let in_envelope = polygon.bounding_rect().is_some_and(|rect| {
            let (x, y) = point.x_y();
            x >= rect.min().x && x <= rect.max().x && y >= rect.min().y && y <= rect.max().y
        });

        in_envelope && polygon.contains(&point)
    })
}

/// Builds a valid [`Polygon`] from a stored one. Holes that are too short
/// are dropped; an unusable outer ring or an invalid result yields `None`.
fn to_geo_polygon(stored: &StoredPolygon) -> Option<Polygon<f64>> {
    if !has_enough_points(&stored.outer_ring) {
        return None;
    }

    let exterior = to_line_string(&stored.outer_ring);
    let interiors = stored
        .inner_rings
        .iter()
        .flatten()
        .filter(|ring| has_enough_points(ring))
        .map(|ring| to_line_string(ring))
        .collect();

    let polygon = Polygon::new(exterior, interiors);
    if polygon.is_valid() {
        Some(polygon)
    } else {
        None
    }
}

fn to_line_string(ring: &Ring) -> LineString<f64> {
    LineString::from(ring.iter().map(|p| (p[0], p[1])).collect::<Vec<_>>())
}

fn has_enough_points(ring: &Ring) -> bool {
    let mut distinct: Vec<[f64; 2]> = Vec::with_capacity(ring.len());
    for position in ring {
        if !position.iter().all(|v| v.is_finite()) {
            return false;
        }
        if !distinct.contains(position) {
            distinct.push(*position);
        }
    }
    distinct.len() >= MIN_RING_POINTS
}
