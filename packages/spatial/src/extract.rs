//! Extraction of a representative point and containment polygons from a
//! raw feed geometry.
//!
//! Each geometry variant has its own extraction function. Malformed
//! positions (fewer than two ordinates, or a non-finite lon/lat) and empty rings
//! are skipped rather than failing the whole incident; only a missing
//! representative point causes the incident to be dropped by the caller.

use emergency_watch_feed_models::RawGeometry;
use emergency_watch_incident_models::{
    Coordinate, GeometryType, Ring, StoredGeometry, StoredPolygon,
};

/// Result of extracting a raw geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    /// Representative point. `None` means the incident must be dropped.
    pub location: Option<Coordinate>,
    /// Canonical geometry. `None` for unsupported geometry types.
    pub geometry: Option<StoredGeometry>,
}

impl Extracted {
    const fn unsupported() -> Self {
        Self {
            location: None,
            geometry: None,
        }
    }
}

/// Extracts the representative point and polygon set of `geometry`.
#[must_use]
pub fn extract_geometry(geometry: &RawGeometry) -> Extracted {
    match geometry {
        RawGeometry::Point { coordinates } => extract_point(coordinates),
        RawGeometry::Polygon { coordinates } => extract_polygon(coordinates),
        RawGeometry::MultiPolygon { coordinates } => extract_multipolygon(coordinates),
        RawGeometry::GeometryCollection { geometries } => extract_collection(geometries),
        RawGeometry::Unsupported => Extracted::unsupported(),
    }
}

fn extract_point(coordinates: &[f64]) -> Extracted {
    Extracted {
        location: position_to_coordinate(coordinates),
        geometry: Some(StoredGeometry {
            geometry_type: GeometryType::Point,
            polygons: None,
        }),
    }
}

fn extract_polygon(rings: &[Vec<Vec<f64>>]) -> Extracted {
    let polygons: Vec<StoredPolygon> = stored_polygon(rings).into_iter().collect();

    Extracted {
        location: polygon_centroid(rings),
        geometry: Some(StoredGeometry {
            geometry_type: GeometryType::Polygon,
            polygons: non_empty(polygons),
        }),
    }
}

/// The representative point is the centroid of the *first* polygon only.
fn extract_multipolygon(polygons: &[Vec<Vec<Vec<f64>>>]) -> Extracted {
    let stored: Vec<StoredPolygon> = polygons.iter().filter_map(|p| stored_polygon(p)).collect();

    Extracted {
        location: polygons.first().and_then(|p| polygon_centroid(p)),
        geometry: Some(StoredGeometry {
            geometry_type: GeometryType::MultiPolygon,
            polygons: non_empty(stored),
        }),
    }
}

/// Prefers the first `Point` member for the location, falling back to the
/// centroid of the first `Polygon` member. Every polygonal member
/// contributes to the polygon set.
fn extract_collection(geometries: &[RawGeometry]) -> Extracted {
    let mut location = geometries.iter().find_map(|g| match g {
        RawGeometry::Point { coordinates } => position_to_coordinate(coordinates),
        _ => None,
    });

    let mut polygons = Vec::new();
    for member in geometries {
        match member {
            RawGeometry::Polygon { coordinates } => {
                if location.is_none() {
                    location = polygon_centroid(coordinates);
                }
                polygons.extend(stored_polygon(coordinates));
            }
            RawGeometry::MultiPolygon { coordinates } => {
                polygons.extend(coordinates.iter().filter_map(|p| stored_polygon(p)));
            }
            RawGeometry::GeometryCollection { .. } => {
                log::debug!("Ignoring nested GeometryCollection member");
            }
            RawGeometry::Point { .. } | RawGeometry::Unsupported => {}
        }
    }

    let geometry_type = match polygons.len() {
        0 => GeometryType::Point,
        1 => GeometryType::Polygon,
        _ => GeometryType::MultiPolygon,
    };

    Extracted {
        location,
        geometry: Some(StoredGeometry {
            geometry_type,
            polygons: non_empty(polygons),
        }),
    }
}

/// `[lon, lat, ...]` as `[lon, lat]`. Extra ordinates (altitude) are
/// ignored; fewer than two, or a non-finite lon/lat, is malformed.
fn lon_lat(position: &[f64]) -> Option<[f64; 2]> {
    match position {
        [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Some([*lon, *lat]),
        _ => None,
    }
}

fn position_to_coordinate(position: &[f64]) -> Option<Coordinate> {
    lon_lat(position).map(|[lon, lat]| Coordinate::new(lat, lon))
}

fn to_ring(raw: &[Vec<f64>]) -> Ring {
    raw.iter()
        .filter_map(|p| {
            let position = lon_lat(p);
            if position.is_none() {
                log::debug!("Skipping malformed position {p:?}");
            }
            position
        })
        .collect()
}

/// Converts `[[outer], [hole], ...]` into a [`StoredPolygon`]. Returns
/// `None` when there is no usable outer ring.
fn stored_polygon(rings: &[Vec<Vec<f64>>]) -> Option<StoredPolygon> {
    let outer_ring = to_ring(rings.first()?);
    if outer_ring.is_empty() {
        log::debug!("Skipping polygon with empty outer ring");
        return None;
    }

    let holes: Vec<Ring> = rings
        .iter()
        .skip(1)
        .map(|r| to_ring(r))
        .filter(|r| !r.is_empty())
        .collect();

    Some(StoredPolygon {
        outer_ring,
        inner_rings: non_empty(holes),
    })
}

/// Arithmetic mean of the outer-ring vertices. Not a true area centroid.
#[allow(clippy::cast_precision_loss)]
fn polygon_centroid(rings: &[Vec<Vec<f64>>]) -> Option<Coordinate> {
    let ring = to_ring(rings.first()?);
    if ring.is_empty() {
        return None;
    }

    let n = ring.len() as f64;
    let (sum_lon, sum_lat) = ring
        .iter()
        .fold((0.0, 0.0), |(lon, lat), p| (lon + p[0], lat + p[1]));

    Some(Coordinate::new(sum_lat / n, sum_lon / n))
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}
