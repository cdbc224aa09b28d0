#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Spatial helpers for emergency incidents.
//!
//! Converts the feed's heterogeneous geometries into a representative
//! point plus a canonical polygon set, computes great-circle distance and
//! bearing from a monitored location, and answers point-in-polygon
//! questions (holes respected) using the `geo` crate.

pub mod containment;
pub mod extract;
pub mod math;
pub mod render;
pub mod states;

pub use containment::point_in_polygons;
pub use extract::{Extracted, extract_geometry};
pub use math::{bearing_to_direction, calculate_distance, get_bearing};
pub use render::incident_geojson;
pub use states::state_for_coordinates;
