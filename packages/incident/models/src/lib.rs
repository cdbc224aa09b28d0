#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Emergency incident types shared across the emergency-watch system.
//!
//! Every poll of the emergency feed produces a fresh list of
//! [`EmergencyIncident`] records which are reduced into a single
//! [`CoordinatorData`] snapshot per monitored instance.

pub mod parsing;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Geographic coordinate (WGS84, degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A closed ring of `[longitude, latitude]` positions (GeoJSON axis order).
pub type Ring = Vec<[f64; 2]>;

/// A hazard polygon kept for containment testing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPolygon {
    /// Outer boundary.
    pub outer_ring: Ring,
    /// Holes, if any.
    pub inner_rings: Option<Vec<Ring>>,
}

/// Canonical geometry kind of an incident after extraction.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum GeometryType {
    Point,
    Polygon,
    MultiPolygon,
}

/// Canonical area representation of an incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredGeometry {
    /// Geometry kind.
    pub geometry_type: GeometryType,
    /// Polygons usable for containment. `None` for pure point alerts.
    pub polygons: Option<Vec<StoredPolygon>>,
}

impl StoredGeometry {
    /// Returns `true` if at least one polygon is available.
    #[must_use]
    pub fn has_polygon(&self) -> bool {
        self.polygons.as_ref().is_some_and(|p| !p.is_empty())
    }
}

/// Australian Warning System alert level.
///
/// Serialized using the feed's own vocabulary (`extreme`, `severe`, ...);
/// incidents without a warning level carry [`AlertLevel::None`], serialized
/// as an empty string.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AlertLevel {
    /// Emergency Warning
    Extreme,
    /// Watch and Act
    Severe,
    /// Advice
    Moderate,
    /// Information
    Minor,
    /// No warning level
    #[default]
    #[serde(rename = "")]
    #[strum(serialize = "")]
    None,
}

impl AlertLevel {
    /// Priority used when aggregating levels. Higher is more severe.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Extreme => 4,
            Self::Severe => 3,
            Self::Moderate => 2,
            Self::Minor => 1,
            Self::None => 0,
        }
    }

    /// Maps a raw feed level to an [`AlertLevel`]. Unknown or empty values
    /// map to [`AlertLevel::None`].
    #[must_use]
    pub fn from_feed(level: &str) -> Self {
        level.trim().parse().unwrap_or(Self::None)
    }

    /// Returns `true` if this level is at least as severe as `threshold`.
    #[must_use]
    pub const fn at_least(self, threshold: Self) -> bool {
        self.priority() >= threshold.priority()
    }

    /// Returns the most severe level in `levels`. Ties keep the first seen.
    pub fn highest<I>(levels: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut highest = Self::None;
        for level in levels {
            if level.priority() > highest.priority() {
                highest = level;
            }
        }
        highest
    }
}

/// Eight-point compass direction.
#[allow(clippy::upper_case_acronyms)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Direction {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Direction {
    /// All directions, clockwise from north.
    pub const ALL: [Self; 8] = [
        Self::N,
        Self::NE,
        Self::E,
        Self::SE,
        Self::S,
        Self::SW,
        Self::W,
        Self::NW,
    ];
}

/// What a monitored instance watches.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InstanceType {
    /// Every incident in one state or territory.
    State,
    /// Incidents near a fixed location.
    Zone,
    /// Incidents near a tracked entity's current location.
    Person,
}

impl InstanceType {
    /// Zone and person instances monitor a point and support containment.
    #[must_use]
    pub const fn monitors_point(self) -> bool {
        matches!(self, Self::Zone | Self::Person)
    }
}

/// Australian states and territories covered by the feed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AustralianState {
    Nsw,
    Vic,
    Qld,
    Sa,
    Wa,
    Tas,
    Nt,
    Act,
}

impl AustralianState {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Nsw,
            Self::Vic,
            Self::Qld,
            Self::Sa,
            Self::Wa,
            Self::Tas,
            Self::Nt,
            Self::Act,
        ]
    }
}

/// A single hazard event as seen in one poll.
///
/// Distance, bearing, direction, and containment are relative to the
/// monitored location of the instance that produced the incident, so the
/// same feed record yields different values per instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyIncident {
    /// Stable feed identifier (e.g. `"AUREMER-..."`), used as the diff key.
    pub id: String,
    /// Brief headline describing the incident location.
    pub headline: String,
    /// Warning level.
    pub alert_level: AlertLevel,
    /// Human-readable level (`"Emergency"`, `"Watch and Act"`, ...).
    pub alert_text: String,
    /// Incident type (e.g. `"Bushfire"`, `"Flood"`).
    pub event_type: String,
    /// Icon category (`"fire"`, `"weather"`, ...).
    pub event_icon: String,
    /// Current status (e.g. `"Being controlled"`).
    pub status: Option<String>,
    /// Affected area (e.g. `"100 ha"`).
    pub size: Option<String>,
    /// Reporting agency.
    pub source: String,
    /// Representative point.
    pub location: Coordinate,
    /// Last update time reported by the feed.
    pub updated: DateTime<Utc>,
    /// Kilometres from the monitored location.
    pub distance_km: Option<f64>,
    /// Degrees clockwise from north, from the monitored location.
    pub bearing: Option<f64>,
    pub direction: Option<Direction>,
    pub geometry_type: GeometryType,
    /// Hazard polygons, if the incident has an area representation.
    pub polygons: Option<Vec<StoredPolygon>>,
    pub has_polygon: bool,
    /// Whether the monitored location lies inside one of [`Self::polygons`].
    pub contains_point: bool,
}

/// One consolidated snapshot per poll of a monitored instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorData {
    /// All incidents, nearest first; unknown distances last.
    pub incidents: Vec<EmergencyIncident>,
    pub total_count: usize,
    /// Incidents within [`Self::radius_km`]. `None` in state mode.
    pub nearby_count: Option<usize>,
    /// Radius used for nearby filtering. `None` in state mode.
    pub radius_km: Option<f64>,
    pub nearest_distance_km: Option<f64>,
    pub nearest_incident: Option<EmergencyIncident>,
    /// Most severe level among nearby incidents (all incidents in state mode).
    pub highest_alert_level: AlertLevel,
    pub incidents_by_type: BTreeMap<String, usize>,
    pub instance_type: InstanceType,
    /// `false` when a person instance has no known location.
    pub location_available: bool,
    pub current_latitude: Option<f64>,
    pub current_longitude: Option<f64>,
    /// Incidents whose polygons contain the monitored point.
    pub containing_incidents: Vec<EmergencyIncident>,
    pub inside_polygon: bool,
    pub inside_emergency_warning: bool,
    pub inside_watch_and_act: bool,
    pub inside_advice: bool,
    pub highest_containing_alert_level: AlertLevel,
}

impl CoordinatorData {
    /// An empty snapshot for `instance_type`.
    #[must_use]
    pub const fn empty(instance_type: InstanceType) -> Self {
        Self {
            incidents: Vec::new(),
            total_count: 0,
            nearby_count: None,
            radius_km: None,
            nearest_distance_km: None,
            nearest_incident: None,
            highest_alert_level: AlertLevel::None,
            incidents_by_type: BTreeMap::new(),
            instance_type,
            location_available: true,
            current_latitude: None,
            current_longitude: None,
            containing_incidents: Vec::new(),
            inside_polygon: false,
            inside_emergency_warning: false,
            inside_watch_and_act: false,
            inside_advice: false,
            highest_containing_alert_level: AlertLevel::None,
        }
    }

    /// Incidents inside the configured radius. In state mode every incident
    /// counts as nearby.
    pub fn nearby(&self) -> impl Iterator<Item = &EmergencyIncident> {
        let radius = self.radius_km;
        self.incidents.iter().filter(move |i| match radius {
            Some(r) => i.distance_km.is_some_and(|d| d <= r),
            None => true,
        })
    }

    /// Whether any relevant incident is active.
    #[must_use]
    pub fn active_alert(&self) -> bool {
        self.nearby_count.map_or(self.total_count > 0, |n| n > 0)
    }

    #[must_use]
    pub const fn has_emergency_warning(&self) -> bool {
        matches!(self.highest_alert_level, AlertLevel::Extreme)
    }

    #[must_use]
    pub const fn has_watch_and_act(&self) -> bool {
        self.highest_alert_level.at_least(AlertLevel::Severe)
    }

    #[must_use]
    pub const fn has_advice(&self) -> bool {
        self.highest_alert_level.at_least(AlertLevel::Moderate)
    }

    /// Summarises nearby incidents at one of `levels` that have a known
    /// distance. Returns `None` when nothing matches.
    #[must_use]
    pub fn alert_summary(&self, levels: &[AlertLevel]) -> Option<AlertSummary> {
        let matching: Vec<&EmergencyIncident> = self
            .nearby()
            .filter(|i| levels.contains(&i.alert_level) && i.distance_km.is_some())
            .collect();

        let nearest = matching.iter().min_by(|a, b| {
            let a = a.distance_km.unwrap_or(f64::INFINITY);
            let b = b.distance_km.unwrap_or(f64::INFINITY);
            a.total_cmp(&b)
        })?;

        Some(AlertSummary {
            count: matching.len(),
            nearest_headline: nearest.headline.clone(),
            nearest_distance_km: nearest.distance_km.map(|d| (d * 10.0).round() / 10.0),
            nearest_direction: nearest.direction,
        })
    }
}

/// Attributes describing the nearest incident at a set of alert levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub count: usize,
    pub nearest_headline: String,
    /// Rounded to one decimal place.
    pub nearest_distance_km: Option<f64>,
    pub nearest_direction: Option<Direction>,
}
