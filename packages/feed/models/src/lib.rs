#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Raw response types for the ABC Emergency `emergencySearch` endpoint.
//!
//! These mirror the wire format as closely as possible. Decoding is
//! lenient at two levels so a single odd record never fails a whole
//! response:
//!
//! * each entry of `emergencies` is decoded on its own and dropped with a
//!   warning if it does not fit [`RawEmergency`];
//! * ordinates that are not numbers (e.g. `null`) decode as `NaN`, leaving
//!   the position to be skipped as malformed by geometry extraction.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A decoded `emergencySearch` response.
///
/// Only [`Self::emergencies`] is consumed; the remaining fields are kept
/// for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    #[serde(default, deserialize_with = "lenient_emergencies")]
    pub emergencies: Vec<RawEmergency>,
    #[serde(default)]
    pub map_bound: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub state_name: Option<String>,
    #[serde(default)]
    pub incidents_number: Option<u64>,
    #[serde(default)]
    pub state_count: Option<u64>,
}

/// One incident record as published by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEmergency {
    pub id: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub alert_level_info_prepared: AlertLevelInfo,
    #[serde(default)]
    pub emergency_timestamp_prepared: Option<EmergencyTimestamp>,
    #[serde(default)]
    pub event_label_prepared: EventLabel,
    #[serde(default)]
    pub card_body: Option<CardBody>,
    /// A record without geometry decodes as [`RawGeometry::Unsupported`].
    #[serde(default)]
    pub geometry: RawGeometry,
}

impl RawEmergency {
    /// The `updatedTime` string, if present.
    #[must_use]
    pub fn updated_time(&self) -> Option<&str> {
        self.emergency_timestamp_prepared
            .as_ref()
            .and_then(|t| t.updated_time.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertLevelInfo {
    /// `"Emergency"`, `"Watch and Act"`, `"Advice"`, or empty.
    #[serde(default)]
    pub text: String,
    /// `"extreme"`, `"severe"`, `"moderate"`, `"minor"`, or empty.
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub style: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyTimestamp {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub formatted_time: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub updated_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLabel {
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub label_text: String,
}

/// Free-form detail card. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardBody {
    #[serde(default, rename = "type")]
    pub card_type: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// A GeoJSON-like geometry as published by the feed.
///
/// Positions are kept as plain `Vec<f64>` so that points with the wrong
/// arity or non-numeric ordinates survive decoding and can be skipped
/// individually. Geometry types other than the four handled here decode as
/// [`RawGeometry::Unsupported`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RawGeometry {
    Point {
        #[serde(deserialize_with = "lenient_position")]
        coordinates: Vec<f64>,
    },
    Polygon {
        #[serde(deserialize_with = "lenient_rings")]
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    MultiPolygon {
        #[serde(deserialize_with = "lenient_polygons")]
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
    },
    GeometryCollection {
        geometries: Vec<RawGeometry>,
    },
    #[default]
    #[serde(other)]
    Unsupported,
}

impl RawGeometry {
    /// The GeoJSON type name, for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Point { .. } => "Point",
            Self::Polygon { .. } => "Polygon",
            Self::MultiPolygon { .. } => "MultiPolygon",
            Self::GeometryCollection { .. } => "GeometryCollection",
            Self::Unsupported => "Unsupported",
        }
    }
}

fn lenient_emergencies<'de, D>(deserializer: D) -> Result<Vec<RawEmergency>, D::Error>
where
    D: Deserializer<'de>,
{
    let records = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();

    Ok(records
        .into_iter()
        .filter_map(|record| {
            let id = record
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or("<no id>")
                .to_string();
            serde_json::from_value::<RawEmergency>(record)
                .inspect_err(|e| log::warn!("Dropping undecodable emergency {id}: {e}"))
                .ok()
        })
        .collect())
}

struct LenientPosition(Vec<f64>);

impl<'de> Deserialize<'de> for LenientPosition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        lenient_position(deserializer).map(Self)
    }
}

/// Non-numeric ordinates become `NaN`; a `null` position decodes as empty.
fn lenient_position<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?
        .unwrap_or_default()
        .iter()
        .map(|ordinate| ordinate.as_f64().unwrap_or(f64::NAN))
        .collect())
}

fn lenient_rings<'de, D>(deserializer: D) -> Result<Vec<Vec<Vec<f64>>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Vec::<Vec<LenientPosition>>::deserialize(deserializer)?
        .into_iter()
        .map(|ring| ring.into_iter().map(|p| p.0).collect())
        .collect())
}

fn lenient_polygons<'de, D>(deserializer: D) -> Result<Vec<Vec<Vec<Vec<f64>>>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Vec::<Vec<Vec<LenientPosition>>>::deserialize(deserializer)?
        .into_iter()
        .map(|polygon| {
            polygon
                .into_iter()
                .map(|ring| ring.into_iter().map(|p| p.0).collect())
                .collect()
        })
        .collect())
}
