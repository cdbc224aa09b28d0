//! Transition notifications delivered to the host.

use emergency_watch_incident_models::{AlertLevel, Direction, EmergencyIncident, InstanceType};
use serde::{Deserialize, Serialize};

/// Fired once per newly seen incident.
pub const EVENT_NEW_INCIDENT: &str = "abc_emergency_new_incident";
/// Fired when the monitored point becomes contained by an incident polygon.
pub const EVENT_ENTERED_POLYGON: &str = "abc_emergency_entered_polygon";
/// Fired when a previously containing incident no longer contains the
/// monitored point.
pub const EVENT_EXITED_POLYGON: &str = "abc_emergency_exited_polygon";

const EVENT_NEW_PREFIX: &str = "abc_emergency_new_";

/// Event name for a new incident of `event_type`, e.g.
/// `abc_emergency_new_bushfire`.
#[must_use]
pub fn new_incident_event_type(event_type: &str) -> String {
    format!("{EVENT_NEW_PREFIX}{}", slugify(event_type))
}

/// Lowercases and replaces spaces with underscores.
#[must_use]
pub fn slugify(event_type: &str) -> String {
    event_type.to_lowercase().replace(' ', "_")
}

/// Payload common to every incident notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentEvent {
    pub config_entry_id: String,
    pub instance_name: String,
    pub instance_type: InstanceType,
    pub incident_id: String,
    pub headline: String,
    pub event_type: String,
    pub event_icon: String,
    pub alert_level: AlertLevel,
    pub alert_text: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: Option<String>,
    pub size: Option<String>,
    pub source: String,
    /// RFC 3339.
    pub updated: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bearing: Option<f64>,
}

impl IncidentEvent {
    /// Builds the payload for `incident` as seen by one instance. Relative
    /// fields are omitted for state instances.
    #[must_use]
    pub fn new(
        instance_id: &str,
        instance_name: &str,
        instance_type: InstanceType,
        incident: &EmergencyIncident,
    ) -> Self {
        let relative = instance_type.monitors_point();

        Self {
            config_entry_id: instance_id.to_string(),
            instance_name: instance_name.to_string(),
            instance_type,
            incident_id: incident.id.clone(),
            headline: incident.headline.clone(),
            event_type: incident.event_type.clone(),
            event_icon: incident.event_icon.clone(),
            alert_level: incident.alert_level,
            alert_text: incident.alert_text.clone(),
            latitude: incident.location.latitude,
            longitude: incident.location.longitude,
            status: incident.status.clone(),
            size: incident.size.clone(),
            source: incident.source.clone(),
            updated: incident.updated.to_rfc3339(),
            distance_km: incident.distance_km.filter(|_| relative),
            direction: incident.direction.filter(|_| relative),
            bearing: incident.bearing.filter(|_| relative),
        }
    }
}

/// A named event with its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub event_type: String,
    pub data: IncidentEvent,
}

/// Receives notifications produced by a poll.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _notification: Notification) {}
}
