//! Fixtures and fakes shared by the unit tests in this crate.

use std::sync::Mutex;

use async_trait::async_trait;
use emergency_watch_feed::{EmergencyFeed, FeedError, SearchQuery};
use emergency_watch_feed_models::{FeedResponse, RawEmergency};
use emergency_watch_incident_models::Coordinate;
use serde_json::{Value, json};

use crate::events::{Notification, NotificationSink};

pub const SYDNEY: Coordinate = Coordinate::new(-33.8688, 151.2093);

pub fn raw(value: Value) -> RawEmergency {
    serde_json::from_value(value).unwrap()
}

pub fn raw_point(id: &str, lon: f64, lat: f64, level: &str, label: &str) -> RawEmergency {
    raw(json!({
        "id": id,
        "headline": format!("Incident {id}"),
        "alertLevelInfoPrepared": {"text": "", "level": level},
        "eventLabelPrepared": {"icon": "fire", "labelText": label},
        "cardBody": {"status": "Going", "source": "NSW Rural Fire Service"},
        "geometry": {"type": "Point", "coordinates": [lon, lat]}
    }))
}

pub fn raw_polygon(id: &str, ring: Value) -> RawEmergency {
    raw(json!({
        "id": id,
        "headline": format!("Incident {id}"),
        "alertLevelInfoPrepared": {"text": "Emergency", "level": "extreme"},
        "eventLabelPrepared": {"icon": "fire", "labelText": "Bushfire"},
        "geometry": {"type": "Polygon", "coordinates": [ring]}
    }))
}

/// A closed one-degree square with its south-west corner at `(lon, lat)`.
pub fn unit_square_at(lon: f64, lat: f64) -> Value {
    json!([
        [lon, lat],
        [lon + 1.0, lat],
        [lon + 1.0, lat + 1.0],
        [lon, lat + 1.0],
        [lon, lat]
    ])
}

/// Feed returning queued responses in order, repeating the last one.
pub struct StaticFeed {
    responses: Mutex<Vec<Result<Vec<RawEmergency>, String>>>,
    pub queries: Mutex<Vec<SearchQuery>>,
}

impl StaticFeed {
    pub fn new(polls: Vec<Vec<RawEmergency>>) -> Self {
        Self {
            responses: Mutex::new(polls.into_iter().map(Ok).collect()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Every request fails with a non-success HTTP status.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(vec![Err("unavailable".to_string())]),
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EmergencyFeed for StaticFeed {
    async fn search(&self, query: &SearchQuery) -> Result<FeedResponse, FeedError> {
        self.queries.lock().unwrap().push(query.clone());

        let next = {
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses[0].clone()
            }
        };

        match next {
            Ok(emergencies) => Ok(FeedResponse {
                emergencies,
                ..FeedResponse::default()
            }),
            Err(url) => Err(FeedError::Status { url, status: 503 }),
        }
    }
}

/// Sink that keeps every notification.
#[derive(Default)]
pub struct RecordingSink {
    pub notifications: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn event_types(&self) -> Vec<String> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.event_type.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.notifications.lock().unwrap().clear();
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}
