#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Per-instance polling of the emergency feed.
//!
//! A [`Coordinator`] owns one monitored instance (a state, a fixed zone, or
//! a tracked person). Each [`Coordinator::refresh`] fetches the relevant
//! state's incidents, normalizes them against the monitored point,
//! aggregates them into a [`CoordinatorData`] snapshot, and reports new
//! incidents and polygon transitions to a [`NotificationSink`].

pub mod aggregate;
pub mod changes;
pub mod events;
pub mod location;
pub mod normalize;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use emergency_watch_config::{InstanceConfig, MonitorConfig, Settings};
use emergency_watch_feed::{AbcEmergencyClient, EmergencyFeed, FeedError};
use emergency_watch_incident_models::{
    AustralianState, Coordinate, CoordinatorData, EmergencyIncident, InstanceType,
};
use emergency_watch_spatial::state_for_coordinates;
use emergency_watch_store::{JsonFileStore, SeenStore, StoreError, seen::DEFAULT_RETENTION_DAYS};

pub use aggregate::Aggregator;
pub use changes::{ChangeDetector, Transition};
pub use events::{IncidentEvent, Notification, NotificationSink, NullSink};
pub use location::{FileLocation, FixedLocation, LocationProvider};

/// Why a poll produced no new snapshot. The previous snapshot is kept.
#[derive(Debug, thiserror::Error)]
pub enum UpdateFailed {
    /// The feed could not be fetched or decoded.
    #[error("Feed request failed: {0}")]
    Fetch(#[from] FeedError),

    /// A fixed zone lies outside every Australian state.
    #[error("Could not determine state from coordinates ({latitude}, {longitude})")]
    NoState {
        latitude: f64,
        longitude: f64,
    },
}

/// What a [`Coordinator`] watches.
#[derive(Clone)]
pub enum MonitorTarget {
    State(AustralianState),
    Zone {
        location: Coordinate,
        radius_km: f64,
    },
    Person {
        provider: Arc<dyn LocationProvider>,
        radius_km: f64,
    },
}

impl MonitorTarget {
    #[must_use]
    pub const fn instance_type(&self) -> InstanceType {
        match self {
            Self::State(_) => InstanceType::State,
            Self::Zone { .. } => InstanceType::Zone,
            Self::Person { .. } => InstanceType::Person,
        }
    }

    const fn aggregator(&self) -> Aggregator {
        match self {
            Self::State(_) => Aggregator::state(),
            Self::Zone { radius_km, .. } | Self::Person { radius_km, .. } => {
                Aggregator::point(self.instance_type(), *radius_km)
            }
        }
    }
}

impl std::fmt::Debug for MonitorTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::State(state) => f.debug_tuple("State").field(state).finish(),
            Self::Zone {
                location,
                radius_km,
            } => f
                .debug_struct("Zone")
                .field("location", location)
                .field("radius_km", radius_km)
                .finish(),
            Self::Person { radius_km, .. } => f
                .debug_struct("Person")
                .field("radius_km", radius_km)
                .finish_non_exhaustive(),
        }
    }
}

/// Where to fetch and what to aggregate for one poll.
enum Plan {
    Fetch {
        state: AustralianState,
        reference: Option<Coordinate>,
    },
    Snapshot(Box<CoordinatorData>),
}

/// Polls the feed for one monitored instance.
pub struct Coordinator {
    instance_id: String,
    instance_name: String,
    target: MonitorTarget,
    aggregator: Aggregator,
    feed: Arc<dyn EmergencyFeed>,
    sink: Arc<dyn NotificationSink>,
    detector: ChangeDetector,
    data: Option<CoordinatorData>,
}

impl Coordinator {
    /// Creates a coordinator that discards notifications and keeps seen
    /// incidents for the default retention period.
    #[must_use]
    pub fn new(
        instance_id: impl Into<String>,
        instance_name: impl Into<String>,
        target: MonitorTarget,
        feed: Arc<dyn EmergencyFeed>,
        store: Arc<dyn SeenStore>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            instance_name: instance_name.into(),
            aggregator: target.aggregator(),
            target,
            feed,
            sink: Arc::new(NullSink),
            detector: ChangeDetector::new(store, DEFAULT_RETENTION_DAYS),
            data: None,
        }
    }

    /// Builds a coordinator for a configured instance, persisting seen
    /// incidents under the configured data directory.
    #[must_use]
    pub fn from_config(
        instance: &InstanceConfig,
        settings: &Settings,
        feed: Arc<dyn EmergencyFeed>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let target = match &instance.monitor {
            MonitorConfig::State { state } => MonitorTarget::State(*state),
            MonitorConfig::Zone {
                latitude,
                longitude,
                radius_km,
            } => MonitorTarget::Zone {
                location: Coordinate::new(*latitude, *longitude),
                radius_km: *radius_km,
            },
            MonitorConfig::Person {
                location_file,
                radius_km,
            } => MonitorTarget::Person {
                provider: Arc::new(FileLocation::new(location_file.clone())),
                radius_km: *radius_km,
            },
        };
        let store = Arc::new(JsonFileStore::for_instance(
            &settings.data_dir,
            &instance.id,
        ));

        Self::new(&instance.id, &instance.name, target, feed, store)
            .with_sink(sink)
            .with_retention_days(settings.retention_days)
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub const fn with_retention_days(mut self, retention_days: u32) -> Self {
        self.detector.set_retention_days(retention_days);
        self
    }

    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    #[must_use]
    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    #[must_use]
    pub const fn target(&self) -> &MonitorTarget {
        &self.target
    }

    /// The last successful snapshot, if any.
    #[must_use]
    pub const fn data(&self) -> Option<&CoordinatorData> {
        self.data.as_ref()
    }

    /// Polls once using the current time.
    ///
    /// # Errors
    ///
    /// See [`Self::refresh_at`].
    pub async fn refresh(&mut self) -> Result<&CoordinatorData, UpdateFailed> {
        self.refresh_at(Utc::now()).await
    }

    /// Polls once as of `now`: fetches, normalizes, aggregates, detects
    /// changes, and emits notifications.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateFailed`] if the feed request fails or a zone lies
    /// outside every state. The previous snapshot is kept in that case and
    /// no change detection runs.
    pub async fn refresh_at(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<&CoordinatorData, UpdateFailed> {
        if !self.detector.is_loaded() {
            self.detector.load(now).await;
        }

        let data = match self.plan().await? {
            Plan::Snapshot(data) => *data,
            Plan::Fetch { state, reference } => {
                log::debug!(
                    "[{}] Fetching emergency data for state: {state}",
                    self.instance_id
                );
                let response = self.feed.emergencies_by_state(state).await?;
                let incidents = normalize::normalize_all(&response.emergencies, reference, now);
                self.aggregator.aggregate(incidents, reference)
            }
        };

        let transitions = self.detector.process(&data, now).await;
        self.emit(&transitions, data.instance_type);

        log::debug!(
            "[{}] {} incidents, {} transitions",
            self.instance_id,
            data.total_count,
            transitions.len()
        );

        Ok(&*self.data.insert(data))
    }

    async fn plan(&self) -> Result<Plan, UpdateFailed> {
        match &self.target {
            MonitorTarget::State(state) => Ok(Plan::Fetch {
                state: *state,
                reference: None,
            }),
            MonitorTarget::Zone { location, .. } => {
                let state = state_for_coordinates(location.latitude, location.longitude).ok_or(
                    UpdateFailed::NoState {
                        latitude: location.latitude,
                        longitude: location.longitude,
                    },
                )?;
                Ok(Plan::Fetch {
                    state,
                    reference: Some(*location),
                })
            }
            MonitorTarget::Person { provider, .. } => {
                let Some(location) = provider.current_location().await else {
                    log::debug!("[{}] Person location unavailable", self.instance_id);
                    let mut data = self.aggregator.empty(None);
                    data.location_available = false;
                    return Ok(Plan::Snapshot(Box::new(data)));
                };

                match state_for_coordinates(location.latitude, location.longitude) {
                    Some(state) => Ok(Plan::Fetch {
                        state,
                        reference: Some(location),
                    }),
                    None => {
                        log::debug!(
                            "[{}] Person at ({}, {}) is outside Australia",
                            self.instance_id,
                            location.latitude,
                            location.longitude
                        );
                        Ok(Plan::Snapshot(Box::new(
                            self.aggregator.empty(Some(location)),
                        )))
                    }
                }
            }
        }
    }

    fn emit(&self, transitions: &[Transition], instance_type: InstanceType) {
        for transition in transitions {
            match transition {
                Transition::New(incident) => {
                    log::info!(
                        "New {} incident detected: {}",
                        incident.event_type,
                        incident.headline
                    );
                    self.notify(events::EVENT_NEW_INCIDENT, instance_type, incident);
                    self.notify(
                        &events::new_incident_event_type(&incident.event_type),
                        instance_type,
                        incident,
                    );
                }
                Transition::Entered(incident) => {
                    log::info!("[{}] Entered polygon: {}", self.instance_id, incident.headline);
                    self.notify(events::EVENT_ENTERED_POLYGON, instance_type, incident);
                }
                Transition::Exited(incident) => {
                    log::info!("[{}] Exited polygon: {}", self.instance_id, incident.headline);
                    self.notify(events::EVENT_EXITED_POLYGON, instance_type, incident);
                }
            }
        }
    }

    fn notify(&self, event_type: &str, instance_type: InstanceType, incident: &EmergencyIncident) {
        self.sink.notify(Notification {
            event_type: event_type.to_string(),
            data: IncidentEvent::new(
                &self.instance_id,
                &self.instance_name,
                instance_type,
                incident,
            ),
        });
    }

    /// Deletes this instance's persisted seen state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the stored document cannot be deleted.
    pub async fn remove_storage(&mut self) -> Result<(), StoreError> {
        self.detector.remove().await
    }
}

/// Builds the HTTP feed client from settings.
///
/// # Errors
///
/// Returns [`FeedError`] if the base URL is invalid or the client cannot
/// be built.
pub fn feed_from_settings(settings: &Settings) -> Result<AbcEmergencyClient, FeedError> {
    AbcEmergencyClient::new(
        &settings.base_url,
        Duration::from_secs(settings.request_timeout_secs),
    )
}
