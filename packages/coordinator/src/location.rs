//! Sources for the current position of a tracked person.

use std::path::PathBuf;

use async_trait::async_trait;
use emergency_watch_incident_models::Coordinate;
use serde::Deserialize;

/// Supplies the tracked entity's current location, if known.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_location(&self) -> Option<Coordinate>;
}

/// A location that never changes. `None` models an entity with no fix.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocation(pub Option<Coordinate>);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> Option<Coordinate> {
        self.0
    }
}

#[derive(Deserialize)]
struct LocationDocument {
    latitude: f64,
    longitude: f64,
}

/// Reads `{"latitude": .., "longitude": ..}` from a JSON file that some
/// other process keeps up to date.
#[derive(Debug, Clone)]
pub struct FileLocation {
    path: PathBuf,
}

impl FileLocation {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LocationProvider for FileLocation {
    async fn current_location(&self) -> Option<Coordinate> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::debug!("No location at {}: {e}", self.path.display());
                return None;
            }
        };

        match serde_json::from_slice::<LocationDocument>(&bytes) {
            Ok(doc) if doc.latitude.is_finite() && doc.longitude.is_finite() => {
                Some(Coordinate::new(doc.latitude, doc.longitude))
            }
            Ok(_) => {
                log::debug!("Non-finite location in {}", self.path.display());
                None
            }
            Err(e) => {
                log::debug!("Invalid location file {}: {e}", self.path.display());
                None
            }
        }
    }
}
