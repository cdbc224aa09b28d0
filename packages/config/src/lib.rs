#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Configuration for emergency-watch.
//!
//! A single TOML file holds global settings plus one `[[instance]]` table
//! per monitored instance. Each instance has a `[instance.monitor]` table
//! tagged by `type`:
//!
//! ```toml
//! [[instance]]
//! id = "home"
//! name = "Home"
//!
//! [instance.monitor]
//! type = "zone"
//! latitude = -33.8688
//! longitude = 151.2093
//! ```
//!
//! Settings are read once at startup and handed to each coordinator by
//! value; nothing here is global.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use emergency_watch_feed::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use emergency_watch_incident_models::{AustralianState, InstanceType};
use emergency_watch_store::seen::{
    DEFAULT_RETENTION_DAYS, MAX_RETENTION_DAYS, MIN_RETENTION_DAYS, clamp_retention_days,
};
use serde::Deserialize;

/// Radius used for nearby filtering when an instance does not set one.
pub const DEFAULT_RADIUS_KM: f64 = 50.0;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// The config file is not valid TOML or does not match the schema.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The config parsed but is inconsistent.
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// Top-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Seconds between polls.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    /// Days a seen incident is remembered across restarts.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Directory for persisted state.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Feed API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default, rename = "instance")]
    pub instances: Vec<InstanceConfig>,
}

/// One monitored instance.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceConfig {
    /// Unique key, also used to name the instance's persisted state.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// What this instance monitors.
    pub monitor: MonitorConfig,
}

/// What an instance monitors, tagged by `type` in TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorConfig {
    /// Every incident in one state or territory.
    State {
        /// State code (e.g. `"nsw"`).
        state: AustralianState,
    },
    /// A fixed point.
    Zone {
        latitude: f64,
        longitude: f64,
        #[serde(default = "default_radius_km")]
        radius_km: f64,
    },
    /// A tracked entity whose current position is read from a JSON file
    /// (`{"latitude": .., "longitude": ..}`) on every poll.
    Person {
        location_file: PathBuf,
        #[serde(default = "default_radius_km")]
        radius_km: f64,
    },
}

const fn default_scan_interval_secs() -> u64 {
    300
}

const fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

const fn default_radius_km() -> f64 {
    DEFAULT_RADIUS_KM
}

impl MonitorConfig {
    #[must_use]
    pub const fn instance_type(&self) -> InstanceType {
        match self {
            Self::State { .. } => InstanceType::State,
            Self::Zone { .. } => InstanceType::Zone,
            Self::Person { .. } => InstanceType::Person,
        }
    }

    /// Nearby radius. `None` for state instances.
    #[must_use]
    pub const fn radius_km(&self) -> Option<f64> {
        match self {
            Self::State { .. } => None,
            Self::Zone { radius_km, .. } | Self::Person { radius_km, .. } => Some(*radius_km),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval_secs(),
            retention_days: default_retention_days(),
            data_dir: default_data_dir(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            instances: Vec::new(),
        }
    }
}

impl Settings {
    /// Looks up an instance by ID.
    #[must_use]
    pub fn instance(&self, id: &str) -> Option<&InstanceConfig> {
        self.instances.iter().find(|i| i.id == id)
    }

    /// Checks cross-field consistency and clamps the retention period into
    /// its supported range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for duplicate, empty or non
    /// `[A-Za-z0-9_-]` instance IDs, out-of-range coordinates, non-positive radii, or a zero scan
    /// interval.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.scan_interval_secs == 0 {
            return Err(invalid("scan_interval_secs must be greater than zero"));
        }

        let clamped = clamp_retention_days(self.retention_days);
        if clamped != self.retention_days {
            log::warn!(
                "retention_days {} outside {MIN_RETENTION_DAYS}..={MAX_RETENTION_DAYS}, \
                 using {clamped}",
                self.retention_days
            );
            self.retention_days = clamped;
        }

        let mut ids = BTreeSet::new();
        for instance in &self.instances {
            if instance.id.trim().is_empty() {
                return Err(invalid("instance id must not be empty"));
            }
            if !instance
                .id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-'))
            {
                return Err(invalid(&format!(
                    "instance id '{}' may only contain letters, digits, '_' and '-'",
                    instance.id
                )));
            }
            if !ids.insert(instance.id.as_str()) {
                return Err(invalid(&format!("duplicate instance id '{}'", instance.id)));
            }
            validate_monitor(&instance.id, &instance.monitor)?;
        }

        Ok(())
    }
}

fn validate_monitor(id: &str, monitor: &MonitorConfig) -> Result<(), ConfigError> {
    if let MonitorConfig::Zone {
        latitude,
        longitude,
        ..
    } = monitor
    {
        if !(-90.0..=90.0).contains(latitude) || !(-180.0..=180.0).contains(longitude) {
            return Err(invalid(&format!(
                "instance '{id}' has out-of-range coordinates ({latitude}, {longitude})"
            )));
        }
    }

    if let Some(radius) = monitor.radius_km() {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(invalid(&format!(
                "instance '{id}' radius_km must be positive, got {radius}"
            )));
        }
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid {
        message: message.to_string(),
    }
}

/// Parses and validates configuration from a TOML string.
///
/// # Errors
///
/// Returns [`ConfigError`] if the TOML is malformed or fails validation.
pub fn parse_config(contents: &str) -> Result<Settings, ConfigError> {
    let mut settings: Settings = toml::from_str(contents)?;
    settings.validate()?;
    Ok(settings)
}

/// Reads, parses, and validates the configuration file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, is malformed, or
/// fails validation.
pub fn load_config(path: &Path) -> Result<Settings, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let settings = parse_config(&contents)?;
    log::info!(
        "Loaded {} instance(s) from {}",
        settings.instances.len(),
        path.display()
    );
    Ok(settings)
}
