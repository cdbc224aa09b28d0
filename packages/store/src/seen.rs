//! Seen-incident document format, legacy upgrade, and retention purge.
//!
//! Current format:
//!
//! ```json
//! {
//!   "seen_incidents": {"AUREMER-1": "2025-12-06T05:53:02+00:00"},
//!   "containing_ids": ["AUREMER-1"]
//! }
//! ```
//!
//! Legacy format, upgraded on load: `{"seen_ids": ["AUREMER-1"]}`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use emergency_watch_incident_models::parsing::parse_timestamp;
use serde::Serialize;
use serde_json::Value;

use crate::{SeenStore, StoreError};

/// Default number of days a seen incident is remembered.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;
pub const MIN_RETENTION_DAYS: u32 = 7;
pub const MAX_RETENTION_DAYS: u32 = 365;

/// Clamps `days` into the supported retention range.
#[must_use]
pub const fn clamp_retention_days(days: u32) -> u32 {
    if days < MIN_RETENTION_DAYS {
        MIN_RETENTION_DAYS
    } else if days > MAX_RETENTION_DAYS {
        MAX_RETENTION_DAYS
    } else {
        days
    }
}

/// Seen incidents with their last-seen time, plus the incidents that
/// contained the monitored point when last saved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenState {
    pub seen: BTreeMap<String, DateTime<Utc>>,
    pub containing: BTreeSet<String>,
}

/// Outcome of decoding a stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedSeen {
    /// Nothing usable was stored.
    Absent,
    /// Current timestamped format.
    Current(SeenState),
    /// Legacy ID list, upgraded with every ID stamped "now". Must be
    /// re-saved.
    Legacy(SeenState),
}

#[derive(Serialize)]
struct SeenDocument<'a> {
    seen_incidents: BTreeMap<&'a str, String>,
    containing_ids: Vec<&'a str>,
}

impl SeenState {
    /// Drops entries last seen before `now - retention_days`.
    ///
    /// Returns the number of entries removed.
    pub fn purge(&mut self, now: DateTime<Utc>, retention_days: u32) -> usize {
        let cutoff = now - Duration::days(i64::from(retention_days));
        let before = self.seen.len();
        self.seen.retain(|_, last_seen| *last_seen >= cutoff);
        before - self.seen.len()
    }

    /// Replaces the tracked set with `ids`, all stamped `now`.
    pub fn refresh<'a, I, C>(&mut self, ids: I, containing: C, now: DateTime<Utc>)
    where
        I: IntoIterator<Item = &'a str>,
        C: IntoIterator<Item = &'a str>,
    {
        self.seen = ids.into_iter().map(|id| (id.to_string(), now)).collect();
        self.containing = containing.into_iter().map(str::to_string).collect();
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains_key(id)
    }

    /// Encodes this state in the current document format.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<Value, StoreError> {
        let document = SeenDocument {
            seen_incidents: self
                .seen
                .iter()
                .map(|(id, last_seen)| (id.as_str(), last_seen.to_rfc3339()))
                .collect(),
            containing_ids: self.containing.iter().map(String::as_str).collect(),
        };
        Ok(serde_json::to_value(document)?)
    }
}

impl LoadedSeen {
    /// Decodes a stored document.
    ///
    /// Entries with unparsable timestamps are dropped. Documents in neither
    /// the current nor the legacy shape decode as [`Self::Absent`].
    #[must_use]
    pub fn decode(value: &Value, now: DateTime<Utc>) -> Self {
        let Some(object) = value.as_object() else {
            log::warn!("Ignoring stored seen state: not a JSON object");
            return Self::Absent;
        };

        if let Some(entries) = object.get("seen_incidents") {
            let Some(entries) = entries.as_object() else {
                log::warn!("Ignoring stored seen state: seen_incidents is not an object");
                return Self::Absent;
            };

            let seen: BTreeMap<String, DateTime<Utc>> = entries
                .iter()
                .filter_map(|(id, last_seen)| {
                    let parsed = last_seen.as_str().and_then(parse_timestamp);
                    if parsed.is_none() {
                        log::debug!("Dropping seen incident {id} with invalid timestamp");
                    }
                    parsed.map(|t| (id.clone(), t))
                })
                .collect();

            let containing = object
                .get("containing_ids")
                .and_then(Value::as_array)
                .map(|ids| string_set(ids))
                .unwrap_or_default();

            return Self::Current(SeenState { seen, containing });
        }

        if let Some(ids) = object.get("seen_ids").and_then(Value::as_array) {
            log::info!("Upgrading {} legacy seen incident IDs", ids.len());
            let seen = string_set(ids).into_iter().map(|id| (id, now)).collect();
            return Self::Legacy(SeenState {
                seen,
                containing: BTreeSet::new(),
            });
        }

        log::warn!("Ignoring stored seen state: unrecognised format");
        Self::Absent
    }
}

fn string_set(values: &[Value]) -> BTreeSet<String> {
    values
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

/// Loads and decodes the seen state from `store`, purging expired entries.
///
/// Read failures and corrupt documents degrade to [`LoadedSeen::Absent`].
pub async fn load(store: &dyn SeenStore, now: DateTime<Utc>, retention_days: u32) -> LoadedSeen {
    let value = match store.load().await {
        Ok(Some(value)) => value,
        Ok(None) => return LoadedSeen::Absent,
        Err(e) => {
            log::warn!("Failed to load seen state, starting fresh: {e}");
            return LoadedSeen::Absent;
        }
    };

    let mut loaded = LoadedSeen::decode(&value, now);
    if let LoadedSeen::Current(state) | LoadedSeen::Legacy(state) = &mut loaded {
        let purged = state.purge(now, retention_days);
        if purged > 0 {
            log::debug!("Purged {purged} expired seen incidents");
        }
    }
    loaded
}

/// Saves `state` to `store`. Failures are logged, never returned.
pub async fn save(store: &dyn SeenStore, state: &SeenState) {
    let result = match state.to_json() {
        Ok(value) => store.save(&value).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        log::warn!("Failed to save seen state: {e}");
    }
}
