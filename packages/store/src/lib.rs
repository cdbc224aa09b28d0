#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Persistence of seen-incident state.
//!
//! A [`SeenStore`] is a per-instance load/save slot for one JSON document.
//! The [`seen`] module owns the document format (current and legacy), the
//! retention purge, and the upgrade path, so stores stay format-agnostic.

pub mod file;
pub mod memory;
pub mod paths;
pub mod seen;

use async_trait::async_trait;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use seen::{LoadedSeen, SeenState};

/// Errors that can occur while reading or writing persisted state.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error (file read/write/rename).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted document is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A load/save slot holding one JSON document for one monitored instance.
///
/// Implementations must make [`Self::save`] atomic: a concurrent or
/// interrupted save never leaves a half-written document behind.
#[async_trait]
pub trait SeenStore: Send + Sync {
    /// Loads the stored document. `Ok(None)` means nothing was ever saved.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the document exists but cannot be read or
    /// parsed.
    async fn load(&self) -> Result<Option<serde_json::Value>, StoreError>;

    /// Replaces the stored document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the document cannot be written.
    async fn save(&self, data: &serde_json::Value) -> Result<(), StoreError>;

    /// Deletes the stored document. Removing a missing document succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the document exists but cannot be deleted.
    async fn remove(&self) -> Result<(), StoreError>;
}
