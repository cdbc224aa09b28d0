//! JSON file backed [`SeenStore`].

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{SeenStore, StoreError, paths};

/// Stores one JSON document per instance on disk.
///
/// Saves write a sibling `.tmp` file and rename it over the target, so
/// readers only ever observe a complete document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store for `instance_id` under `data_dir`.
    #[must_use]
    pub fn for_instance(data_dir: &Path, instance_id: &str) -> Self {
        Self::new(paths::seen_path(data_dir, instance_id))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = OsString::from(self.path.as_os_str());
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

#[async_trait]
impl SeenStore for JsonFileStore {
    async fn load(&self) -> Result<Option<serde_json::Value>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&contents)?))
    }

    async fn save(&self, data: &serde_json::Value) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            paths::ensure_dir(parent).await?;
        }

        let tmp = self.tmp_path();
        let bytes = serde_json::to_vec_pretty(data)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        log::debug!("Saved seen state to {}", self.path.display());
        Ok(())
    }

    async fn remove(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                log::debug!("Removed {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
