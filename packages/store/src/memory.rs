//! In-memory [`SeenStore`], used by tests and one-shot runs.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{SeenStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<Option<serde_json::Value>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `data`, as if saved by an earlier run.
    #[must_use]
    pub fn with_data(data: serde_json::Value) -> Self {
        Self {
            data: Mutex::new(Some(data)),
            saves: Mutex::new(0),
        }
    }

    /// The current document.
    pub async fn snapshot(&self) -> Option<serde_json::Value> {
        self.data.lock().await.clone()
    }

    /// Number of successful saves.
    pub async fn save_count(&self) -> usize {
        *self.saves.lock().await
    }
}

#[async_trait]
impl SeenStore for MemoryStore {
    async fn load(&self) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.data.lock().await.clone())
    }

    async fn save(&self, data: &serde_json::Value) -> Result<(), StoreError> {
        *self.data.lock().await = Some(data.clone());
        *self.saves.lock().await += 1;
        Ok(())
    }

    async fn remove(&self) -> Result<(), StoreError> {
        *self.data.lock().await = None;
        Ok(())
    }
}
