//! In-process key-value stores
//!
//! Stand-ins for the browser cookie jar and sessionStorage. Values live as
//! long as the process (or the owning handle) does.

use async_trait::async_trait;
use bridge_traits::{error::Result, storage::KeyValueStore, StorageScope};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::trace;

/// Volatile string store scoped to a [`StorageScope`].
pub struct MemoryStore {
    scope: StorageScope,
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new(scope: StorageScope) -> Self {
        Self {
            scope,
            values: RwLock::new(BTreeMap::new()),
        }
    }

    /// Cookie jar whose contents can be replayed as a `Cookie` header.
    pub fn cookie_jar() -> Self {
        Self::new(StorageScope::Cookie)
    }

    /// Process-lifetime store standing in for sessionStorage.
    pub fn session() -> Self {
        Self::new(StorageScope::Session)
    }

    pub fn scope(&self) -> StorageScope {
        self.scope
    }

    /// Render the stored values as a `Cookie` request header value.
    ///
    /// Returns `None` when the jar is empty.
    pub async fn cookie_header(&self) -> Option<String> {
        let values = self.values.read().await;
        if values.is_empty() {
            return None;
        }
        Some(
            values
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        trace!(scope = %self.scope, key, "Stored value");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        trace!(scope = %self.scope, key, "Removed value");
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.values.read().await.keys().cloned().collect())
    }

    async fn clear_all(&self) -> Result<()> {
        self.values.write().await.clear();
        Ok(())
    }
}
