//! Storage Abstractions
//!
//! Provides a platform-agnostic key-value contract used for every place the
//! client persists session state: the cookie jar, the persistent store, and
//! the session-scoped store.

use async_trait::async_trait;
use std::fmt;

use crate::error::Result;

/// Where a [`KeyValueStore`] keeps its values.
///
/// The scope only affects logging and read preference; every scope honours
/// the same contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageScope {
    /// Cookie jar, readable by server-side requests.
    Cookie,
    /// Survives restarts (localStorage on the web, SQLite on desktop).
    Persistent,
    /// Lives as long as the current browsing session or process.
    Session,
}

impl StorageScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageScope::Cookie => "cookie",
            StorageScope::Persistent => "persistent",
            StorageScope::Session => "session",
        }
    }
}

impl fmt::Display for StorageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String key-value storage trait
///
/// Abstracts platform-specific storage:
/// - Web: `document.cookie`, localStorage, sessionStorage
/// - Desktop: in-memory jar, SQLite-backed store
///
/// Writes are last-write-wins. No transaction spans two stores.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::KeyValueStore;
///
/// async fn remember(store: &dyn KeyValueStore, token: &str) -> Result<()> {
///     store.set("access_token", token).await
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Delete a value. Deleting a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Check if a key exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// List all keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Clear every value in this store
    async fn clear_all(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_names() {
        assert_eq!(StorageScope::Cookie.to_string(), "cookie");
        assert_eq!(StorageScope::Persistent.as_str(), "persistent");
        assert_eq!(StorageScope::Session.as_str(), "session");
    }
}
