//! Session Token Storage
//!
//! This module owns the backend session: the access/refresh token pair and the
//! cached profile. Values are written through to every storage backend so a
//! reload (or a server-side cookie read) sees the same session, while callers
//! only ever talk to one repository.
//!
//! ## Backends
//!
//! - **Cookie jar**: read first
//! - **Persistent store**: read when the cookie copy is missing or unreadable
//! - **Session store** (optional): never read, only cleared on logout
//!
//! Writes are last-write-wins across backends; there is no transaction. A
//! write succeeds when at least one backend accepted it.
//!
//! ## Observing the session
//!
//! Every mutation recomputes a [`SessionSnapshot`] and publishes it on a
//! `watch` channel when it changed:
//!
//! ```no_run
//! # use core_auth::TokenStore;
//! # async fn example(store: TokenStore) {
//! let mut session = store.subscribe();
//! while session.changed().await.is_ok() {
//!     let snapshot = session.borrow_and_update().clone();
//!     println!("authenticated: {}", snapshot.authenticated);
//! }
//! # }
//! ```
//!
//! Token values are never logged.

use crate::error::{AuthError, Result};
use crate::types::{Profile, SessionSnapshot, TokenPair};
use bridge_traits::storage::{KeyValueStore, StorageScope};
use core_runtime::config::ClientConfig;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Storage keys shared with the web storefront.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const USER: &str = "user";
    /// Written by older builds; cleared with the session.
    pub const LEGACY_USER_DATA: &str = "user_data";
    /// Written by older builds; cleared with the session.
    pub const LEGACY_IS_AUTHENTICATED: &str = "isAuthenticated";

    pub const SESSION_KEYS: &[&str] = &[
        ACCESS_TOKEN,
        REFRESH_TOKEN,
        USER,
        LEGACY_USER_DATA,
        LEGACY_IS_AUTHENTICATED,
    ];
}

#[derive(Clone)]
struct Backend {
    scope: StorageScope,
    store: Arc<dyn KeyValueStore>,
}

/// Write-through session repository.
///
/// Cloning is cheap; clones share backends and subscribers.
#[derive(Clone)]
pub struct TokenStore {
    /// Read-preference order.
    backends: Vec<Backend>,
    ephemeral: Option<Backend>,
    snapshot: Arc<watch::Sender<SessionSnapshot>>,
}

impl TokenStore {
    /// Create a store over a cookie jar and a persistent store.
    pub fn new(cookie: Arc<dyn KeyValueStore>, persistent: Arc<dyn KeyValueStore>) -> Self {
        debug!("Initializing TokenStore");
        let (snapshot, _) = watch::channel(SessionSnapshot::default());
        Self {
            backends: vec![
                Backend {
                    scope: StorageScope::Cookie,
                    store: cookie,
                },
                Backend {
                    scope: StorageScope::Persistent,
                    store: persistent,
                },
            ],
            ephemeral: None,
            snapshot: Arc::new(snapshot),
        }
    }

    /// Attach a session-scoped store that is cleared along with the session.
    pub fn with_session_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.ephemeral = Some(Backend {
            scope: StorageScope::Session,
            store,
        });
        self
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let store = Self::new(
            Arc::clone(&config.cookie_store),
            Arc::clone(&config.persistent_store),
        );
        match &config.session_store {
            Some(session) => store.with_session_store(Arc::clone(session)),
            None => store,
        }
    }

    // ------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------

    /// Store both tokens in every backend.
    pub async fn set_tokens(&self, tokens: &TokenPair) -> Result<()> {
        self.write_all(keys::ACCESS_TOKEN, &tokens.access).await?;
        self.write_all(keys::REFRESH_TOKEN, &tokens.refresh).await?;
        info!("Session tokens stored");
        self.publish().await;
        Ok(())
    }

    /// Replace only the access token, e.g. after a refresh.
    pub async fn set_access_token(&self, access: &str) -> Result<()> {
        self.write_all(keys::ACCESS_TOKEN, access).await?;
        debug!("Access token replaced");
        self.publish().await;
        Ok(())
    }

    /// Replace only the refresh token (rotating backends).
    pub async fn set_refresh_token(&self, refresh: &str) -> Result<()> {
        self.write_all(keys::REFRESH_TOKEN, refresh).await?;
        debug!("Refresh token rotated");
        Ok(())
    }

    /// Delete both tokens from every backend.
    pub async fn clear_tokens(&self) {
        self.remove_all(&[keys::ACCESS_TOKEN, keys::REFRESH_TOKEN], false)
            .await;
        self.publish().await;
    }

    /// Access token from the first backend holding a non-empty value.
    pub async fn get_auth_token(&self) -> Option<String> {
        self.read_first(keys::ACCESS_TOKEN).await
    }

    pub async fn get_refresh_token(&self) -> Option<String> {
        self.read_first(keys::REFRESH_TOKEN).await
    }

    // ------------------------------------------------------------------
    // Profile
    // ------------------------------------------------------------------

    /// Cache the profile as JSON in every backend.
    pub async fn set_user(&self, profile: &Profile) -> Result<()> {
        let json = serde_json::to_string(profile)
            .map_err(|e| AuthError::Storage(format!("Failed to serialize profile: {}", e)))?;
        self.write_all(keys::USER, &json).await?;
        debug!(user_id = profile.id, "Profile cached");
        self.publish().await;
        Ok(())
    }

    /// The cached profile.
    ///
    /// A cached value that no longer parses is discarded and reported as
    /// "no profile".
    pub async fn get_current_user(&self) -> Option<Profile> {
        let raw = self.read_first(keys::USER).await?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(error = %e, "Discarding malformed cached profile");
                self.remove_all(&[keys::USER], false).await;
                None
            }
        }
    }

    pub async fn clear_user(&self) {
        self.remove_all(&[keys::USER], false).await;
        self.publish().await;
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Access token present AND a readable cached profile.
    pub async fn is_authenticated(&self) -> bool {
        self.get_auth_token().await.is_some() && self.get_current_user().await.is_some()
    }

    /// Role flags of the cached profile. For gating use a live fetch instead.
    pub async fn is_admin(&self) -> bool {
        self.get_current_user()
            .await
            .is_some_and(|profile| profile.is_admin())
    }

    /// Remove every session key (including legacy ones) from every backend,
    /// the session-scoped store included.
    pub async fn clear_session(&self) {
        self.remove_all(keys::SESSION_KEYS, true).await;
        info!("Session cleared");
        self.publish().await;
    }

    /// Watch the session. The receiver starts with the current snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    /// Last published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Re-read storage and publish the result, e.g. at startup.
    pub async fn reload(&self) -> SessionSnapshot {
        self.publish().await;
        self.snapshot()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn write_all(&self, key: &str, value: &str) -> Result<()> {
        let mut accepted = 0;
        let mut last_error = None;

        for backend in &self.backends {
            match backend.store.set(key, value).await {
                Ok(()) => accepted += 1,
                Err(e) => {
                    warn!(scope = %backend.scope, key, error = %e, "Backend rejected write");
                    last_error = Some(e);
                }
            }
        }

        if accepted == 0 {
            return Err(match last_error {
                Some(e) => AuthError::Storage(format!("No backend accepted '{}': {}", key, e)),
                None => AuthError::Storage(format!("No backend configured for '{}'", key)),
            });
        }
        Ok(())
    }

    async fn read_first(&self, key: &str) -> Option<String> {
        for backend in &self.backends {
            match backend.store.get(key).await {
                Ok(Some(value)) if !value.is_empty() => return Some(value),
                Ok(_) => {}
                Err(e) => {
                    warn!(scope = %backend.scope, key, error = %e, "Backend read failed");
                }
            }
        }
        None
    }

    async fn remove_all(&self, keys: &[&str], include_ephemeral: bool) {
        let ephemeral = self.ephemeral.iter().filter(|_| include_ephemeral);
        for backend in self.backends.iter().chain(ephemeral) {
            for key in keys {
                if let Err(e) = backend.store.remove(key).await {
                    warn!(scope = %backend.scope, key, error = %e, "Backend delete failed");
                }
            }
        }
    }

    async fn publish(&self) {
        let user = self.get_current_user().await;
        let authenticated = user.is_some() && self.get_auth_token().await.is_some();
        let next = SessionSnapshot {
            authenticated,
            user,
        };

        self.snapshot.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
