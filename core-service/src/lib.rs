//! Storefront service façade and bootstrap helpers.
//!
//! This crate wires a [`ClientConfig`] (host bridges for HTTP, storage,
//! navigation and notices) into the session, catalog and admin components
//! of the storefront core, sharing one token store, one event bus and one
//! request pipeline between them. Desktop apps typically enable the
//! `desktop-shims` feature (which depends on `bridge-desktop`) and call
//! [`bootstrap_desktop`].

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use core_auth::{
    AdminGate, ApiClient, AuthManager, IdentityProvider, IdentitySession, SessionSnapshot,
    TokenStore,
};
use core_catalog::{AdminConsole, CarCatalog};
use core_runtime::config::ClientConfig;
use core_runtime::events::{CoreEvent, EventBus};
use tokio::sync::{broadcast, watch};
use tracing::info;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::{HistoryNavigator, MemoryStore, TracingNotifier};

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct StorefrontService {
    config: Arc<ClientConfig>,
    events: EventBus,
    auth: AuthManager,
    admin_gate: AdminGate,
    catalog: CarCatalog,
    admin: AdminConsole,
    identity: Option<Arc<IdentitySession>>,
}

impl StorefrontService {
    /// Create a new service from the provided configuration.
    pub fn new(config: ClientConfig) -> Self {
        let events = EventBus::new(config.event_buffer_size);
        let tokens = TokenStore::from_config(&config);
        let api = ApiClient::new(&config, tokens, events.clone());

        Self {
            auth: AuthManager::new(&config, api.clone()),
            admin_gate: AdminGate::new(&config, api.clone()),
            catalog: CarCatalog::new(api.clone()),
            admin: AdminConsole::new(&config, api),
            identity: None,
            events,
            config: Arc::new(config),
        }
    }

    /// Attach an identity provider for provider-backed sign-in.
    ///
    /// Call [`IdentitySession::start`] on the returned session once the host
    /// is ready to observe auth state.
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        let api = self.auth.api().clone();
        self.identity = Some(Arc::new(IdentitySession::new(&self.config, api, provider)));
        self
    }

    /// Load the persisted session so subscribers see it immediately.
    pub async fn restore_session(&self) -> SessionSnapshot {
        let snapshot = self.auth.tokens().reload().await;
        info!(
            authenticated = snapshot.authenticated,
            "Storefront session restored"
        );
        snapshot
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    pub fn api(&self) -> &ApiClient {
        self.auth.api()
    }

    pub fn admin_gate(&self) -> &AdminGate {
        &self.admin_gate
    }

    pub fn catalog(&self) -> &CarCatalog {
        &self.catalog
    }

    pub fn admin(&self) -> &AdminConsole {
        &self.admin
    }

    /// Identity-provider session, if a provider was attached.
    pub fn identity(&self) -> Option<&Arc<IdentitySession>> {
        self.identity.as_ref()
    }

    pub fn subscribe_session(&self) -> watch::Receiver<SessionSnapshot> {
        self.auth.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Reads the API base URL from the environment, fills every bridge with the
/// desktop defaults and restores the persisted session. Must be called from
/// within a Tokio runtime.
///
/// ```no_run
/// # async fn example() -> core_service::Result<()> {
/// let storefront = core_service::bootstrap_desktop().await?;
/// let featured = storefront.catalog().featured().await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop() -> Result<StorefrontService> {
    let config = ClientConfig::from_env().build()?;
    let service = StorefrontService::new(config);
    service.restore_session().await;
    Ok(service)
}
