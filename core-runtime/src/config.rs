//! # Client Configuration Module
//!
//! Provides configuration management for the storefront client core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `ClientConfig` holding every host bridge and setting the core needs. The
//! builder fails fast when a required bridge is missing.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - REST transport (desktop default: reqwest)
//! - `KeyValueStore` (cookie scope) - first-preference token copy
//!   (desktop default: in-memory cookie jar)
//! - `KeyValueStore` (persistent scope) - survives restarts
//!   (desktop default: SQLite)
//! - `Navigator` - route changes (desktop default: history stack)
//! - `Notifier` - toasts (desktop default: tracing)
//!
//! ## Optional Dependencies
//!
//! - `KeyValueStore` (session scope) - only ever cleared on logout
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults are
//! injected for every bridge that was not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ClientConfig;
//! use std::sync::Arc;
//!
//! let config = ClientConfig::builder()
//!     .api_base_url("https://dealer.example.com/api")
//!     .http_client(Arc::new(MyHttpClient))
//!     .cookie_store(Arc::new(MyCookieJar))
//!     .persistent_store(Arc::new(MyLocalStorage))
//!     .navigator(Arc::new(MyRouter))
//!     .notifier(Arc::new(MyToaster))
//!     .build()?;
//! ```
//!
//! The API base URL can also come from the environment:
//!
//! ```ignore
//! // DEALERSHIP_API_URL=https://dealer.example.com/api
//! let config = ClientConfig::from_env().build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{HttpClient, KeyValueStore, Navigator, Notifier};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Base URL used when none is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "DEALERSHIP_API_URL";

/// Upper bound on a single token refresh round-trip.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Host routes the core navigates to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    pub home: String,
    pub login: String,
    pub admin: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            home: "/".to_string(),
            login: "/auth/login".to_string(),
            admin: "/admin".to_string(),
        }
    }
}

/// Everything the core needs from its host.
///
/// Use [`ClientConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct ClientConfig {
    /// Root of the REST API. Relative endpoint paths are joined onto it.
    pub api_base_url: Url,

    pub http_client: Arc<dyn HttpClient>,

    /// Cookie jar; read first.
    pub cookie_store: Arc<dyn KeyValueStore>,

    /// localStorage equivalent; read second.
    pub persistent_store: Arc<dyn KeyValueStore>,

    /// sessionStorage equivalent. Only cleared.
    pub session_store: Option<Arc<dyn KeyValueStore>>,

    pub navigator: Arc<dyn Navigator>,

    pub notifier: Arc<dyn Notifier>,

    pub routes: Routes,

    pub refresh_timeout: Duration,

    /// Capacity of the event bus channel.
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("http_client", &"HttpClient { ... }")
            .field("cookie_store", &"KeyValueStore { ... }")
            .field("persistent_store", &"KeyValueStore { ... }")
            .field(
                "session_store",
                &self.session_store.as_ref().map(|_| "KeyValueStore { ... }"),
            )
            .field("routes", &self.routes)
            .field("refresh_timeout", &self.refresh_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl ClientConfig {
    /// Creates a new builder for constructing a `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Builder seeded with the base URL from [`API_URL_ENV`], when set.
    pub fn from_env() -> ClientConfigBuilder {
        let builder = ClientConfigBuilder::default();
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => builder.api_base_url(url.trim()),
            _ => builder,
        }
    }

    /// Absolute URL for an endpoint path such as `/auth/login/`.
    ///
    /// Absolute `http(s)` URLs are returned untouched.
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.api_base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The base URL is http(s) and can carry a path
    /// - The refresh timeout is non-zero
    /// - Routes are absolute paths
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.api_base_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "API base URL must use http or https, got '{}'",
                self.api_base_url.scheme()
            )));
        }

        if self.api_base_url.cannot_be_a_base() {
            return Err(Error::Config(
                "API base URL cannot carry endpoint paths".to_string(),
            ));
        }

        if self.refresh_timeout.is_zero() {
            return Err(Error::Config(
                "Refresh timeout must be greater than zero".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        for (name, route) in [
            ("home", &self.routes.home),
            ("login", &self.routes.login),
            ("admin", &self.routes.admin),
        ] {
            if !route.starts_with('/') {
                return Err(Error::Config(format!(
                    "The {} route must be an absolute path, got '{}'",
                    name, route
                )));
            }
        }

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
mod defaults {
    use super::*;
    use bridge_desktop::{
        HistoryNavigator, MemoryStore, ReqwestHttpClient, SqliteKeyValueStore, TracingNotifier,
    };

    pub fn http_client() -> Result<Arc<dyn HttpClient>> {
        let client = ReqwestHttpClient::new()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Arc::new(client))
    }

    pub fn cookie_store() -> Result<Arc<dyn KeyValueStore>> {
        Ok(Arc::new(MemoryStore::cookie_jar()))
    }

    pub fn persistent_store() -> Result<Arc<dyn KeyValueStore>> {
        // The lazy pool spawns its maintenance tasks on the current runtime.
        tokio::runtime::Handle::try_current().map_err(|_| {
            Error::Internal(
                "The default persistent store must be created inside a Tokio runtime".to_string(),
            )
        })?;

        let store = SqliteKeyValueStore::open_lazy(SqliteKeyValueStore::default_path())
            .map_err(|e| Error::Internal(format!("Failed to open persistent store: {}", e)))?;
        Ok(Arc::new(store))
    }

    pub fn session_store() -> Option<Arc<dyn KeyValueStore>> {
        Some(Arc::new(MemoryStore::session()))
    }

    pub fn navigator() -> Result<Arc<dyn Navigator>> {
        Ok(Arc::new(HistoryNavigator::default()))
    }

    pub fn notifier() -> Result<Arc<dyn Notifier>> {
        Ok(Arc::new(TracingNotifier))
    }
}

#[cfg(not(feature = "desktop-shims"))]
mod defaults {
    use super::*;

    fn capability_missing(capability: &str, message: &str) -> Error {
        Error::CapabilityMissing {
            capability: capability.to_string(),
            message: format!(
                "{} Desktop: enable the 'desktop-shims' feature to use the default implementation.",
                message
            ),
        }
    }

    pub fn http_client() -> Result<Arc<dyn HttpClient>> {
        Err(capability_missing(
            "HttpClient",
            "HttpClient implementation is required to reach the dealership API.",
        ))
    }

    pub fn cookie_store() -> Result<Arc<dyn KeyValueStore>> {
        Err(capability_missing(
            "CookieStore",
            "Cookie KeyValueStore is required for session token storage. \
             Web: inject a document.cookie-backed store.",
        ))
    }

    pub fn persistent_store() -> Result<Arc<dyn KeyValueStore>> {
        Err(capability_missing(
            "PersistentStore",
            "Persistent KeyValueStore is required for session token storage. \
             Web: inject a localStorage-backed store.",
        ))
    }

    pub fn session_store() -> Option<Arc<dyn KeyValueStore>> {
        None
    }

    pub fn navigator() -> Result<Arc<dyn Navigator>> {
        Err(capability_missing(
            "Navigator",
            "Navigator implementation is required for login and home redirects.",
        ))
    }

    pub fn notifier() -> Result<Arc<dyn Notifier>> {
        Err(capability_missing(
            "Notifier",
            "Notifier implementation is required to surface admin gate notices.",
        ))
    }
}

/// Builder for constructing [`ClientConfig`] instances.
#[derive(Default)]
pub struct ClientConfigBuilder {
    api_base_url: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    cookie_store: Option<Arc<dyn KeyValueStore>>,
    persistent_store: Option<Arc<dyn KeyValueStore>>,
    session_store: Option<Arc<dyn KeyValueStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    notifier: Option<Arc<dyn Notifier>>,
    routes: Option<Routes>,
    refresh_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
}

impl ClientConfigBuilder {
    /// Sets the API root, e.g. `https://dealer.example.com/api`.
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn cookie_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.cookie_store = Some(store);
        self
    }

    pub fn persistent_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.persistent_store = Some(store);
        self
    }

    pub fn session_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn routes(mut self, routes: Routes) -> Self {
        self.routes = Some(routes);
        self
    }

    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = Some(timeout);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `ClientConfig`.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a required bridge was not provided
    ///   and no desktop default is available
    /// - [`Error::Config`] when the base URL does not parse or validation fails
    pub fn build(self) -> Result<ClientConfig> {
        let raw_url = self
            .api_base_url
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = Url::parse(&raw_url)
            .map_err(|e| Error::Config(format!("Invalid API base URL '{}': {}", raw_url, e)))?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => defaults::http_client()?,
        };
        let cookie_store = match self.cookie_store {
            Some(store) => store,
            None => defaults::cookie_store()?,
        };
        let persistent_store = match self.persistent_store {
            Some(store) => store,
            None => defaults::persistent_store()?,
        };
        let navigator = match self.navigator {
            Some(navigator) => navigator,
            None => defaults::navigator()?,
        };
        let notifier = match self.notifier {
            Some(notifier) => notifier,
            None => defaults::notifier()?,
        };

        let config = ClientConfig {
            api_base_url,
            http_client,
            cookie_store,
            persistent_store,
            session_store: self.session_store.or_else(defaults::session_store),
            navigator,
            notifier,
            routes: self.routes.unwrap_or_default(),
            refresh_timeout: self.refresh_timeout.unwrap_or(DEFAULT_REFRESH_TIMEOUT),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{BridgeError, HttpRequest, HttpResponse, Notice};

    struct NoopHttp;

    #[async_trait]
    impl HttpClient for NoopHttp {
        async fn execute(&self, _request: HttpRequest) -> std::result::Result<HttpResponse, BridgeError> {
            Ok(HttpResponse::new(200, "{}"))
        }
    }

    struct NoopStore;

    #[async_trait]
    impl KeyValueStore for NoopStore {
        async fn set(&self, _key: &str, _value: &str) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn get(&self, _key: &str) -> std::result::Result<Option<String>, BridgeError> {
            Ok(None)
        }

        async fn remove(&self, _key: &str) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn list_keys(&self) -> std::result::Result<Vec<String>, BridgeError> {
            Ok(Vec::new())
        }

        async fn clear_all(&self) -> std::result::Result<(), BridgeError> {
            Ok(())
        }
    }

    struct NoopNavigator;

    #[async_trait]
    impl Navigator for NoopNavigator {
        fn current_path(&self) -> String {
            "/".to_string()
        }

        async fn navigate(&self, _path: &str) {}

        async fn replace(&self, _path: &str) {}
    }

    struct NoopNotifier;

    impl Notifier for NoopNotifier {
        fn notify(&self, _notice: Notice) {}
    }

    fn complete_builder() -> ClientConfigBuilder {
        ClientConfig::builder()
            .http_client(Arc::new(NoopHttp))
            .cookie_store(Arc::new(NoopStore))
            .persistent_store(Arc::new(NoopStore))
            .navigator(Arc::new(NoopNavigator))
            .notifier(Arc::new(NoopNotifier))
    }

    #[test]
    fn test_builder_defaults() {
        let config = complete_builder().build().unwrap();

        assert_eq!(config.api_base_url.as_str(), "http://localhost:8000/api");
        assert_eq!(config.routes, Routes::default());
        assert_eq!(config.refresh_timeout, DEFAULT_REFRESH_TIMEOUT);
        assert_eq!(config.routes.login, "/auth/login");
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let config = complete_builder()
            .api_base_url("https://dealer.example.com/api/")
            .build()
            .unwrap();

        assert_eq!(
            config.endpoint("/auth/login/"),
            "https://dealer.example.com/api/auth/login/"
        );
        assert_eq!(
            config.endpoint("cars/featured/"),
            "https://dealer.example.com/api/cars/featured/"
        );
        assert_eq!(
            config.endpoint("https://cdn.example.com/x"),
            "https://cdn.example.com/x"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let err = complete_builder()
            .api_base_url("not a url")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Invalid API base URL"));

        let err = complete_builder()
            .api_base_url("ftp://dealer.example.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn test_validate_rejects_zero_refresh_timeout() {
        let err = complete_builder()
            .refresh_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Refresh timeout"));
    }

    #[test]
    fn test_validate_rejects_relative_routes() {
        let err = complete_builder()
            .routes(Routes {
                login: "auth/login".to_string(),
                ..Routes::default()
            })
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("login route"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_persistent_store() {
        let result = ClientConfig::builder()
            .http_client(Arc::new(NoopHttp))
            .cookie_store(Arc::new(NoopStore))
            .navigator(Arc::new(NoopNavigator))
            .notifier(Arc::new(NoopNotifier))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "PersistentStore")
            }
            other => panic!("expected missing capability, got {:?}", other),
        }
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_session_store_is_optional() {
        let config = complete_builder().build().unwrap();
        assert!(config.session_store.is_none());
    }

    #[cfg(feature = "desktop-shims")]
    #[tokio::test]
    async fn test_desktop_defaults_fill_missing_bridges() {
        let config = ClientConfig::builder().build().unwrap();
        assert!(config.session_store.is_some());
    }
}
