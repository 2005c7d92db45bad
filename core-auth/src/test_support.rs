//! Mock host bridges shared by the unit tests of this crate.

use crate::client::ApiClient;
use crate::token_store::TokenStore;
use crate::types::Profile;
use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::navigation::{Navigator, Notice, Notifier};
use bridge_traits::storage::KeyValueStore;
use core_runtime::config::ClientConfig;
use core_runtime::events::EventBus;
use mockall::mock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex as TokioMutex;

pub(crate) fn profile(id: i64, username: &str, is_staff: bool, is_superuser: bool) -> Profile {
    Profile {
        id,
        username: username.to_string(),
        email: format!("{}@example.com", username),
        first_name: String::new(),
        last_name: String::new(),
        is_staff,
        is_superuser,
        extra: Map::new(),
    }
}

pub(crate) fn json_response(status: u16, body: Value) -> HttpResponse {
    HttpResponse::new(status, body.to_string())
}

// ----------------------------------------------------------------------
// Storage
// ----------------------------------------------------------------------

/// In-memory store; clones share state.
#[derive(Clone, Default)]
pub(crate) struct MockStore {
    values: Arc<TokioMutex<HashMap<String, String>>>,
    failing: bool,
}

impl MockStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A store rejecting every operation.
    pub(crate) fn failing() -> Self {
        Self {
            values: Arc::default(),
            failing: true,
        }
    }

    pub(crate) async fn insert(&self, key: &str, value: &str) {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
    }

    /// Synchronous write for use inside HTTP handlers.
    pub(crate) fn insert_now(&self, key: &str, value: &str) {
        if let Ok(mut values) = self.values.try_lock() {
            values.insert(key.to_string(), value.to_string());
        }
    }

    pub(crate) async fn value(&self, key: &str) -> Option<String> {
        self.values.lock().await.get(key).cloned()
    }

    pub(crate) async fn is_empty(&self) -> bool {
        self.values.lock().await.is_empty()
    }

    fn check(&self) -> BridgeResult<()> {
        if self.failing {
            Err(BridgeError::Storage("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyValueStore for MockStore {
    async fn set(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.check()?;
        self.insert(key, value).await;
        Ok(())
    }

    async fn get(&self, key: &str) -> BridgeResult<Option<String>> {
        self.check()?;
        Ok(self.value(key).await)
    }

    async fn remove(&self, key: &str) -> BridgeResult<()> {
        self.check()?;
        self.values.lock().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> BridgeResult<Vec<String>> {
        self.check()?;
        Ok(self.values.lock().await.keys().cloned().collect())
    }

    async fn clear_all(&self) -> BridgeResult<()> {
        self.check()?;
        self.values.lock().await.clear();
        Ok(())
    }
}

// ----------------------------------------------------------------------
// HTTP
// ----------------------------------------------------------------------

type Handler = dyn Fn(&HttpRequest) -> BridgeResult<HttpResponse> + Send + Sync;

/// HTTP client answering from a closure and recording every request.
pub(crate) struct MockHttp {
    handler: Box<Handler>,
    delay: Option<Duration>,
    requests: StdMutex<Vec<HttpRequest>>,
}

impl MockHttp {
    pub(crate) fn new(
        handler: impl Fn(&HttpRequest) -> BridgeResult<HttpResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delay: None,
            requests: StdMutex::new(Vec::new()),
        }
    }

    /// Sleep before answering, so concurrent callers interleave.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests whose URL ends with `suffix`.
    pub(crate) fn calls_to(&self, suffix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url.ends_with(suffix))
            .count()
    }

    /// Bearer tokens sent to URLs ending with `suffix`, in order.
    pub(crate) fn bearers_for(&self, suffix: &str) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url.ends_with(suffix))
            .map(|request| request.bearer().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl HttpClient for MockHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(&request)
    }
}

// ----------------------------------------------------------------------
// Navigation
// ----------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NavCall {
    Navigate(String),
    Replace(String),
}

pub(crate) struct RecordingNavigator {
    current: StdMutex<String>,
    calls: StdMutex<Vec<NavCall>>,
}

impl RecordingNavigator {
    pub(crate) fn at(path: &str) -> Self {
        Self {
            current: StdMutex::new(path.to_string()),
            calls: StdMutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<NavCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Navigator for RecordingNavigator {
    fn current_path(&self) -> String {
        self.current.lock().unwrap().clone()
    }

    async fn navigate(&self, path: &str) {
        *self.current.lock().unwrap() = path.to_string();
        self.calls
            .lock()
            .unwrap()
            .push(NavCall::Navigate(path.to_string()));
    }

    async fn replace(&self, path: &str) {
        *self.current.lock().unwrap() = path.to_string();
        self.calls
            .lock()
            .unwrap()
            .push(NavCall::Replace(path.to_string()));
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    notices: StdMutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub(crate) fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

mock! {
    pub Navigator {}

    #[async_trait]
    impl Navigator for Navigator {
        fn current_path(&self) -> String;
        async fn navigate(&self, path: &str);
        async fn replace(&self, path: &str);
    }
}

mock! {
    pub Notifier {}

    impl Notifier for Notifier {
        fn notify(&self, notice: Notice);
    }
}

// ----------------------------------------------------------------------
// Wiring
// ----------------------------------------------------------------------

/// A fully wired client over mock bridges.
pub(crate) struct Harness {
    pub config: ClientConfig,
    pub http: Arc<MockHttp>,
    pub cookie: MockStore,
    pub persistent: MockStore,
    pub session: MockStore,
    pub tokens: TokenStore,
    pub events: EventBus,
    pub api: ApiClient,
}

impl Harness {
    pub(crate) fn new(
        http: MockHttp,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_cookie(http, navigator, notifier, MockStore::new())
    }

    fn with_cookie(
        http: MockHttp,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        cookie: MockStore,
    ) -> Self {
        let http = Arc::new(http);
        let persistent = MockStore::new();
        let session = MockStore::new();

        let config = ClientConfig::builder()
            .api_base_url("http://api.test/api")
            .http_client(Arc::clone(&http) as Arc<dyn HttpClient>)
            .cookie_store(Arc::new(cookie.clone()))
            .persistent_store(Arc::new(persistent.clone()))
            .session_store(Arc::new(session.clone()))
            .navigator(navigator)
            .notifier(notifier)
            .refresh_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        let tokens = TokenStore::from_config(&config);
        let events = EventBus::new(32);
        let api = ApiClient::new(&config, tokens.clone(), events.clone());

        Self {
            config,
            http,
            cookie,
            persistent,
            session,
            tokens,
            events,
            api,
        }
    }

    /// Harness with recording navigator (at `path`) and notifier.
    pub(crate) fn recording(
        http: MockHttp,
        path: &str,
    ) -> (Self, Arc<RecordingNavigator>, Arc<RecordingNotifier>) {
        Self::recording_with_cookie(http, path, MockStore::new())
    }

    /// Like [`Harness::recording`], over a cookie jar the caller already holds.
    pub(crate) fn recording_with_cookie(
        http: MockHttp,
        path: &str,
        cookie: MockStore,
    ) -> (Self, Arc<RecordingNavigator>, Arc<RecordingNotifier>) {
        let navigator = Arc::new(RecordingNavigator::at(path));
        let notifier = Arc::new(RecordingNotifier::default());
        let harness = Self::with_cookie(
            http,
            Arc::clone(&navigator) as Arc<dyn Navigator>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            cookie,
        );
        (harness, navigator, notifier)
    }
}
