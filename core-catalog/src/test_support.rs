//! Client wiring for the unit tests of this crate.
//!
//! Stores and navigation come from the desktop bridge; HTTP answers from a
//! closure.

use async_trait::async_trait;
use bridge_desktop::{HistoryNavigator, MemoryStore};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::navigation::{Notice, Notifier};
use bridge_traits::storage::{KeyValueStore, StorageScope};
use core_auth::{ApiClient, TokenPair, TokenStore};
use core_runtime::config::ClientConfig;
use core_runtime::events::EventBus;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) fn json_response(status: u16, body: Value) -> HttpResponse {
    HttpResponse::new(status, body.to_string())
}

pub(crate) fn car_json(id: i64, slug: &str) -> Value {
    json!({
        "id": id,
        "slug": slug,
        "title": slug.replace('-', " "),
        "price": "19999.00",
        "make": "toyota",
        "is_featured": true
    })
}

type Handler = dyn Fn(&HttpRequest) -> BridgeResult<HttpResponse> + Send + Sync;

pub(crate) struct MockHttp {
    handler: Box<Handler>,
    delay: Option<Duration>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttp {
    pub(crate) fn new(
        handler: impl Fn(&HttpRequest) -> BridgeResult<HttpResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|request| request.url).collect()
    }

    pub(crate) fn bearers(&self) -> Vec<Option<String>> {
        self.requests()
            .iter()
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

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

pub(crate) struct Harness {
    pub config: ClientConfig,
    pub http: Arc<MockHttp>,
    pub tokens: TokenStore,
    pub api: ApiClient,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub(crate) fn new(http: MockHttp) -> Self {
        let http = Arc::new(http);
        let notifier = Arc::new(RecordingNotifier::default());

        let config = ClientConfig::builder()
            .api_base_url("http://api.test/api")
            .http_client(Arc::clone(&http) as Arc<dyn HttpClient>)
            .cookie_store(Arc::new(MemoryStore::cookie_jar()) as Arc<dyn KeyValueStore>)
            .persistent_store(
                Arc::new(MemoryStore::new(StorageScope::Persistent)) as Arc<dyn KeyValueStore>
            )
            .session_store(Arc::new(MemoryStore::session()) as Arc<dyn KeyValueStore>)
            .navigator(Arc::new(HistoryNavigator::new("/")))
            .notifier(Arc::clone(&notifier) as Arc<dyn Notifier>)
            .build()
            .unwrap();

        let tokens = TokenStore::from_config(&config);
        let api = ApiClient::new(&config, tokens.clone(), EventBus::new(16));

        Self {
            config,
            http,
            tokens,
            api,
            notifier,
        }
    }

    /// Harness holding access token `a1` and refresh token `r1`.
    pub(crate) async fn signed_in(http: MockHttp) -> Self {
        let harness = Self::new(http);
        harness
            .tokens
            .set_tokens(&TokenPair::new("a1", "r1"))
            .await
            .unwrap();
        harness
    }

    pub(crate) fn notices(&self) -> Vec<Notice> {
        self.notifier.notices.lock().unwrap().clone()
    }
}
