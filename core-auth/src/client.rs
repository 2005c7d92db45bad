//! # Authenticated API Client
//!
//! Every call to the dealership backend goes through [`ApiClient`]. It
//! attaches the stored bearer token, dispatches through the host
//! [`HttpClient`], and recovers from an expired access token once per request.
//!
//! ## Recovery
//!
//! A 401 on a request sent with [`AuthPolicy::Refreshing`] triggers one
//! recovery cycle:
//!
//! 1. No refresh token stored: the 401 is returned as [`AuthError::Unauthorized`].
//! 2. The stored access token differs from the one sent: another request
//!    refreshed meanwhile, so the request is re-issued with the stored token.
//! 3. Otherwise the request joins (or starts) the single refresh in flight
//!    and is re-issued once with the new token.
//!
//! A failed refresh ends the session: storage is cleared, the host is sent to
//! the login route and a [`AuthEvent::SessionExpired`] event is emitted.

use crate::error::{AuthError, RefreshFailure, Result};
use crate::refresh::RefreshCoordinator;
use crate::token_store::TokenStore;
use crate::types::{jwt_expiry, RefreshRequest, RefreshResponse};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, AUTHORIZATION};
use bridge_traits::navigation::Navigator;
use core_runtime::config::{ClientConfig, Routes};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use core_runtime::logging::strip_query;
use futures::future::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const REFRESH_PATH: &str = "/token/refresh/";

/// How a request is authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// No bearer token; a 401 is returned as is.
    Anonymous,
    /// Bearer token if one is stored; a 401 is returned as is.
    Bearer,
    /// Bearer token with one refresh-and-retry on 401.
    Refreshing,
}

/// Cheap to clone; clones share the token store and the refresh slot.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    http: Arc<dyn HttpClient>,
    navigator: Arc<dyn Navigator>,
    tokens: TokenStore,
    event_bus: EventBus,
    refresh: RefreshCoordinator,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, tokens: TokenStore, event_bus: EventBus) -> Self {
        Self {
            inner: Arc::new(Inner {
                config: config.clone(),
                http: Arc::clone(&config.http_client),
                navigator: Arc::clone(&config.navigator),
                tokens,
                event_bus,
                refresh: RefreshCoordinator::new(),
            }),
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.event_bus
    }

    pub fn routes(&self) -> &Routes {
        &self.inner.config.routes
    }

    /// Absolute URL for an API path.
    pub fn endpoint(&self, path: &str) -> String {
        self.inner.config.endpoint(path)
    }

    /// Send a request and return its 2xx response.
    ///
    /// Non-2xx responses become a classified [`AuthError`].
    pub async fn send(&self, request: HttpRequest, policy: AuthPolicy) -> Result<HttpResponse> {
        let sent_token = match policy {
            AuthPolicy::Anonymous => None,
            AuthPolicy::Bearer | AuthPolicy::Refreshing => self.inner.tokens.get_auth_token().await,
        };

        let response = self
            .dispatch(with_bearer(request.clone(), sent_token.as_deref()))
            .await?;
        if response.is_success() {
            return Ok(response);
        }
        if response.status != 401 || policy != AuthPolicy::Refreshing {
            return Err(AuthError::from_response(&response));
        }

        let Some(refresh_token) = self.inner.tokens.get_refresh_token().await else {
            debug!(url = %strip_query(&request.url), "401 without refresh token");
            return Err(AuthError::Unauthorized);
        };

        let access = match self.inner.tokens.get_auth_token().await {
            Some(stored) if sent_token.as_deref() != Some(stored.as_str()) => {
                debug!("Access token changed while request was in flight; retrying");
                stored
            }
            _ => self
                .refresh_access_token(refresh_token)
                .await
                .map_err(AuthError::TokenRefreshFailed)?,
        };

        let retried = self.dispatch(with_bearer(request, Some(&access))).await?;
        if retried.is_success() {
            Ok(retried)
        } else {
            Err(AuthError::from_response(&retried))
        }
    }

    pub async fn get_json<T>(&self, path: &str, policy: AuthPolicy) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let request = HttpRequest::new(HttpMethod::Get, self.endpoint(path));
        let response = self.send(request, policy).await?;
        parse(&response)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B, policy: AuthPolicy) -> Result<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let request = HttpRequest::new(HttpMethod::Post, self.endpoint(path)).json(body)?;
        let response = self.send(request, policy).await?;
        parse(&response)
    }

    /// POST and discard the response body.
    pub async fn post<B>(&self, path: &str, body: &B, policy: AuthPolicy) -> Result<()>
    where
        B: Serialize,
    {
        let request = HttpRequest::new(HttpMethod::Post, self.endpoint(path)).json(body)?;
        self.send(request, policy).await.map(|_| ())
    }

    async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        let url = strip_query(&request.url).to_string();
        match self.inner.http.execute(request).await {
            Ok(response) => {
                debug!(method = method.as_str(), url = %url, status = response.status, "Request completed");
                Ok(response)
            }
            Err(e) => {
                warn!(method = method.as_str(), url = %url, error = %e, "Request failed");
                Err(e.into())
            }
        }
    }

    async fn refresh_access_token(&self, refresh_token: String) -> std::result::Result<String, RefreshFailure> {
        let inner = Arc::clone(&self.inner);
        self.inner
            .refresh
            .run(move || async move { inner.perform_refresh(refresh_token).await }.boxed())
            .await
    }
}

impl Inner {
    /// One refresh round-trip. Runs at most once per burst of 401s, so session
    /// teardown on failure happens here rather than in each waiting request.
    async fn perform_refresh(&self, refresh_token: String) -> std::result::Result<String, RefreshFailure> {
        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::TokenRefreshing));

        match self.request_new_access(&refresh_token).await {
            Ok(body) => {
                if let Err(e) = self.tokens.set_access_token(&body.access).await {
                    warn!(error = %e, "Refreshed access token could not be stored");
                }
                if let Some(rotated) = body.refresh.as_deref().filter(|r| !r.is_empty()) {
                    if let Err(e) = self.tokens.set_refresh_token(rotated).await {
                        warn!(error = %e, "Rotated refresh token could not be stored");
                    }
                }

                let expires_at = jwt_expiry(&body.access);
                info!(expires_at, "Access token refreshed");
                let _ = self
                    .event_bus
                    .emit(CoreEvent::Auth(AuthEvent::TokenRefreshed { expires_at }));
                Ok(body.access)
            }
            Err(failure) => {
                warn!(error = %failure, "Token refresh failed; ending session");
                self.tokens.clear_session().await;

                let login = &self.config.routes.login;
                if self.navigator.current_path() != *login {
                    self.navigator.navigate(login).await;
                }

                let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::SessionExpired {
                    message: failure.to_string(),
                }));
                Err(failure)
            }
        }
    }

    async fn request_new_access(
        &self,
        refresh_token: &str,
    ) -> std::result::Result<RefreshResponse, RefreshFailure> {
        let request = HttpRequest::new(HttpMethod::Post, self.config.endpoint(REFRESH_PATH))
            .json(&RefreshRequest {
                refresh: refresh_token,
            })
            .map_err(|e| RefreshFailure::InvalidResponse(e.to_string()))?;

        let timeout: Duration = self.config.refresh_timeout;
        let response = match tokio::time::timeout(timeout, self.http.execute(request)).await {
            Err(_) => return Err(RefreshFailure::Timeout),
            Ok(Err(e)) => return Err(RefreshFailure::Network(e.to_string())),
            Ok(Ok(response)) => response,
        };

        if !response.is_success() {
            return Err(RefreshFailure::Rejected {
                status: response.status,
            });
        }
        response
            .json::<RefreshResponse>()
            .map_err(|e| RefreshFailure::InvalidResponse(e.to_string()))
    }
}

fn with_bearer(request: HttpRequest, token: Option<&str>) -> HttpRequest {
    let request = request.without_header(AUTHORIZATION);
    match token {
        Some(token) => request.bearer_token(token),
        None => request,
    }
}

fn parse<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    response
        .json()
        .map_err(|e| AuthError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::test_support::{json_response, profile, Harness, MockHttp, MockStore, NavCall};
    use crate::token_store::keys;
    use crate::types::{Profile, TokenPair};
    use bridge_traits::error::BridgeError;
    use serde_json::json;

    const PROFILE_PATH: &str = "/auth/profile/";

    /// Backend that accepts only `valid` as bearer and refreshes to `valid`.
    fn backend(valid: &'static str, refresh_status: u16) -> MockHttp {
        MockHttp::new(move |request| {
            if request.url.ends_with(REFRESH_PATH) {
                return Ok(match refresh_status {
                    200 => json_response(200, json!({ "access": valid })),
                    status => json_response(status, json!({ "detail": "Token is invalid or expired" })),
                });
            }
            if request.bearer() == Some(valid) {
                Ok(json_response(200, json!({ "id": 1, "username": "ada" })))
            } else {
                Ok(json_response(401, json!({ "detail": "Given token not valid" })))
            }
        })
    }

    async fn seed(harness: &Harness, access: &str, refresh: &str) {
        harness
            .tokens
            .set_tokens(&TokenPair::new(access, refresh))
            .await
            .unwrap();
        harness.tokens.set_user(&profile(1, "ada", false, false)).await.unwrap();
    }

    #[tokio::test]
    async fn test_bearer_attached_from_store() {
        let (harness, _, _) = Harness::recording(backend("a1", 200), "/");
        seed(&harness, "a1", "r1").await;

        let user: Profile = harness
            .api
            .get_json(PROFILE_PATH, AuthPolicy::Refreshing)
            .await
            .unwrap();

        assert_eq!(user.username, "ada");
        assert_eq!(harness.http.bearers_for(PROFILE_PATH), vec![Some("a1".to_string())]);
        assert_eq!(harness.http.requests()[0].url, "http://api.test/api/auth/profile/");
        assert_eq!(harness.http.calls_to(REFRESH_PATH), 0);
    }

    #[tokio::test]
    async fn test_anonymous_sends_no_bearer() {
        let (harness, _, _) = Harness::recording(backend("a1", 200), "/");
        seed(&harness, "a1", "r1").await;

        let err = harness
            .api
            .get_json::<Profile>(PROFILE_PATH, AuthPolicy::Anonymous)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Unauthorized));
        assert_eq!(harness.http.bearers_for(PROFILE_PATH), vec![None]);
        assert_eq!(harness.http.calls_to(REFRESH_PATH), 0);
    }

    #[tokio::test]
    async fn test_expired_token_refreshed_and_retried_once() {
        let (harness, navigator, _) = Harness::recording(backend("fresh", 200), "/cars");
        seed(&harness, "stale", "r1").await;
        let mut events = harness.events.subscribe();

        let user: Profile = harness
            .api
            .get_json(PROFILE_PATH, AuthPolicy::Refreshing)
            .await
            .unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(harness.http.calls_to(REFRESH_PATH), 1);
        assert_eq!(
            harness.http.bearers_for(PROFILE_PATH),
            vec![Some("stale".to_string()), Some("fresh".to_string())]
        );
        for backend in [&harness.cookie, &harness.persistent] {
            assert_eq!(backend.value(keys::ACCESS_TOKEN).await.as_deref(), Some("fresh"));
            assert_eq!(backend.value(keys::REFRESH_TOKEN).await.as_deref(), Some("r1"));
        }
        assert!(navigator.calls().is_empty());

        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::TokenRefreshing)
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::TokenRefreshed { .. })
        ));
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_is_stored() {
        let http = MockHttp::new(|request| {
            if request.url.ends_with(REFRESH_PATH) {
                return Ok(json_response(200, json!({ "access": "fresh", "refresh": "r2" })));
            }
            Ok(match request.bearer() {
                Some("fresh") => json_response(200, json!({ "ok": true })),
                _ => json_response(401, json!({})),
            })
        });
        let (harness, _, _) = Harness::recording(http, "/");
        seed(&harness, "stale", "r1").await;

        harness
            .api
            .get_json::<serde_json::Value>("/admin/stats/", AuthPolicy::Refreshing)
            .await
            .unwrap();

        assert_eq!(harness.tokens.get_refresh_token().await.as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_session_and_redirects() {
        let (harness, navigator, _) = Harness::recording(backend("never", 401), "/admin");
        seed(&harness, "stale", "r1").await;
        harness.session.insert(keys::USER, "{}").await;
        let mut events = harness.events.subscribe();

        let err = harness
            .api
            .get_json::<Profile>(PROFILE_PATH, AuthPolicy::Refreshing)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AuthError::TokenRefreshFailed(RefreshFailure::Rejected { status: 401 })
        ));
        assert_eq!(err.category(), ErrorCategory::Authentication);
        // Original request is not retried after a failed refresh
        assert_eq!(harness.http.calls_to(PROFILE_PATH), 1);
        assert_eq!(harness.http.calls_to(REFRESH_PATH), 1);
        for backend in [&harness.cookie, &harness.persistent, &harness.session] {
            assert!(backend.is_empty().await);
        }
        assert_eq!(navigator.calls(), vec![NavCall::Navigate("/auth/login".into())]);

        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::TokenRefreshing)
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::SessionExpired { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_refresh_on_login_page_does_not_navigate() {
        let (harness, navigator, _) = Harness::recording(backend("never", 500), "/auth/login");
        seed(&harness, "stale", "r1").await;

        let err = harness
            .api
            .get_json::<Profile>(PROFILE_PATH, AuthPolicy::Refreshing)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::TokenRefreshFailed(_)));
        assert!(navigator.calls().is_empty());
        assert!(!harness.tokens.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_unauthorized_without_refresh_token() {
        let (harness, navigator, _) = Harness::recording(backend("never", 200), "/");
        harness.cookie.insert(keys::ACCESS_TOKEN, "stale").await;

        let err = harness
            .api
            .get_json::<Profile>(PROFILE_PATH, AuthPolicy::Refreshing)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Unauthorized));
        assert_eq!(harness.http.calls_to(REFRESH_PATH), 0);
        assert!(navigator.calls().is_empty());
        // Nothing is cleared on this path
        assert_eq!(harness.cookie.value(keys::ACCESS_TOKEN).await.as_deref(), Some("stale"));
    }

    #[tokio::test]
    async fn test_bearer_policy_does_not_refresh() {
        let (harness, _, _) = Harness::recording(backend("fresh", 200), "/");
        seed(&harness, "stale", "r1").await;

        let err = harness
            .api
            .post("/auth/logout/", &json!({ "refresh": "r1" }), AuthPolicy::Bearer)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Unauthorized));
        assert_eq!(harness.http.calls_to(REFRESH_PATH), 0);
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        let http = backend("fresh", 200).with_delay(Duration::from_millis(10));
        let (harness, _, _) = Harness::recording(http, "/");
        seed(&harness, "stale", "r1").await;

        let (a, b) = tokio::join!(
            harness.api.get_json::<Profile>(PROFILE_PATH, AuthPolicy::Refreshing),
            harness.api.get_json::<Profile>(PROFILE_PATH, AuthPolicy::Refreshing),
        );

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(harness.http.calls_to(REFRESH_PATH), 1);
        let retried: Vec<_> = harness
            .http
            .bearers_for(PROFILE_PATH)
            .into_iter()
            .filter(|bearer| bearer.as_deref() == Some("fresh"))
            .collect();
        assert_eq!(retried.len(), 2);
    }

    #[tokio::test]
    async fn test_token_changed_by_other_request_skips_refresh() {
        let cookie = MockStore::new();
        let jar = cookie.clone();
        // Another tab stores a new token while this request is in flight
        let http = MockHttp::new(move |request| {
            if request.url.ends_with(REFRESH_PATH) {
                return Ok(json_response(500, json!({})));
            }
            Ok(match request.bearer() {
                Some("fresh") => json_response(200, json!({ "id": 1, "username": "ada" })),
                _ => {
                    jar.insert_now(keys::ACCESS_TOKEN, "fresh");
                    json_response(401, json!({}))
                }
            })
        });
        let (harness, navigator, _) = Harness::recording_with_cookie(http, "/", cookie);
        seed(&harness, "stale", "r1").await;

        let user: Profile = harness
            .api
            .get_json(PROFILE_PATH, AuthPolicy::Refreshing)
            .await
            .unwrap();

        assert_eq!(user.username, "ada");
        assert_eq!(harness.http.calls_to(REFRESH_PATH), 0);
        assert_eq!(
            harness.http.bearers_for(PROFILE_PATH),
            vec![Some("stale".to_string()), Some("fresh".to_string())]
        );
        assert!(navigator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transport_and_status_errors_are_classified() {
        let http = MockHttp::new(|request| {
            if request.url.ends_with("/down/") {
                Err(BridgeError::Network("connection refused".into()))
            } else if request.url.ends_with("/forbidden/") {
                Ok(json_response(403, json!({ "detail": "Not staff" })))
            } else {
                Ok(json_response(500, json!({ "detail": "boom" })))
            }
        });
        let (harness, _, _) = Harness::recording(http, "/");

        let err = harness
            .api
            .get_json::<Profile>("/down/", AuthPolicy::Refreshing)
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Network);

        let err = harness
            .api
            .get_json::<Profile>("/forbidden/", AuthPolicy::Refreshing)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden));

        let err = harness
            .api
            .get_json::<Profile>("/broken/", AuthPolicy::Refreshing)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.category(), ErrorCategory::Server);
    }
}
