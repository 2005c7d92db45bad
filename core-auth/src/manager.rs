//! # Authentication Manager
//!
//! Session lifecycle against the dealership backend.
//!
//! ## Overview
//!
//! `AuthManager` signs users in and out. Login and registration both end in
//! [`AuthManager::complete_auth`], which is the one place a session comes into
//! existence:
//!
//! 1. store the token pair in every backend
//! 2. fetch the canonical profile (`GET /auth/profile/`)
//! 3. cache the profile
//! 4. emit [`AuthEvent::SignedIn`]
//!
//! A profile fetch that fails at step 2 leaves no half-built session behind.
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::{ApiClient, AuthManager, TokenStore};
//! use core_runtime::config::ClientConfig;
//! use core_runtime::events::EventBus;
//!
//! # async fn example(config: ClientConfig) -> core_auth::Result<()> {
//! let tokens = TokenStore::from_config(&config);
//! let events = EventBus::new(config.event_buffer_size);
//! let api = ApiClient::new(&config, tokens, events);
//! let manager = AuthManager::new(&config, api);
//!
//! let session = manager.login("ada", "correct horse").await?;
//! println!("Welcome, {}", session.user.display_name());
//!
//! manager.logout().await;
//! # Ok(())
//! # }
//! ```

use crate::client::{ApiClient, AuthPolicy};
use crate::error::{AuthError, Result};
use crate::token_store::TokenStore;
use crate::types::{
    AuthSession, LoginRequest, Profile, RefreshRequest, RegisterRequest, SessionSnapshot,
    TokenPair,
};
use bridge_traits::navigation::Navigator;
use core_runtime::config::ClientConfig;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

const LOGIN_PATH: &str = "/auth/login/";
const REGISTER_PATH: &str = "/auth/register/";
const LOGOUT_PATH: &str = "/auth/logout/";
const PROFILE_PATH: &str = "/auth/profile/";

/// Signs users in and out and keeps the cached profile current.
#[derive(Clone)]
pub struct AuthManager {
    api: ApiClient,
    tokens: TokenStore,
    navigator: Arc<dyn Navigator>,
    event_bus: EventBus,
    home_route: String,
}

impl AuthManager {
    pub fn new(config: &ClientConfig, api: ApiClient) -> Self {
        Self {
            tokens: api.tokens().clone(),
            event_bus: api.event_bus().clone(),
            navigator: Arc::clone(&config.navigator),
            home_route: config.routes.home.clone(),
            api,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Exchange credentials for a session.
    ///
    /// # Errors
    ///
    /// Any non-2xx answer from the login endpoint is reported as
    /// [`AuthError::LoginFailed`] carrying the status; wrong credentials and
    /// server failures are not told apart.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthSession> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let tokens: TokenPair = self
            .api
            .post_json(LOGIN_PATH, &request, AuthPolicy::Anonymous)
            .await
            .map_err(|e| match e.status() {
                Some(status) => AuthError::LoginFailed { status },
                None => e,
            })
            .inspect_err(|e| warn!(error = %e, "Login rejected"))?;

        self.complete_auth(tokens).await
    }

    /// Create an account and sign it in.
    ///
    /// A `user` object echoed by the backend is ignored; the profile always
    /// comes from the profile endpoint.
    ///
    /// # Errors
    ///
    /// 400/422 answers become [`AuthError::Validation`] with per-field
    /// messages.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthSession> {
        let tokens: TokenPair = self
            .api
            .post_json(REGISTER_PATH, request, AuthPolicy::Anonymous)
            .await
            .inspect_err(|e| warn!(error = %e, "Registration rejected"))?;

        self.complete_auth(tokens).await
    }

    /// Turn a freshly issued token pair into a session.
    #[instrument(skip_all)]
    pub async fn complete_auth(&self, tokens: TokenPair) -> Result<AuthSession> {
        self.tokens.set_tokens(&tokens).await?;

        let user = match self.fetch_profile().await {
            Ok(user) => user,
            Err(e) => {
                error!(error = %e, "Profile fetch failed after sign-in; discarding tokens");
                self.tokens.clear_session().await;
                let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::AuthError {
                    message: e.to_string(),
                    recoverable: true,
                }));
                return Err(e);
            }
        };

        info!(user_id = user.id, "Signed in");
        let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::SignedIn {
            user_id: user.id.to_string(),
            username: user.username.clone(),
        }));

        Ok(AuthSession { tokens, user })
    }

    /// Fetch the profile from the backend and cache it.
    #[instrument(skip(self))]
    pub async fn fetch_profile(&self) -> Result<Profile> {
        let profile: Profile = self
            .api
            .get_json(PROFILE_PATH, AuthPolicy::Refreshing)
            .await?;

        if let Err(e) = self.tokens.set_user(&profile).await {
            warn!(error = %e, "Profile could not be cached");
        }
        debug!(user_id = profile.id, is_admin = profile.is_admin(), "Profile fetched");
        Ok(profile)
    }

    /// End the session.
    ///
    /// The server-side revocation is best effort: local state is cleared and
    /// the host is sent home whatever the backend answers.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let user_id = self
            .tokens
            .get_current_user()
            .await
            .map(|user| user.id.to_string());

        if let Some(refresh) = self.tokens.get_refresh_token().await {
            let body = RefreshRequest { refresh: &refresh };
            if let Err(e) = self.api.post(LOGOUT_PATH, &body, AuthPolicy::Bearer).await {
                warn!(error = %e, "Logout request failed; clearing local session anyway");
            }
        } else {
            debug!("No refresh token stored; skipping logout request");
        }

        self.tokens.clear_session().await;
        info!("Signed out");
        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::SignedOut { user_id }));

        self.navigator.navigate(&self.home_route).await;
    }

    pub async fn current_user(&self) -> Option<Profile> {
        self.tokens.get_current_user().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.tokens.is_authenticated().await
    }

    /// Watch the session snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tokens.subscribe()
    }
}
