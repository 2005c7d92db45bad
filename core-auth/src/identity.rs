//! # Identity-Provider Session
//!
//! Storefront sign-in through a hosted identity provider (email/password or
//! Google OAuth), independent of the backend token session.
//!
//! The provider itself is a host bridge ([`IdentityProvider`]). This module
//! follows its auth-state stream, keeps an observable [`IdentityState`], and
//! enforces the storefront rule that email/password accounts must verify
//! their address before they stay signed in.

use crate::client::{ApiClient, AuthPolicy};
use crate::error::AuthError;
use async_trait::async_trait;
use bridge_traits::navigation::{Notice, NoticeVariant, Notifier};
use core_runtime::config::ClientConfig;
use core_runtime::events::{CoreEvent, EventBus, IdentityEvent};
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Provider id of Google accounts; exempt from email verification.
pub const GOOGLE_PROVIDER_ID: &str = "google.com";

const SEND_VERIFICATION_PATH: &str = "/send-verification/";
const MOBILE_MARKERS: &[&str] = &["iphone", "ipad", "ipod", "android"];

/// A user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub email_verified: bool,
    /// Sign-in method of the first linked credential, e.g. `password` or
    /// `google.com`.
    pub provider_id: String,
}

impl IdentityUser {
    /// Display name, else the local part of the email.
    pub fn greeting_name(&self) -> String {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .unwrap_or_default()
            .to_string()
    }

    /// Email/password accounts that have not confirmed their address.
    pub fn requires_verification(&self) -> bool {
        !self.email_verified && self.provider_id != GOOGLE_PROVIDER_ID
    }
}

/// How an OAuth sign-in is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInMode {
    Popup,
    /// Full-page redirect; the result arrives on the next start.
    Redirect,
}

impl SignInMode {
    /// Redirect on phones and tablets, popup elsewhere.
    pub fn for_user_agent(user_agent: &str) -> Self {
        let user_agent = user_agent.to_ascii_lowercase();
        if MOBILE_MARKERS.iter().any(|marker| user_agent.contains(marker)) {
            SignInMode::Redirect
        } else {
            SignInMode::Popup
        }
    }
}

/// Raw error reported by the provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ProviderError {
    /// Provider error code, e.g. `auth/wrong-password`.
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Message suitable for a sign-in form.
    pub fn friendly_message(&self) -> &'static str {
        match self.code.as_str() {
            "auth/user-not-found" => "User not found. Please check your email.",
            "auth/wrong-password" => "Incorrect password. Try again.",
            "auth/invalid-email" => "Invalid email address.",
            "auth/invalid-credential" => {
                "Invalid credentials. Please check your email and password."
            }
            "auth/too-many-requests" => "Too many attempts. Please try again later.",
            _ => "Something went wrong",
        }
    }
}

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("{}", .0.friendly_message())]
    Provider(ProviderError),

    /// The backend did not send the verification email.
    #[error("{0}")]
    Verification(String),

    #[error(transparent)]
    Api(#[from] AuthError),
}

impl From<ProviderError> for IdentityError {
    fn from(err: ProviderError) -> Self {
        IdentityError::Provider(err)
    }
}

pub type Result<T> = std::result::Result<T, IdentityError>;

/// Hosted identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_email(
        &self,
        email: &str,
        password: &str,
    ) -> std::result::Result<IdentityUser, ProviderError>;

    async fn create_user(
        &self,
        email: &str,
        password: &str,
    ) -> std::result::Result<IdentityUser, ProviderError>;

    /// Set the display name of the signed-in user.
    async fn update_display_name(&self, name: &str) -> std::result::Result<(), ProviderError>;

    /// Start an OAuth sign-in. Redirect mode leaves the page and yields `None`.
    async fn sign_in_with_oauth(
        &self,
        mode: SignInMode,
    ) -> std::result::Result<Option<IdentityUser>, ProviderError>;

    /// Result of a redirect sign-in that completed before this start.
    async fn take_redirect_result(&self) -> std::result::Result<Option<IdentityUser>, ProviderError>;

    async fn sign_out(&self) -> std::result::Result<(), ProviderError>;

    /// Current user first, then every change.
    fn auth_state_changes(&self) -> BoxStream<'static, Option<IdentityUser>>;
}

/// What identity subscribers observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityState {
    pub user: Option<IdentityUser>,
    /// True until the provider reported its first state.
    pub loading: bool,
}

impl Default for IdentityState {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

#[derive(Serialize)]
struct VerificationRequest<'a> {
    email: &'a str,
}

#[derive(Deserialize)]
struct VerificationResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

struct Observer {
    provider: Arc<dyn IdentityProvider>,
    state: watch::Sender<IdentityState>,
    event_bus: EventBus,
}

impl Observer {
    async fn observe(&self, user: Option<IdentityUser>) {
        match user {
            Some(user) if user.requires_verification() => {
                info!(uid = %user.uid, "Signing out unverified user");
                let _ = self
                    .event_bus
                    .emit(CoreEvent::Identity(IdentityEvent::VerificationRequired {
                        email: user.email.clone(),
                    }));
                if let Err(e) = self.provider.sign_out().await {
                    warn!(error = %e, "Sign-out of unverified user failed");
                }
                self.publish(None);
            }
            Some(user) => {
                let changed = self.state.borrow().user.as_ref().map(|u| &u.uid) != Some(&user.uid);
                if changed {
                    info!(uid = %user.uid, provider = %user.provider_id, "Identity signed in");
                    let _ = self
                        .event_bus
                        .emit(CoreEvent::Identity(IdentityEvent::SignedIn {
                            uid: user.uid.clone(),
                            provider: user.provider_id.clone(),
                        }));
                }
                self.publish(Some(user));
            }
            None => {
                if self.state.borrow().user.is_some() {
                    info!("Identity signed out");
                    let _ = self
                        .event_bus
                        .emit(CoreEvent::Identity(IdentityEvent::SignedOut));
                }
                self.publish(None);
            }
        }
    }

    fn publish(&self, user: Option<IdentityUser>) {
        self.state.send_if_modified(|state| {
            let next = IdentityState {
                user,
                loading: false,
            };
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
    }
}

/// Identity-provider session of the storefront.
pub struct IdentitySession {
    observer: Arc<Observer>,
    api: ApiClient,
    notifier: Arc<dyn Notifier>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IdentitySession {
    pub fn new(config: &ClientConfig, api: ApiClient, provider: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(IdentityState::default());
        Self {
            observer: Arc::new(Observer {
                provider,
                state,
                event_bus: api.event_bus().clone(),
            }),
            notifier: Arc::clone(&config.notifier),
            api,
            task: Mutex::new(None),
        }
    }

    /// Pick up a pending redirect result, then follow the provider.
    ///
    /// Must run inside a tokio runtime. Calling it again restarts the
    /// subscription.
    pub async fn start(&self) {
        match self.observer.provider.take_redirect_result().await {
            Ok(Some(user)) => {
                debug!(uid = %user.uid, "Redirect sign-in completed");
                self.observer.observe(Some(user)).await;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Redirect sign-in failed"),
        }

        let mut changes = self.observer.provider.auth_state_changes();
        let observer = Arc::clone(&self.observer);
        let handle = tokio::spawn(async move {
            while let Some(user) = changes.next().await {
                observer.observe(user).await;
            }
            debug!("Identity state stream ended");
        });

        if let Ok(mut task) = self.task.lock() {
            if let Some(previous) = task.replace(handle) {
                previous.abort();
            }
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<IdentityState> {
        self.observer.state.subscribe()
    }

    pub fn state(&self) -> IdentityState {
        self.observer.state.borrow().clone()
    }

    /// OAuth sign-in with the presentation chosen from the user agent.
    ///
    /// Returns `None` when the page is being redirected.
    #[instrument(skip(self, user_agent))]
    pub async fn login_with_oauth(&self, user_agent: &str) -> Result<Option<IdentityUser>> {
        let mode = SignInMode::for_user_agent(user_agent);
        debug!(?mode, "Starting OAuth sign-in");

        match self.observer.provider.sign_in_with_oauth(mode).await {
            Ok(Some(user)) => {
                self.notifier.notify(Notice::info(
                    "Welcome",
                    format!("Hello, {}!", user.greeting_name()),
                ));
                Ok(Some(user))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(error = %e, "OAuth sign-in failed");
                self.notifier
                    .notify(Notice::destructive("Google login failed", e.message.clone()));
                Err(e.into())
            }
        }
    }

    /// Email/password sign-in. Returns the name to greet the user with.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_email(&self, email: &str, password: &str) -> Result<String> {
        match self.observer.provider.sign_in_with_email(email, password).await {
            Ok(user) => {
                let name = user.greeting_name();
                self.notifier
                    .notify(Notice::info("Welcome back", format!("Hello, {}!", name)));
                Ok(name)
            }
            Err(e) => {
                warn!(code = %e.code, "Email sign-in failed");
                self.notifier.notify(Notice {
                    title: e.friendly_message().to_string(),
                    description: None,
                    variant: NoticeVariant::Destructive,
                });
                Err(e.into())
            }
        }
    }

    /// Create an email/password account and ask the backend to send the
    /// verification email.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> Result<()> {
        let provider = &self.observer.provider;
        provider.create_user(email, password).await?;
        provider
            .update_display_name(&format!("{} {}", first_name, last_name))
            .await?;

        let response: VerificationResponse = self
            .api
            .post_json(
                SEND_VERIFICATION_PATH,
                &VerificationRequest { email },
                AuthPolicy::Anonymous,
            )
            .await?;
        if !response.success {
            let message = response
                .error
                .unwrap_or_else(|| "Failed to send verification email.".to_string());
            warn!(%message, "Verification email not sent");
            return Err(IdentityError::Verification(message));
        }

        info!("Account created; verification email sent");
        self.notifier.notify(Notice::info(
            "Account created!",
            format!(
                "A verification link was sent to {}. Please verify before logging in.",
                email
            ),
        ));
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        self.observer.provider.sign_out().await?;
        Ok(())
    }
}

impl Drop for IdentitySession {
    fn drop(&mut self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}
