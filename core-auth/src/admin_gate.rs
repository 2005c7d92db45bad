//! Admin route gate.
//!
//! Every check asks the backend for a live profile; cached role flags are
//! never trusted. A denied check sends the host home (replacing the history
//! entry) and shows one of three notices depending on why access failed.

use crate::client::{ApiClient, AuthPolicy};
use crate::error::{AuthError, ErrorCategory};
use crate::token_store::TokenStore;
use crate::types::Profile;
use bridge_traits::navigation::{Navigator, Notice, Notifier};
use core_runtime::config::ClientConfig;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use core_runtime::scope::ScopeGuard;
use std::sync::Arc;
use tracing::{debug, info, warn};

const PROFILE_PATH: &str = "/auth/profile/";

/// Why the gate refused entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenial {
    /// No session, or the backend rejected its credentials.
    Unauthenticated,
    /// Signed in without a staff or superuser flag.
    Forbidden,
    /// The profile could not be loaded for another reason.
    Unavailable,
}

impl AccessDenial {
    pub fn notice(&self) -> Notice {
        match self {
            AccessDenial::Unauthenticated => Notice::destructive(
                "Authentication Required",
                "Please log in to access the admin dashboard.",
            ),
            AccessDenial::Forbidden => Notice::destructive(
                "Access Denied",
                "You don't have admin privileges to access this page.",
            ),
            AccessDenial::Unavailable => {
                Notice::destructive("Error", "Failed to load admin data.")
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessDenial::Unauthenticated => "unauthenticated",
            AccessDenial::Forbidden => "forbidden",
            AccessDenial::Unavailable => "unavailable",
        }
    }

    fn from_error(err: &AuthError) -> Self {
        match err.category() {
            ErrorCategory::Authentication => AccessDenial::Unauthenticated,
            ErrorCategory::Authorization => AccessDenial::Forbidden,
            _ => AccessDenial::Unavailable,
        }
    }
}

/// Outcome of [`AdminGate::check`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdminAccess {
    Granted(Profile),
    Denied(AccessDenial),
    /// The view went away before the answer arrived; nothing was done.
    Abandoned,
}

impl AdminAccess {
    pub fn is_granted(&self) -> bool {
        matches!(self, AdminAccess::Granted(_))
    }
}

#[derive(Clone)]
pub struct AdminGate {
    api: ApiClient,
    tokens: TokenStore,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    event_bus: EventBus,
    home_route: String,
}

impl AdminGate {
    pub fn new(config: &ClientConfig, api: ApiClient) -> Self {
        Self {
            tokens: api.tokens().clone(),
            event_bus: api.event_bus().clone(),
            navigator: Arc::clone(&config.navigator),
            notifier: Arc::clone(&config.notifier),
            home_route: config.routes.home.clone(),
            api,
        }
    }

    /// Decide whether the current user may see the admin screen.
    ///
    /// `guard` belongs to the view that asked. If it closes while the profile
    /// is loading, the result is [`AdminAccess::Abandoned`] and the host is
    /// left alone.
    pub async fn check(&self, guard: &ScopeGuard) -> AdminAccess {
        if !self.tokens.is_authenticated().await {
            return self.deny(guard, AccessDenial::Unauthenticated).await;
        }

        let fetched = self
            .api
            .get_json::<Profile>(PROFILE_PATH, AuthPolicy::Refreshing)
            .await;

        if !guard.is_active() {
            debug!("Admin check finished after its view closed");
            return AdminAccess::Abandoned;
        }

        match fetched {
            Ok(profile) => {
                if let Err(e) = self.tokens.set_user(&profile).await {
                    warn!(error = %e, "Profile could not be cached");
                }
                if profile.is_admin() {
                    info!(user_id = profile.id, "Admin access granted");
                    AdminAccess::Granted(profile)
                } else {
                    self.deny(guard, AccessDenial::Forbidden).await
                }
            }
            Err(e) => {
                warn!(error = %e, "Admin profile check failed");
                self.deny(guard, AccessDenial::from_error(&e)).await
            }
        }
    }

    async fn deny(&self, guard: &ScopeGuard, denial: AccessDenial) -> AdminAccess {
        if !guard.is_active() {
            return AdminAccess::Abandoned;
        }

        info!(reason = denial.as_str(), "Admin access denied");
        self.notifier.notify(denial.notice());
        self.navigator.replace(&self.home_route).await;
        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::AdminAccessDenied {
                reason: denial.as_str().to_string(),
            }));

        AdminAccess::Denied(denial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        json_response, profile, Harness, MockHttp, MockNavigator, MockNotifier, NavCall,
    };
    use crate::types::TokenPair;
    use bridge_traits::navigation::NoticeVariant;
    use core_runtime::scope::ViewScope;
    use mockall::predicate;
    use serde_json::json;
    use std::time::Duration;

    fn profile_backend(is_staff: bool, is_superuser: bool) -> MockHttp {
        MockHttp::new(move |_| {
            Ok(json_response(
                200,
                json!({
                    "id": 5,
                    "username": "grace",
                    "is_staff": is_staff,
                    "is_superuser": is_superuser
                }),
            ))
        })
    }

    async fn sign_in(harness: &Harness) {
        harness
            .tokens
            .set_tokens(&TokenPair::new("a1", "r1"))
            .await
            .unwrap();
        // The cached flags claim admin; the gate must not believe them
        harness.tokens.set_user(&profile(5, "grace", true, true)).await.unwrap();
    }

    #[tokio::test]
    async fn test_granted_for_either_role_flag() {
        for (is_staff, is_superuser) in [(true, false), (false, true), (true, true)] {
            let (harness, navigator, notifier) =
                Harness::recording(profile_backend(is_staff, is_superuser), "/admin");
            sign_in(&harness).await;
            let gate = AdminGate::new(&harness.config, harness.api.clone());

            let access = gate.check(&ScopeGuard::detached()).await;

            assert!(access.is_granted());
            assert!(navigator.calls().is_empty());
            assert!(notifier.notices().is_empty());
        }
    }

    #[tokio::test]
    async fn test_non_admin_redirected_home() {
        let mut navigator = MockNavigator::new();
        navigator
            .expect_replace()
            .with(predicate::function(|path: &str| path == "/"))
            .times(1)
            .return_const(());
        navigator.expect_navigate().never();

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|notice| {
                notice.title == "Access Denied" && notice.variant == NoticeVariant::Destructive
            })
            .times(1)
            .return_const(());

        let harness = Harness::new(
            profile_backend(false, false),
            Arc::new(navigator),
            Arc::new(notifier),
        );
        sign_in(&harness).await;
        let mut events = harness.events.subscribe();
        let gate = AdminGate::new(&harness.config, harness.api.clone());

        let access = gate.check(&ScopeGuard::detached()).await;

        assert_eq!(access, AdminAccess::Denied(AccessDenial::Forbidden));
        // The live profile replaced the stale cached flags
        assert!(!harness.tokens.is_admin().await);
        match events.recv().await.unwrap() {
            CoreEvent::Auth(AuthEvent::AdminAccessDenied { reason }) => {
                assert_eq!(reason, "forbidden");
            }
            other => panic!("Expected AdminAccessDenied event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unauthenticated_denied_without_request() {
        let (harness, navigator, notifier) =
            Harness::recording(profile_backend(true, true), "/admin");
        let gate = AdminGate::new(&harness.config, harness.api.clone());

        let access = gate.check(&ScopeGuard::detached()).await;

        assert_eq!(access, AdminAccess::Denied(AccessDenial::Unauthenticated));
        assert!(harness.http.requests().is_empty());
        assert_eq!(navigator.calls(), vec![NavCall::Replace("/".into())]);
        assert_eq!(notifier.notices()[0].title, "Authentication Required");
    }

    #[tokio::test]
    async fn test_three_distinct_notices() {
        let cases = [
            (403, AccessDenial::Forbidden, "Access Denied"),
            (500, AccessDenial::Unavailable, "Error"),
        ];
        for (status, denial, title) in cases {
            let http = MockHttp::new(move |_| Ok(json_response(status, json!({}))));
            let (harness, _, notifier) = Harness::recording(http, "/admin");
            sign_in(&harness).await;
            let gate = AdminGate::new(&harness.config, harness.api.clone());

            assert_eq!(
                gate.check(&ScopeGuard::detached()).await,
                AdminAccess::Denied(denial)
            );
            assert_eq!(notifier.notices()[0].title, title);
        }

        let descriptions: Vec<_> = [
            AccessDenial::Unauthenticated,
            AccessDenial::Forbidden,
            AccessDenial::Unavailable,
        ]
        .iter()
        .map(|denial| denial.notice().description)
        .collect();
        assert_ne!(descriptions[0], descriptions[1]);
        assert_ne!(descriptions[1], descriptions[2]);
        assert_ne!(descriptions[0], descriptions[2]);
    }

    #[tokio::test]
    async fn test_rejected_session_is_unauthenticated() {
        // 401 on the profile and on the refresh endpoint
        let http = MockHttp::new(|_| Ok(json_response(401, json!({}))));
        let (harness, _, notifier) = Harness::recording(http, "/admin");
        sign_in(&harness).await;
        let gate = AdminGate::new(&harness.config, harness.api.clone());

        let access = gate.check(&ScopeGuard::detached()).await;

        assert_eq!(access, AdminAccess::Denied(AccessDenial::Unauthenticated));
        assert_eq!(notifier.notices()[0].title, "Authentication Required");
        assert!(!harness.tokens.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_closed_view_abandons_result() {
        let http = profile_backend(false, false).with_delay(Duration::from_millis(20));
        let (harness, navigator, notifier) = Harness::recording(http, "/admin");
        sign_in(&harness).await;
        let gate = AdminGate::new(&harness.config, harness.api.clone());

        let scope = ViewScope::new();
        let guard = scope.guard();
        let (access, _) = tokio::join!(gate.check(&guard), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            scope.close();
        });

        assert_eq!(access, AdminAccess::Abandoned);
        assert!(navigator.calls().is_empty());
        assert!(notifier.notices().is_empty());
    }
}
