//! View lifetime guard
//!
//! A [`ViewScope`] stands for a mounted screen. Async work started on behalf
//! of the screen holds a [`ScopeGuard`] and checks it before touching the host
//! (navigating, notifying). Once the scope is closed, late results are dropped.

use tokio_util::sync::CancellationToken;

/// Owner side of a view lifetime. Closes on [`close`](ViewScope::close) or drop.
#[derive(Debug)]
pub struct ViewScope {
    token: CancellationToken,
}

impl ViewScope {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Cheap handle for async work spawned by this view.
    pub fn guard(&self) -> ScopeGuard {
        ScopeGuard {
            token: self.token.child_token(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Mark the view as unmounted.
    pub fn close(&self) {
        self.token.cancel();
    }
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.close();
    }
}

/// Observer side of a [`ViewScope`].
#[derive(Debug, Clone)]
pub struct ScopeGuard {
    token: CancellationToken,
}

impl ScopeGuard {
    /// A guard whose view never unmounts.
    pub fn detached() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Resolves once the owning view is closed.
    pub async fn closed(&self) {
        self.token.cancelled().await
    }
}
