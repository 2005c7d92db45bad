//! Host Navigation and Notification
//!
//! The core never renders. It asks the host to move between routes and to
//! show transient notices (toasts).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Route navigation provided by the host shell.
///
/// - Web: `window.location` / router
/// - Desktop: in-process history stack
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Path of the route currently displayed (e.g. `/auth/login`).
    fn current_path(&self) -> String;

    /// Full navigation, adding a history entry and reloading state.
    async fn navigate(&self, path: &str);

    /// Replace the current history entry without adding a new one.
    async fn replace(&self, path: &str);
}

/// Visual weight of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeVariant {
    Default,
    Destructive,
}

/// Transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub description: Option<String>,
    pub variant: NoticeVariant,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: Some(description.into()),
            variant: NoticeVariant::Default,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: Some(description.into()),
            variant: NoticeVariant::Destructive,
        }
    }
}

/// Host toast presenter.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_constructors() {
        let notice = Notice::destructive("Access Denied", "No admin privileges.");
        assert_eq!(notice.variant, NoticeVariant::Destructive);
        assert_eq!(notice.description.as_deref(), Some("No admin privileges."));

        let info = Notice::info("Success", "Car added successfully!");
        assert_eq!(info.variant, NoticeVariant::Default);
    }
}
