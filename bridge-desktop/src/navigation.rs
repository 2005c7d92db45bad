//! Desktop navigation and notices
//!
//! There is no browser shell on desktop, so navigation is a history stack the
//! UI layer observes through a `watch` channel, and notices are written to the
//! log.

use async_trait::async_trait;
use bridge_traits::navigation::{Navigator, Notice, NoticeVariant, Notifier};
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::{info, warn};

/// In-process route history.
pub struct HistoryNavigator {
    history: Mutex<Vec<String>>,
    current: watch::Sender<String>,
}

impl HistoryNavigator {
    pub fn new(initial: impl Into<String>) -> Self {
        let initial = initial.into();
        let (current, _) = watch::channel(initial.clone());
        Self {
            history: Mutex::new(vec![initial]),
            current,
        }
    }

    /// Watch the current route.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.current.subscribe()
    }

    /// Every route visited, oldest first. Replaced entries are gone.
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }

    fn update(&self, path: &str, replace: bool) {
        if let Ok(mut history) = self.history.lock() {
            if replace {
                history.pop();
            }
            history.push(path.to_string());
        }
        self.current.send_replace(path.to_string());
    }
}

impl Default for HistoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

#[async_trait]
impl Navigator for HistoryNavigator {
    fn current_path(&self) -> String {
        self.current.borrow().clone()
    }

    async fn navigate(&self, path: &str) {
        info!(path, "Navigating");
        self.update(path, false);
    }

    async fn replace(&self, path: &str) {
        info!(path, "Replacing current route");
        self.update(path, true);
    }
}

/// Notifier that writes notices to the tracing log.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        let description = notice.description.as_deref().unwrap_or("");
        match notice.variant {
            NoticeVariant::Default => info!(title = %notice.title, description, "Notice"),
            NoticeVariant::Destructive => warn!(title = %notice.title, description, "Notice"),
        }
    }
}
