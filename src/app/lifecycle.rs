use crate::domain::ports::{Notifier, ReleaseFeed, StateRepository};
use crate::utils::error::KrabotError;
use std::sync::Arc;

/// Startup and shutdown announcements plus error reporting for the cycles.
#[derive(Clone)]
pub struct Lifecycle {
    feed: Arc<dyn ReleaseFeed>,
    notifier: Arc<dyn Notifier>,
    state: Arc<dyn StateRepository>,
}

impl Lifecycle {
    pub fn new(
        feed: Arc<dyn ReleaseFeed>,
        notifier: Arc<dyn Notifier>,
        state: Arc<dyn StateRepository>,
    ) -> Self {
        Self {
            feed,
            notifier,
            state,
        }
    }

    /// Records the published release without announcing it, then says hello.
    pub async fn initialize(&self) {
        match self.feed.latest_release().await {
            Ok(version) => {
                tracing::info!("📦 Latest published release: {}", version);
                self.state.update_latest_version(version);
            }
            Err(e) => {
                tracing::warn!(category = ?e.category(), "⚠️ Could not fetch latest release: {}", e);
            }
        }

        self.notifier.startup().await;
    }

    pub async fn shutdown(&self) {
        tracing::info!("👋 Sending shutdown notification");
        self.notifier.shutdown().await;
    }

    /// 週期失敗時記錄並通知，本身不會失敗
    pub async fn notify_error(&self, operation: &str, error: &KrabotError) {
        tracing::error!(category = ?error.category(), "❌ {} failed: {}", operation, error);
        self.notifier
            .error(&format!("{} a échoué : {}", operation, error))
            .await;
    }
}
