use crate::app::retry::{retry_on_failure, MAX_ATTEMPTS};
use crate::domain::ports::{Notifier, ReleaseFeed, StateRepository};
use crate::utils::error::Result;
use std::sync::Arc;

pub struct CheckRelease {
    feed: Arc<dyn ReleaseFeed>,
    notifier: Arc<dyn Notifier>,
    state: Arc<dyn StateRepository>,
}

impl CheckRelease {
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

    pub async fn execute(&self) -> Result<()> {
        retry_on_failure("Release check", MAX_ATTEMPTS, || self.run_once()).await
    }

    async fn run_once(&self) -> Result<()> {
        let latest = self.feed.latest_release().await?;
        let known = self.state.latest_version();

        if latest.is_newer_than(&known) {
            tracing::info!("🆕 New release {} (was {})", latest, known);
            self.state.update_latest_version(latest.clone());
            self.notifier.release(&latest).await;
        } else {
            tracing::debug!("No new release, still {}", known);
        }

        Ok(())
    }
}
