use crate::app::retry::{retry_on_failure, MAX_ATTEMPTS};
use crate::domain::model::{Account, ScrapingResult};
use crate::domain::ports::{Notifier, SiteScraper, StateRepository};
use crate::domain::services::{
    extract_message_ids, find_new_messages, should_send_general_notification,
};
use crate::utils::error::Result;
use std::sync::Arc;

/// Scrape, notify what is new, then forget what disappeared.
pub struct CheckMessages {
    scraper: Arc<dyn SiteScraper>,
    notifier: Arc<dyn Notifier>,
    state: Arc<dyn StateRepository>,
    account: Account,
}

impl CheckMessages {
    pub fn new(
        scraper: Arc<dyn SiteScraper>,
        notifier: Arc<dyn Notifier>,
        state: Arc<dyn StateRepository>,
        account: Account,
    ) -> Self {
        Self {
            scraper,
            notifier,
            state,
            account,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        retry_on_failure("Kramail check", MAX_ATTEMPTS, || self.run_once()).await
    }

    async fn run_once(&self) -> Result<()> {
        let result = self.scraper.scrape(&self.account).await?;

        self.process_general_notification(&result).await;
        self.process_messages(&result).await;
        self.state.update_message_count(result.messages.len());

        Ok(())
    }

    async fn process_general_notification(&self, result: &ScrapingResult) {
        if !result.has_notification {
            self.state.reset_general_notification_flag();
            self.state.update_notification_flag(false);
            return;
        }

        let already_sent = self.state.is_general_notification_sent();
        if should_send_general_notification(result, already_sent) {
            match self.notifier.general().await {
                Ok(()) => {
                    self.state.mark_general_notification_sent();
                    tracing::info!("🔔 General notification sent");
                }
                // 未標記，下個週期再送
                Err(e) => tracing::debug!("General notification not sent: {}", e),
            }
        }
        self.state.update_notification_flag(true);
    }

    async fn process_messages(&self, result: &ScrapingResult) {
        let new_messages = find_new_messages(result, |id| {
            self.state.is_message_already_notified(id)
        });
        let total = new_messages.len();

        for (index, message) in new_messages.into_iter().enumerate() {
            match self.notifier.message(&message).await {
                Ok(()) => {
                    tracing::info!("📨 Notified kramail {} from {}", message.id, message.sender);
                    self.state.mark_message_notified(message.id);
                }
                Err(e) => {
                    tracing::warn!(
                        "⏳ {} kramail notification(s) postponed: {}",
                        total - index,
                        e
                    );
                    break;
                }
            }
        }

        self.state.cleanup_old_messages(&extract_message_ids(result));
    }
}
