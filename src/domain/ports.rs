use crate::domain::model::{
    Account, Characteristic, Message, MessageId, NotificationState, ReleaseVersion,
    ScrapingResult, UserSummary,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;

/// 遊戲網站的抓取介面
#[async_trait]
pub trait SiteScraper: Send + Sync {
    async fn scrape(&self, account: &Account) -> Result<ScrapingResult>;
    async fn is_reminder_available(&self, account: &Account) -> Result<bool>;
}

#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    async fn latest_release(&self) -> Result<ReleaseVersion>;
}

/// Outbound notifications.
///
/// `message` and `general` return `RateLimitedError` while the webhook
/// cooldown is active so the caller can leave its state unmarked. Every
/// other failure is swallowed by the implementation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn startup(&self);
    async fn shutdown(&self);
    async fn message(&self, message: &Message) -> Result<()>;
    async fn general(&self) -> Result<()>;
    async fn release(&self, version: &ReleaseVersion);
    async fn error(&self, text: &str);
    async fn reminder(&self);
}

/// Process-lifetime notification state. Each operation is atomic on its own.
pub trait StateRepository: Send + Sync {
    fn snapshot(&self) -> NotificationState;
    fn update_message_count(&self, count: usize);
    fn update_notification_flag(&self, flag: bool);
    fn update_latest_version(&self, version: ReleaseVersion);
    fn latest_version(&self) -> ReleaseVersion;
    fn is_message_already_notified(&self, id: &MessageId) -> bool;
    fn mark_message_notified(&self, id: MessageId);
    fn cleanup_old_messages(&self, current_ids: &HashSet<MessageId>);
    fn reset_notified_messages(&self);
    fn reset_general_notification_flag(&self);
    fn mark_general_notification_sent(&self);
    fn is_general_notification_sent(&self) -> bool;
}

/// Characteristics shared between players, partitioned by API key.
pub trait CharacteristicsRepository: Send + Sync {
    /// Inserts or replaces the entry for `characteristic.player_id`.
    fn save(&self, namespace: &str, characteristic: Characteristic);
    fn find_by_player_id(&self, namespace: &str, player_id: &str) -> Option<Characteristic>;
    fn find_all_users(&self, namespace: &str) -> Vec<UserSummary>;
}
