pub mod webhook;

pub use webhook::WebhookClient;

use crate::config::toml_config::MessageTemplates;
use crate::domain::model::{Message, ReleaseVersion};
use crate::domain::ports::Notifier;
use crate::utils::error::Result;
use async_trait::async_trait;

/// 已解析預設值的訊息模板
#[derive(Debug, Clone)]
pub struct NotificationTemplates {
    pub message: String,
    pub general: String,
    pub startup: String,
    pub shutdown: String,
    pub release: String,
    pub error_prefix: String,
    pub reminder: String,
}

impl From<&MessageTemplates> for NotificationTemplates {
    fn from(templates: &MessageTemplates) -> Self {
        Self {
            message: templates.message().to_string(),
            general: templates.general_notification().to_string(),
            startup: templates.startup().to_string(),
            shutdown: templates.shutdown().to_string(),
            release: templates.release().to_string(),
            error_prefix: templates.error_prefix().to_string(),
            reminder: templates.reminder().to_string(),
        }
    }
}

impl Default for NotificationTemplates {
    fn default() -> Self {
        Self::from(&MessageTemplates::default())
    }
}

pub fn render_message(template: &str, message: &Message) -> String {
    template
        .replace("*title*", &message.title)
        .replace("*originator*", &message.sender)
        .replace("*recipient*", &message.recipient)
        .replace("*section*", &message.section)
}

/// Turns domain events into Discord texts.
pub struct DiscordNotifier {
    webhook: WebhookClient,
    templates: NotificationTemplates,
    release_page_url: String,
}

impl DiscordNotifier {
    pub fn new(
        webhook: WebhookClient,
        templates: NotificationTemplates,
        release_page_url: impl Into<String>,
    ) -> Self {
        Self {
            webhook,
            templates,
            release_page_url: release_page_url.into(),
        }
    }

    /// Returns only the cooldown error; other failures are logged.
    async fn deliver(&self, text: &str) -> Result<()> {
        match self.webhook.send(text).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_rate_limited() => {
                tracing::warn!("⏳ Notification postponed: {}", e);
                Err(e)
            }
            Err(e) => {
                tracing::warn!(category = ?e.category(), "⚠️ Notification dropped: {}", e);
                Ok(())
            }
        }
    }

    async fn deliver_safely(&self, text: &str) {
        if let Err(e) = self.webhook.send(text).await {
            tracing::warn!(category = ?e.category(), "⚠️ Notification dropped: {}", e);
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn startup(&self) {
        self.deliver_safely(&self.templates.startup).await;
    }

    async fn shutdown(&self) {
        self.deliver_safely(&self.templates.shutdown).await;
    }

    async fn message(&self, message: &Message) -> Result<()> {
        let text = render_message(&self.templates.message, message);
        self.deliver(&text).await
    }

    async fn general(&self) -> Result<()> {
        self.deliver(&self.templates.general).await
    }

    async fn release(&self, version: &ReleaseVersion) {
        tracing::info!("🆕 Announcing release {}", version);
        let text = format!("{}: {}", self.templates.release, self.release_page_url);
        self.deliver_safely(&text).await;
    }

    async fn error(&self, text: &str) {
        let text = format!("{} {}", self.templates.error_prefix, text);
        self.deliver_safely(&text).await;
    }

    async fn reminder(&self) {
        self.deliver_safely(&self.templates.reminder).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::MessageId;

    #[test]
    fn test_render_message_replaces_placeholders() {
        let message = Message {
            id: MessageId::new("42").unwrap(),
            title: "Rendez-vous".to_string(),
            sender: "Bob".to_string(),
            recipient: "Alice".to_string(),
            section: "plateau".to_string(),
        };

        let text = render_message("[*section*] *recipient* <- *originator*: *title*", &message);
        assert_eq!(text, "[plateau] Alice <- Bob: Rendez-vous");
    }

    #[test]
    fn test_default_templates() {
        let templates = NotificationTemplates::default();
        assert_eq!(templates.error_prefix, "Oh no !");
        assert_eq!(templates.general, "Hey, tu as une notification !!");
        assert!(templates.message.contains("*originator*"));
    }
}
