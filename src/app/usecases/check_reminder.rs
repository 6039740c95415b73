use crate::app::retry::{retry_on_failure, MAX_ATTEMPTS};
use crate::domain::model::Account;
use crate::domain::ports::{Notifier, SiteScraper};
use crate::utils::error::Result;
use std::sync::Arc;

/// 每日提醒：動作仍可執行時通知
pub struct CheckReminder {
    scraper: Arc<dyn SiteScraper>,
    notifier: Arc<dyn Notifier>,
    account: Account,
}

impl CheckReminder {
    pub fn new(scraper: Arc<dyn SiteScraper>, notifier: Arc<dyn Notifier>, account: Account) -> Self {
        Self {
            scraper,
            notifier,
            account,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        retry_on_failure("Reminder check", MAX_ATTEMPTS, || self.run_once()).await
    }

    async fn run_once(&self) -> Result<()> {
        if self.scraper.is_reminder_available(&self.account).await? {
            self.notifier.reminder().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{account, MockScraper, RecordingNotifier};
    use crate::utils::error::KrabotError;

    #[tokio::test]
    async fn test_available_reminder_is_notified() {
        let notifier = Arc::new(RecordingNotifier::new());
        let scraper = Arc::new(MockScraper::new().with_reminder(Ok(true)));
        let use_case = CheckReminder::new(scraper, notifier.clone(), account());

        use_case.execute().await.unwrap();

        assert_eq!(notifier.sent(), vec!["reminder"]);
    }

    #[tokio::test]
    async fn test_done_reminder_is_silent() {
        let notifier = Arc::new(RecordingNotifier::new());
        let scraper = Arc::new(MockScraper::new().with_reminder(Ok(false)));
        let use_case = CheckReminder::new(scraper, notifier.clone(), account());

        use_case.execute().await.unwrap();

        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failures_propagate_after_retries() {
        let notifier = Arc::new(RecordingNotifier::new());
        let scraper = Arc::new(
            MockScraper::new()
                .with_reminder(Err(KrabotError::scraping("a")))
                .with_reminder(Err(KrabotError::scraping("b")))
                .with_reminder(Err(KrabotError::scraping("c"))),
        );
        let use_case = CheckReminder::new(scraper.clone(), notifier.clone(), account());

        assert!(use_case.execute().await.is_err());
        assert_eq!(scraper.calls(), 3);
        assert!(notifier.sent().is_empty());
    }
}
