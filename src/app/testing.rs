//! In-memory port implementations shared by the use-case tests.

use crate::domain::model::{Account, Message, MessageId, ReleaseVersion, ScrapingResult};
use crate::domain::ports::{Notifier, ReleaseFeed, SiteScraper};
use crate::utils::error::{KrabotError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Mutex;

pub fn account() -> Account {
    Account::new("alice", "secret").unwrap()
}

pub fn message(id: &str) -> Message {
    Message {
        id: MessageId::new(id).unwrap(),
        title: format!("Sujet {}", id),
        sender: "Bob".to_string(),
        recipient: "Alice".to_string(),
        section: "membre".to_string(),
    }
}

/// Pops one queued answer per call; an empty queue answers an empty result.
pub struct MockScraper {
    scrapes: Mutex<VecDeque<Result<ScrapingResult>>>,
    reminders: Mutex<VecDeque<Result<bool>>>,
    calls: Mutex<u32>,
}

impl MockScraper {
    pub fn new() -> Self {
        Self {
            scrapes: Mutex::new(VecDeque::new()),
            reminders: Mutex::new(VecDeque::new()),
            calls: Mutex::new(0),
        }
    }

    pub fn with_scrape(self, result: Result<ScrapingResult>) -> Self {
        self.scrapes.lock().unwrap().push_back(result);
        self
    }

    pub fn with_reminder(self, result: Result<bool>) -> Self {
        self.reminders.lock().unwrap().push_back(result);
        self
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl SiteScraper for MockScraper {
    async fn scrape(&self, _account: &Account) -> Result<ScrapingResult> {
        *self.calls.lock().unwrap() += 1;
        self.scrapes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ScrapingResult::empty()))
    }

    async fn is_reminder_available(&self, _account: &Account) -> Result<bool> {
        *self.calls.lock().unwrap() += 1;
        self.reminders.lock().unwrap().pop_front().unwrap_or(Ok(false))
    }
}

pub struct MockReleaseFeed {
    answers: Mutex<VecDeque<Result<ReleaseVersion>>>,
}

impl MockReleaseFeed {
    pub fn new() -> Self {
        Self {
            answers: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_tag(self, tag: &str) -> Self {
        self.answers
            .lock()
            .unwrap()
            .push_back(Ok(ReleaseVersion::new(tag).unwrap()));
        self
    }

    pub fn with_error(self, error: KrabotError) -> Self {
        self.answers.lock().unwrap().push_back(Err(error));
        self
    }
}

#[async_trait]
impl ReleaseFeed for MockReleaseFeed {
    async fn latest_release(&self) -> Result<ReleaseVersion> {
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(KrabotError::ReleaseFeedError {
                    message: "no answer queued".to_string(),
                })
            })
    }
}

/// Records every notification; message and general sends can be switched to
/// the rate-limited answer.
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    rate_limited: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            rate_limited: Mutex::new(false),
        }
    }

    pub fn set_rate_limited(&self, value: bool) {
        *self.rate_limited.lock().unwrap() = value;
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.sent.lock().unwrap().push(entry);
    }

    fn check_rate_limit(&self) -> Result<()> {
        if *self.rate_limited.lock().unwrap() {
            return Err(KrabotError::RateLimitedError {
                until: Utc::now() + chrono::Duration::seconds(60),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn startup(&self) {
        self.record("startup".to_string());
    }

    async fn shutdown(&self) {
        self.record("shutdown".to_string());
    }

    async fn message(&self, message: &Message) -> Result<()> {
        self.check_rate_limit()?;
        self.record(format!("message:{}", message.id));
        Ok(())
    }

    async fn general(&self) -> Result<()> {
        self.check_rate_limit()?;
        self.record("general".to_string());
        Ok(())
    }

    async fn release(&self, version: &ReleaseVersion) {
        self.record(format!("release:{}", version));
    }

    async fn error(&self, text: &str) {
        self.record(format!("error:{}", text));
    }

    async fn reminder(&self) {
        self.record("reminder".to_string());
    }
}
