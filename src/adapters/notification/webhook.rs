use crate::utils::error::{KrabotError, Result};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;

const USER_AGENT: &str = "Krabot Webhook";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
    username: &'a str,
    avatar_url: &'a str,
    tts: bool,
}

/// Discord webhook sender with rate-limit cooldown tracking.
///
/// After a response reporting zero remaining quota, every `send` fails fast
/// with `RateLimitedError` until the advertised reset time has passed.
pub struct WebhookClient {
    client: Client,
    webhook_url: String,
    username: String,
    avatar_url: String,
    cooldown: Mutex<Option<DateTime<Utc>>>,
}

impl WebhookClient {
    pub fn new(
        webhook_url: impl Into<String>,
        username: impl Into<String>,
        avatar_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
            username: username.into(),
            avatar_url: avatar_url.into(),
            cooldown: Mutex::new(None),
        })
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    pub fn cooldown_until(&self) -> Option<DateTime<Utc>> {
        *self.cooldown.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub async fn send(&self, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(KrabotError::ValidationError {
                message: "Webhook content cannot be blank".to_string(),
            });
        }

        self.check_cooldown()?;

        let payload = WebhookPayload {
            content,
            username: &self.username,
            avatar_url: &self.avatar_url,
            tts: false,
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        self.record_rate_limit(response.headers());

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::NO_CONTENT {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("⚠️ Webhook answered {}: {}", status, body);
        } else {
            tracing::debug!("Webhook delivered ({})", status);
        }

        Ok(())
    }

    fn check_cooldown(&self) -> Result<()> {
        let mut cooldown = self.cooldown.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(until) = *cooldown {
            if Utc::now() < until {
                tracing::debug!("Webhook cooldown active until {}", until);
                return Err(KrabotError::RateLimitedError { until });
            }
            *cooldown = None;
            tracing::info!("✅ Webhook cooldown expired");
        }
        Ok(())
    }

    fn record_rate_limit(&self, headers: &HeaderMap) {
        let Some(remaining) = header_number(headers, REMAINING_HEADER) else {
            return;
        };
        if remaining > 0.0 {
            return;
        }

        let Some(until) = header_number(headers, RESET_HEADER)
            .and_then(|epoch| DateTime::from_timestamp_millis((epoch * 1000.0) as i64))
        else {
            tracing::warn!("⚠️ Webhook quota exhausted but no usable reset header");
            return;
        };

        tracing::warn!("⏳ Webhook rate limit reached, cooling down until {}", until);
        *self.cooldown.lock().unwrap_or_else(|e| e.into_inner()) = Some(until);
    }
}

fn header_number(headers: &HeaderMap, name: &str) -> Option<f64> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
}
