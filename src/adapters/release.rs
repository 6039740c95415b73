use crate::domain::model::ReleaseVersion;
use crate::domain::ports::ReleaseFeed;
use crate::utils::error::{KrabotError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = "Krabot-Release-Checker";
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
struct ReleasePayload {
    tag_name: Option<String>,
}

/// 從 GitHub releases API 取得最新版本
pub struct GithubReleaseFeed {
    client: Client,
    feed_url: String,
}

impl GithubReleaseFeed {
    pub fn new(feed_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            feed_url: feed_url.into(),
        })
    }
}

#[async_trait]
impl ReleaseFeed for GithubReleaseFeed {
    async fn latest_release(&self) -> Result<ReleaseVersion> {
        tracing::debug!("Fetching latest release from {}", self.feed_url);

        let response = self
            .client
            .get(&self.feed_url)
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let reset = response
                .headers()
                .get("x-ratelimit-reset")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("unknown")
                .to_string();
            return Err(KrabotError::ReleaseRateLimitError { reset });
        }

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(KrabotError::ReleaseFeedError {
                message: format!("status {}: {}", status.as_u16(), excerpt),
            });
        }

        let payload: ReleasePayload = response.json().await?;
        let tag = payload
            .tag_name
            .filter(|tag| !tag.trim().is_empty())
            .ok_or_else(|| KrabotError::ReleaseFeedError {
                message: "tag_name missing from release payload".to_string(),
            })?;

        tracing::debug!("Latest release tag: {}", tag);
        ReleaseVersion::new(tag)
    }
}
