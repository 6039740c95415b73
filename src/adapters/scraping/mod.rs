pub mod parser;

use crate::adapters::http::session::{encode_form_latin1, SessionClient};
use crate::config::toml_config::SiteConfig;
use crate::domain::model::{Account, ScrapingResult};
use crate::domain::ports::SiteScraper;
use crate::utils::error::{KrabotError, Result};
use async_trait::async_trait;
use url::Url;

/// Scrapes the game site through one long-lived cookie session.
pub struct KralandScraper {
    session: SessionClient,
    base_url: Url,
    messages_url: String,
    login_url: String,
    reminder_url: String,
    reminder_action: String,
}

impl KralandScraper {
    pub fn new(site: &SiteConfig) -> Result<Self> {
        let base_url = Url::parse(site.base_url()).map_err(|e| KrabotError::InvalidConfigValueError {
            field: "site.base_url".to_string(),
            value: site.base_url().to_string(),
            reason: e.to_string(),
        })?;

        let messages_url = join_path(&base_url, site.messages_path())?;
        let login_url = join_path(&base_url, site.login_path())?;
        let reminder_url = join_path(&base_url, site.reminder_path())?;

        Ok(Self {
            session: SessionClient::new(site.base_url(), site.timeout())?,
            base_url,
            messages_url,
            login_url,
            reminder_url,
            reminder_action: site.reminder_action().to_string(),
        })
    }

    async fn ensure_authenticated(&self, account: &Account) -> Result<()> {
        let probe = self.session.get(&self.messages_url).await?;
        if !parser::requires_authentication(&probe.body) {
            tracing::debug!("Session still valid, skipping login");
            return Ok(());
        }

        tracing::info!("🔐 Logging in as {}", account.username());
        let form = encode_form_latin1(&[
            ("a", "100"),
            ("c[1]", account.username()),
            ("c[2]", account.password()),
            ("f[1]", "1"),
        ]);

        let response = self.session.post_form(&self.login_url, form).await?;
        if response.is_error() {
            return Err(KrabotError::AuthenticationError {
                status: response.status.as_u16(),
            });
        }

        tracing::debug!("Login answered with status {}", response.status);
        Ok(())
    }

    async fn fetch_index(&self) -> Result<String> {
        let page = self.session.get(&self.messages_url).await?;
        if page.is_error() {
            return Err(KrabotError::scraping(format!(
                "Messages index returned status {}",
                page.status
            )));
        }
        if parser::requires_authentication(&page.body) {
            tracing::warn!("⚠️ Messages index still shows the login form");
        }
        Ok(page.body)
    }
}

#[async_trait]
impl SiteScraper for KralandScraper {
    async fn scrape(&self, account: &Account) -> Result<ScrapingResult> {
        self.ensure_authenticated(account)
            .await
            .map_err(into_scraping_error)?;
        let index = self.fetch_index().await.map_err(into_scraping_error)?;

        let has_notification = parser::has_general_notification(&index);
        let accounts = parser::extract_accounts(&index, &self.base_url);
        tracing::debug!("Found {} account(s) in sidebar", accounts.len());

        let mut messages = Vec::new();
        for link in accounts {
            // 單一帳號失敗不影響其他帳號
            match self.session.get(&link.url).await {
                Ok(page) if page.is_error() => {
                    tracing::warn!(
                        "⚠️ Skipping account {}: page returned status {}",
                        link.name,
                        page.status
                    );
                }
                Ok(page) => {
                    let found = parser::parse_messages(&page.body, &link.section);
                    tracing::debug!("{} unread message(s) for {}", found.len(), link.name);
                    messages.extend(found);
                }
                Err(e) => {
                    tracing::warn!("⚠️ Skipping account {}: {}", link.name, e);
                }
            }
        }

        tracing::info!(
            "📬 Scrape done: {} unread message(s), general notification: {}",
            messages.len(),
            has_notification
        );
        Ok(ScrapingResult::new(messages, has_notification))
    }

    async fn is_reminder_available(&self, account: &Account) -> Result<bool> {
        self.ensure_authenticated(account)
            .await
            .map_err(into_scraping_error)?;

        let page = self
            .session
            .get(&self.reminder_url)
            .await
            .map_err(into_scraping_error)?;
        if page.is_error() {
            return Err(KrabotError::scraping(format!(
                "Reminder page returned status {}",
                page.status
            )));
        }

        let available = parser::is_reminder_available(&page.body, &self.reminder_action);
        tracing::info!("😴 Reminder action available: {}", available);
        Ok(available)
    }
}

fn join_path(base_url: &Url, path: &str) -> Result<String> {
    base_url
        .join(path)
        .map(String::from)
        .map_err(|e| KrabotError::InvalidConfigValueError {
            field: "site".to_string(),
            value: path.to_string(),
            reason: e.to_string(),
        })
}

/// Authentication failures keep their own type; everything else becomes a
/// scraping failure.
fn into_scraping_error(error: KrabotError) -> KrabotError {
    match error {
        KrabotError::AuthenticationError { .. } | KrabotError::ScrapingError { .. } => error,
        other => KrabotError::scraping(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_resolve_against_base() {
        let site = SiteConfig {
            base_url: Some("http://localhost:9999".to_string()),
            ..Default::default()
        };
        let scraper = KralandScraper::new(&site).unwrap();

        assert_eq!(scraper.messages_url, "http://localhost:9999/kramail");
        assert_eq!(scraper.login_url, "http://localhost:9999/accueil");
        assert_eq!(scraper.reminder_url, "http://localhost:9999/jouer/plateau");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let site = SiteConfig {
            base_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            KralandScraper::new(&site),
            Err(KrabotError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_into_scraping_error_keeps_authentication() {
        let auth = into_scraping_error(KrabotError::AuthenticationError { status: 403 });
        assert!(matches!(auth, KrabotError::AuthenticationError { status: 403 }));

        let other = into_scraping_error(KrabotError::ValidationError {
            message: "boom".to_string(),
        });
        assert!(matches!(other, KrabotError::ScrapingError { .. }));
    }
}
