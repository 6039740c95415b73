use crate::domain::model::Account;
use crate::utils::error::{KrabotError, Result};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{
    parse_time_of_day, validate_non_empty_string, validate_positive_number, validate_range,
    validate_url, Validate,
};
use chrono::NaiveTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SITE_URL: &str = "http://www.kraland.org";
pub const DEFAULT_RELEASE_FEED_URL: &str =
    "https://api.github.com/repos/arnaudroubinet/krabotnotif/releases/latest";
pub const DEFAULT_RELEASE_PAGE_URL: &str =
    "https://github.com/arnaudroubinet/krabotnotif/releases/latest";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub site: SiteConfig,
    pub account: AccountConfig,
    pub discord: DiscordConfig,
    #[serde(default)]
    pub release: ReleaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    pub base_url: Option<String>,
    pub messages_path: Option<String>,
    pub login_path: Option<String>,
    pub reminder_path: Option<String>,
    pub reminder_action: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub messages: MessageTemplates,
}

/// 通知訊息模板，佔位符：`*title*` `*originator*` `*recipient*` `*section*`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageTemplates {
    pub message: Option<String>,
    pub general_notification: Option<String>,
    pub startup: Option<String>,
    pub shutdown: Option<String>,
    pub release: Option<String>,
    pub error_prefix: Option<String>,
    pub reminder: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseConfig {
    pub feed_url: Option<String>,
    pub page_url: Option<String>,
    pub cron: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub message_check_interval_seconds: Option<u64>,
    pub delay_seconds: Option<u64>,
    pub reminder_time: Option<String>,
    pub memory_report_cron: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub enabled: Option<bool>,
    pub bind_address: Option<String>,
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub warning_threshold_percent: Option<u8>,
    pub critical_threshold_percent: Option<u8>,
}

impl SiteConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_SITE_URL)
    }

    pub fn messages_path(&self) -> &str {
        self.messages_path.as_deref().unwrap_or("/kramail")
    }

    pub fn login_path(&self) -> &str {
        self.login_path.as_deref().unwrap_or("/accueil")
    }

    pub fn reminder_path(&self) -> &str {
        self.reminder_path.as_deref().unwrap_or("/jouer/plateau")
    }

    pub fn reminder_action(&self) -> &str {
        self.reminder_action.as_deref().unwrap_or("Dormir")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(30))
    }
}

impl DiscordConfig {
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or("Krabot")
    }

    pub fn avatar_url(&self) -> &str {
        self.avatar_url
            .as_deref()
            .unwrap_or("http://img.kraland.org/a/krabot.jpg")
    }
}

impl MessageTemplates {
    pub fn message(&self) -> &str {
        self.message
            .as_deref()
            .unwrap_or("Hey, tu as un kramail de '*originator*' ayant pour sujet '*title*' !!")
    }

    pub fn general_notification(&self) -> &str {
        self.general_notification
            .as_deref()
            .unwrap_or("Hey, tu as une notification !!")
    }

    pub fn startup(&self) -> &str {
        self.startup
            .as_deref()
            .unwrap_or("Krabot est de retour... pour vous jouer un mauvais tour !")
    }

    pub fn shutdown(&self) -> &str {
        self.shutdown
            .as_deref()
            .unwrap_or("Je m'en vais, au revoir !")
    }

    pub fn release(&self) -> &str {
        self.release
            .as_deref()
            .unwrap_or("Une nouvelle release de KrabotNotif est disponible")
    }

    pub fn error_prefix(&self) -> &str {
        self.error_prefix.as_deref().unwrap_or("Oh no !")
    }

    pub fn reminder(&self) -> &str {
        self.reminder.as_deref().unwrap_or("N'oublie pas de dormir")
    }
}

impl ReleaseConfig {
    pub fn feed_url(&self) -> &str {
        self.feed_url.as_deref().unwrap_or(DEFAULT_RELEASE_FEED_URL)
    }

    pub fn page_url(&self) -> &str {
        self.page_url.as_deref().unwrap_or(DEFAULT_RELEASE_PAGE_URL)
    }

    /// 六欄位 cron (含秒)
    pub fn cron(&self) -> &str {
        self.cron.as_deref().unwrap_or("0 0 */6 * * *")
    }
}

impl SchedulerConfig {
    pub fn message_check_interval(&self) -> Duration {
        Duration::from_secs(self.message_check_interval_seconds.unwrap_or(300))
    }

    pub fn delay_amount(&self) -> Duration {
        Duration::from_secs(self.delay_seconds.unwrap_or(1800))
    }

    pub fn reminder_time(&self) -> Result<NaiveTime> {
        parse_time_of_day(
            "scheduler.reminder_time",
            self.reminder_time.as_deref().unwrap_or("20:00"),
        )
    }

    pub fn memory_report_cron(&self) -> &str {
        self.memory_report_cron.as_deref().unwrap_or("0 0 * * * *")
    }
}

impl ServerConfig {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn bind_address(&self) -> &str {
        self.bind_address.as_deref().unwrap_or("0.0.0.0:8080")
    }

    pub fn public_url(&self) -> &str {
        self.public_url.as_deref().unwrap_or("http://localhost:8080")
    }
}

impl LoggingConfig {
    pub fn format(&self) -> LogFormat {
        self.format
            .as_deref()
            .and_then(LogFormat::parse)
            .unwrap_or(LogFormat::Compact)
    }
}

impl MemoryConfig {
    pub fn warning_threshold(&self) -> u8 {
        self.warning_threshold_percent.unwrap_or(80)
    }

    pub fn critical_threshold(&self) -> u8 {
        self.critical_threshold_percent.unwrap_or(90)
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(KrabotError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| KrabotError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${KRALAND_PASSWORD})，未定義者保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| KrabotError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn account(&self) -> Result<Account> {
        Account::new(&self.account.username, &self.account.password)
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("site.base_url", self.site.base_url())?;
        validate_positive_number("site.timeout_seconds", self.site.timeout().as_secs(), 1)?;
        validate_non_empty_string("site.reminder_action", self.site.reminder_action())?;

        validate_resolved("account.username", &self.account.username)?;
        validate_resolved("account.password", &self.account.password)?;
        self.account()?;

        validate_resolved("discord.webhook_url", &self.discord.webhook_url)?;
        validate_url("discord.webhook_url", &self.discord.webhook_url)?;
        validate_non_empty_string("discord.username", self.discord.username())?;

        validate_url("release.feed_url", self.release.feed_url())?;
        validate_non_empty_string("release.cron", self.release.cron())?;

        validate_positive_number(
            "scheduler.message_check_interval_seconds",
            self.scheduler.message_check_interval().as_secs(),
            1,
        )?;
        validate_positive_number(
            "scheduler.delay_seconds",
            self.scheduler.delay_amount().as_secs(),
            1,
        )?;
        self.scheduler.reminder_time()?;
        validate_non_empty_string(
            "scheduler.memory_report_cron",
            self.scheduler.memory_report_cron(),
        )?;

        if self.server.enabled() {
            validate_non_empty_string("server.bind_address", self.server.bind_address())?;
            validate_url("server.public_url", self.server.public_url())?;
        }

        if let Some(format) = &self.logging.format {
            if LogFormat::parse(format).is_none() {
                return Err(KrabotError::InvalidConfigValueError {
                    field: "logging.format".to_string(),
                    value: format.clone(),
                    reason: "Valid formats: compact, json".to_string(),
                });
            }
        }

        let warning = self.memory.warning_threshold();
        let critical = self.memory.critical_threshold();
        validate_range("memory.warning_threshold_percent", warning, 1, 100)?;
        validate_range("memory.critical_threshold_percent", critical, 1, 100)?;
        if warning >= critical {
            return Err(KrabotError::InvalidConfigValueError {
                field: "memory.warning_threshold_percent".to_string(),
                value: warning.to_string(),
                reason: format!("Must be lower than the critical threshold ({})", critical),
            });
        }

        Ok(())
    }
}

fn validate_resolved(field_name: &str, value: &str) -> Result<()> {
    if value.contains("${") {
        return Err(KrabotError::MissingConfigError {
            field: format!("{} (unresolved environment variable in '{}')", field_name, value),
        });
    }
    Ok(())
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
