use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KrabotError {
    #[error("Authentication failed with status: {status}")]
    AuthenticationError { status: u16 },

    #[error("Scraping failed: {message}")]
    ScrapingError { message: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Rate limit active until {until}")]
    RateLimitedError { until: DateTime<Utc> },

    #[error("Release feed rate limit exceeded. Reset at: {reset}")]
    ReleaseRateLimitError { reset: String },

    #[error("Release feed error: {message}")]
    ReleaseFeedError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Scheduler error: {0}")]
    SchedulerError(#[from] tokio_cron_scheduler::JobSchedulerError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

/// 錯誤分類，用於日誌與錯誤通知
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Scraping,
    Network,
    RateLimit,
    Configuration,
    Internal,
}

impl KrabotError {
    pub fn scraping(message: impl Into<String>) -> Self {
        Self::ScrapingError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AuthenticationError { .. } => ErrorCategory::Authentication,
            Self::ScrapingError { .. } => ErrorCategory::Scraping,
            Self::HttpError(_) | Self::ReleaseFeedError { .. } => ErrorCategory::Network,
            Self::RateLimitedError { .. } | Self::ReleaseRateLimitError { .. } => {
                ErrorCategory::RateLimit
            }
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ValidationError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::SchedulerError(_) => ErrorCategory::Internal,
        }
    }

    /// True only for the outbound webhook cooldown.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimitedError { .. })
    }
}

pub type Result<T> = std::result::Result<T, KrabotError>;
