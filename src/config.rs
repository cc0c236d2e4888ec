use crate::infrastructure::coingecko_client::COINGECKO_API_BASE;
use crate::rate_limit::RateLimiterConfig;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_APP_NAME: &str = "TrackMyCoin";
pub const DEFAULT_SERVICE_ACCOUNT_FILE: &str = "service-account-file.json";
pub const DEFAULT_SHEET_ID: &str = "1zDO5I9ZWnT9AbD--RT9NZX3aQgem6d1FEleq0ISsElk";

const TELEGRAM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    MissingField(&'static str),

    #[error("invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Telegram notification settings (loaded for completeness, not used by enrichment)
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &redact(&self.bot_token))
            .field("chat_id", &self.chat_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Process configuration
#[derive(Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub telegram: TelegramConfig,
    pub google_api_key: String,
    pub google_service_account_file: String,
    pub google_sheet_id: String,
    /// Empty reads the whole first sheet
    pub google_sheet_range: String,

    pub coingecko_base_url: String,
    pub coingecko_api_key: Option<String>,
    pub coingecko_requests_per_minute: u32,
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<REDACTED>"
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("app_name", &self.app_name)
            .field("telegram", &self.telegram)
            .field("google_api_key", &redact(&self.google_api_key))
            .field(
                "google_service_account_file",
                &self.google_service_account_file,
            )
            .field("google_sheet_id", &self.google_sheet_id)
            .field("google_sheet_range", &self.google_sheet_range)
            .field("coingecko_base_url", &self.coingecko_base_url)
            .field(
                "coingecko_api_key",
                &redact(self.coingecko_api_key.as_deref().unwrap_or_default()),
            )
            .field(
                "coingecko_requests_per_minute",
                &self.coingecko_requests_per_minute,
            )
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            telegram: TelegramConfig {
                bot_token: String::new(),
                chat_id: String::new(),
                timeout: TELEGRAM_TIMEOUT,
            },
            google_api_key: String::new(),
            google_service_account_file: DEFAULT_SERVICE_ACCOUNT_FILE.to_string(),
            google_sheet_id: DEFAULT_SHEET_ID.to_string(),
            google_sheet_range: String::new(),
            coingecko_base_url: COINGECKO_API_BASE.to_string(),
            coingecko_api_key: None,
            coingecko_requests_per_minute: RateLimiterConfig::default().requests_per_minute,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment (after `.env`)
    pub fn from_env() -> Result<AppConfig, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup. Unset keys keep their default;
    /// keys set to an empty string stay empty.
    pub fn from_lookup<F>(lookup: F) -> Result<AppConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(name) = lookup("APP_NAME") {
            config.app_name = name;
        }
        if let Some(token) = lookup("TG_BOT_TOKEN") {
            config.telegram.bot_token = token;
        }
        if let Some(chat_id) = lookup("TG_CHAT_ID") {
            config.telegram.chat_id = chat_id;
        }
        if let Some(key) = lookup("GOOGLE_API_KEY") {
            config.google_api_key = key;
        }
        if let Some(path) = lookup("GOOGLE_SERVICE_ACCOUNT_FILE") {
            config.google_service_account_file = path;
        }
        if let Some(sheet_id) = lookup("GOOGLE_SHEET_ID") {
            config.google_sheet_id = sheet_id;
        }
        if let Some(range) = lookup("GOOGLE_SHEET_RANGE") {
            config.google_sheet_range = range;
        }

        if let Some(url) = lookup("COINGECKO_BASE_URL") {
            if !url.is_empty() {
                config.coingecko_base_url = url.trim_end_matches('/').to_string();
            }
        }
        if let Some(key) = lookup("COINGECKO_API_KEY") {
            config.coingecko_api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(rpm) = lookup("COINGECKO_REQUESTS_PER_MINUTE") {
            match rpm.parse::<u32>() {
                Ok(value) => config.coingecko_requests_per_minute = value,
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse COINGECKO_REQUESTS_PER_MINUTE '{}': {}, using default: {}",
                        rpm,
                        e,
                        config.coingecko_requests_per_minute
                    );
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_name.trim().is_empty() {
            return Err(ConfigError::MissingField("APP_NAME"));
        }

        if let Err(e) = url::Url::parse(&self.coingecko_base_url) {
            return Err(ConfigError::InvalidValue {
                field: "COINGECKO_BASE_URL",
                value: self.coingecko_base_url.clone(),
                reason: e.to_string(),
            });
        }

        if self.coingecko_requests_per_minute == 0 {
            return Err(ConfigError::InvalidValue {
                field: "COINGECKO_REQUESTS_PER_MINUTE",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    pub fn rate_limit(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            requests_per_minute: self.coingecko_requests_per_minute,
        }
    }
}
