//! Configuration module
//!
//! Settings are read from the process environment (and a `.env` file when present).
//! `Config::from_lookup` takes any key lookup so parsing can be exercised without
//! touching the real environment.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

const DEFAULT_PORT: u16 = 8000;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_IMAGE_SIZE_MB: usize = 10;
const PROVIDER_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_ALLOWED_IMAGE_TYPES: &str = "image/jpeg,image/jpg,image/png,image/gif,image/webp";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "omni-moderation-latest";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-flash-latest";

/// Which moderation backend classifies submitted content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    Keyword,
    OpenAi,
    Gemini,
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProviderKind::Keyword => write!(f, "keyword"),
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Gemini => write!(f, "gemini"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keyword" | "local" => Ok(ProviderKind::Keyword),
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            other => Err(anyhow::anyhow!(
                "MODERATION_PROVIDER must be one of keyword, openai, gemini (got '{}')",
                other
            )),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    // Database
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Uploads
    pub max_image_size_bytes: usize,
    pub allowed_image_content_types: Vec<String>,
    // Moderation provider
    pub provider: ProviderKind,
    pub provider_timeout_secs: u64,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_moderation_model: String,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub gemini_model: String,
    // Alert notifications
    pub slack_webhook_url: Option<String>,
    pub email_alerts_enabled: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_tls: bool,
    pub alert_email_to: Option<String>,
}

impl Config {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from an arbitrary key lookup. Does not validate.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
        let flag = |key: &str, default: bool| {
            var(key)
                .map(|s| matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(default)
        };

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = var("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = var("PORT")
            .unwrap_or_else(|| DEFAULT_PORT.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?;

        let max_image_size_mb = var("MAX_IMAGE_SIZE_MB")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(MAX_IMAGE_SIZE_MB);
        let max_image_size_bytes = max_image_size_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| anyhow::anyhow!("MAX_IMAGE_SIZE_MB is too large"))?;

        let allowed_image_content_types = var("ALLOWED_IMAGE_CONTENT_TYPES")
            .unwrap_or_else(|| DEFAULT_ALLOWED_IMAGE_TYPES.to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let provider = match var("MODERATION_PROVIDER") {
            Some(value) => value.parse()?,
            None => ProviderKind::default(),
        };

        Ok(Config {
            server_port,
            environment,
            cors_origins,
            request_timeout_secs: var("REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(REQUEST_TIMEOUT_SECS),
            database_url: var("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: var("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            max_image_size_bytes,
            allowed_image_content_types,
            provider,
            provider_timeout_secs: var("PROVIDER_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(PROVIDER_TIMEOUT_SECS),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_moderation_model: var("OPENAI_MODERATION_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            gemini_api_key: var("GEMINI_API_KEY").or_else(|| var("GOOGLE_API_KEY")),
            gemini_base_url: var("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            slack_webhook_url: var("SLACK_WEBHOOK_URL"),
            email_alerts_enabled: flag("EMAIL_ALERTS_ENABLED", false),
            smtp_host: var("SMTP_HOST"),
            smtp_port: var("SMTP_PORT")
                .and_then(|s| s.parse().ok())
                .filter(|&p| p > 0),
            smtp_user: var("SMTP_USER"),
            smtp_password: var("SMTP_PASSWORD"),
            smtp_from: var("SMTP_FROM"),
            smtp_tls: flag("SMTP_TLS", true),
            alert_email_to: var("ALERT_EMAIL_TO"),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if !(self.database_url.starts_with("postgres://")
            || self.database_url.starts_with("postgresql://"))
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        match self.provider {
            ProviderKind::Keyword => {}
            ProviderKind::OpenAi => {
                if self.openai_api_key.is_none() {
                    return Err(anyhow::anyhow!(
                        "OPENAI_API_KEY must be set when MODERATION_PROVIDER=openai"
                    ));
                }
            }
            ProviderKind::Gemini => {
                if self.gemini_api_key.is_none() {
                    return Err(anyhow::anyhow!(
                        "GEMINI_API_KEY or GOOGLE_API_KEY must be set when MODERATION_PROVIDER=gemini"
                    ));
                }
            }
        }

        if self.email_alerts_enabled
            && (self.smtp_host.is_none() || self.smtp_from.is_none() || self.alert_email_to.is_none())
        {
            return Err(anyhow::anyhow!(
                "EMAIL_ALERTS_ENABLED=true requires SMTP_HOST, SMTP_FROM and ALERT_EMAIL_TO to be set"
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        matches!(
            self.environment.to_lowercase().as_str(),
            "production" | "prod"
        )
    }

    pub fn is_image_type_allowed(&self, content_type: &str) -> bool {
        let normalized = content_type.trim().to_lowercase();
        self.allowed_image_content_types
            .iter()
            .any(|allowed| *allowed == normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const DB: (&str, &str) = ("DATABASE_URL", "postgres://localhost/moderator");

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[DB])).unwrap();
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.environment, "development");
        assert_eq!(config.provider, ProviderKind::Keyword);
        assert_eq!(config.max_image_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.gemini_model, "gemini-flash-latest");
        assert_eq!(config.openai_moderation_model, "omni-moderation-latest");
        assert!(config.is_image_type_allowed("image/JPEG"));
        assert!(config.is_image_type_allowed("image/jpg"));
        assert!(!config.is_image_type_allowed("application/pdf"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn oversized_image_limit_is_an_error() {
        let huge = usize::MAX.to_string();
        let err = Config::from_lookup(lookup(&[DB, ("MAX_IMAGE_SIZE_MB", &huge)])).unwrap_err();
        assert!(err.to_string().contains("MAX_IMAGE_SIZE_MB"));
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn rejects_non_postgres_url() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "sqlite://db")])).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn provider_requires_its_api_key() {
        let config =
            Config::from_lookup(lookup(&[DB, ("MODERATION_PROVIDER", "openai")])).unwrap();
        assert!(config.validate().is_err());

        let config = Config::from_lookup(lookup(&[
            DB,
            ("MODERATION_PROVIDER", "gemini"),
            ("GOOGLE_API_KEY", "g-key"),
        ]))
        .unwrap();
        assert_eq!(config.gemini_api_key.as_deref(), Some("g-key"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_provider_fails_to_parse() {
        assert!(Config::from_lookup(lookup(&[DB, ("MODERATION_PROVIDER", "magic")])).is_err());
    }

    #[test]
    fn wildcard_cors_rejected_in_production() {
        let config = Config::from_lookup(lookup(&[DB, ("ENVIRONMENT", "production")])).unwrap();
        assert!(config.is_production());
        assert!(config.validate().is_err());

        let config = Config::from_lookup(lookup(&[
            DB,
            ("APP_ENV", "prod"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
        ]))
        .unwrap();
        assert_eq!(config.cors_origins.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn email_alerts_need_smtp_settings() {
        let config = Config::from_lookup(lookup(&[DB, ("EMAIL_ALERTS_ENABLED", "true")])).unwrap();
        assert!(config.email_alerts_enabled);
        assert!(config.validate().is_err());

        let config = Config::from_lookup(lookup(&[
            DB,
            ("EMAIL_ALERTS_ENABLED", "true"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_FROM", "alerts@example.com"),
            ("ALERT_EMAIL_TO", "mods@example.com"),
            ("SMTP_PORT", "0"),
        ]))
        .unwrap();
        assert_eq!(config.smtp_port, None);
        assert!(config.validate().is_ok());
    }
}
