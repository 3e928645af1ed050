use std::collections::HashMap;
use std::env;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use drivetrain_core::openai::{DEFAULT_API_BASE, DEFAULT_ENRICHMENT_MODEL};
use drivetrain_core::poll::PollPolicy;
use drivetrain_core::source::{DEFAULT_DRIVE_API_BASE, DEFAULT_TOKEN_URL};
use drivetrain_core::util::is_http_url;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub db_path: String,
    pub openai_api_key: String,
    pub openai_api_base: String,
    pub google_client_email: String,
    pub google_private_key: String,
    pub google_drive_api_base: String,
    pub google_token_url: String,
    pub artifact_poll_interval: Duration,
    pub artifact_poll_timeout: Duration,
    pub http_timeout: Duration,
    pub enrichment_model: String,
    pub departments_file: Option<PathBuf>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("db_path", &self.db_path)
            .field("openai_api_key", &"[REDACTED]")
            .field("openai_api_base", &self.openai_api_base)
            .field("google_client_email", &self.google_client_email)
            .field("google_private_key", &"[REDACTED]")
            .field("google_drive_api_base", &self.google_drive_api_base)
            .field("google_token_url", &self.google_token_url)
            .field("artifact_poll_interval", &self.artifact_poll_interval)
            .field("artifact_poll_timeout", &self.artifact_poll_timeout)
            .field("http_timeout", &self.http_timeout)
            .field("enrichment_model", &self.enrichment_model)
            .field("departments_file", &self.departments_file)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "DRIVETRAIN_BIND_ADDR", "127.0.0.1:8080");
        let db_path = value_or_default(&lookup, "DRIVETRAIN_DB_PATH", "drivetrain.db");

        let openai_api_key = required_trimmed(&lookup, "OPENAI_API_KEY")?;
        let openai_api_base = http_url_or_default(&lookup, "OPENAI_API_BASE", DEFAULT_API_BASE)?;

        let google_client_email = required_trimmed(&lookup, "GOOGLE_CLIENT_EMAIL")?;
        let google_private_key = required_trimmed(&lookup, "GOOGLE_PRIVATE_KEY")?;
        let google_drive_api_base =
            http_url_or_default(&lookup, "GOOGLE_DRIVE_API_BASE", DEFAULT_DRIVE_API_BASE)?;
        let google_token_url = http_url_or_default(&lookup, "GOOGLE_TOKEN_URL", DEFAULT_TOKEN_URL)?;

        let poll_interval_ms =
            bounded_integer(&lookup, "ARTIFACT_POLL_INTERVAL_MS", 1_000, 100..=10_000)?;
        let poll_timeout_secs = bounded_integer(&lookup, "ARTIFACT_POLL_TIMEOUT_SECS", 10, 1..=300)?;
        let http_timeout_secs = bounded_integer(&lookup, "HTTP_TIMEOUT_SECS", 60, 5..=600)?;

        let enrichment_model =
            value_or_default(&lookup, "ENRICHMENT_MODEL", DEFAULT_ENRICHMENT_MODEL);
        let departments_file = optional_trimmed(&lookup, "DEPARTMENTS_FILE").map(PathBuf::from);

        Ok(Self {
            bind_addr,
            db_path,
            openai_api_key,
            openai_api_base,
            google_client_email,
            google_private_key,
            google_drive_api_base,
            google_token_url,
            artifact_poll_interval: Duration::from_millis(poll_interval_ms),
            artifact_poll_timeout: Duration::from_secs(poll_timeout_secs),
            http_timeout: Duration::from_secs(http_timeout_secs),
            enrichment_model,
            departments_file,
        })
    }

    pub const fn artifact_poll_policy(&self) -> PollPolicy {
        PollPolicy::new(self.artifact_poll_interval, self.artifact_poll_timeout)
    }
}

fn bounded_integer(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
    range: RangeInclusive<u64>,
) -> Result<u64, ConfigError> {
    let Some(raw) = optional_trimmed(lookup, name) else {
        return Ok(default);
    };
    let value = raw.parse::<u64>().map_err(|_| {
        ConfigError::Invalid(format!(
            "{name} must be an integer in [{}, {}]",
            range.start(),
            range.end()
        ))
    })?;
    if !range.contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be in [{}, {}]",
            range.start(),
            range.end()
        )));
    }
    Ok(value)
}

fn http_url_or_default(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
) -> Result<String, ConfigError> {
    let value = value_or_default(lookup, name, default);
    let parsed = Url::parse(&value)
        .map_err(|error| ConfigError::Invalid(format!("{name} is not a valid URL: {error}")))?;
    if !is_http_url(parsed.as_str()) {
        return Err(ConfigError::Invalid(format!(
            "{name} must start with http:// or https://"
        )));
    }
    Ok(trim_trailing(&value).to_string())
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    drivetrain_core::util::normalize_text_option(lookup(name))
}

fn trim_trailing(value: &str) -> &str {
    value.trim_end_matches('/')
}
