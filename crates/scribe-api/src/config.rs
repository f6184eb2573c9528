use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

const MIN_SECRET_BYTES: usize = 16;

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
    /// Shared HS256 secret used to verify bearer tokens
    pub jwt_secret: String,
    pub auth_clock_skew: Duration,
    pub rate_limit_window: Duration,
    pub upload_rate_limit_per_window: u32,
    pub download_rate_limit_per_window: u32,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"[REDACTED]")
            .field("auth_clock_skew", &self.auth_clock_skew)
            .field("rate_limit_window", &self.rate_limit_window)
            .field(
                "upload_rate_limit_per_window",
                &self.upload_rate_limit_per_window,
            )
            .field(
                "download_rate_limit_per_window",
                &self.download_rate_limit_per_window,
            )
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "SCRIBE_API_BIND_ADDR", "127.0.0.1:8080");

        let jwt_secret = required_trimmed(&lookup, "SCRIBE_API_JWT_SECRET")?;
        if jwt_secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::Invalid(format!(
                "SCRIBE_API_JWT_SECRET must be at least {MIN_SECRET_BYTES} bytes"
            )));
        }

        let auth_clock_skew_secs = parse_in_range(
            &lookup,
            "SCRIBE_API_AUTH_CLOCK_SKEW_SECS",
            "60",
            0..=300,
        )?;
        let rate_limit_window_secs = parse_in_range(
            &lookup,
            "SCRIBE_API_RATE_LIMIT_WINDOW_SECS",
            "60",
            10..=3_600,
        )?;
        let upload_rate_limit_per_window = parse_in_range(
            &lookup,
            "SCRIBE_API_UPLOAD_RATE_LIMIT_PER_WINDOW",
            "60",
            1..=1_000,
        )?;
        let download_rate_limit_per_window = parse_in_range(
            &lookup,
            "SCRIBE_API_DOWNLOAD_RATE_LIMIT_PER_WINDOW",
            "120",
            1..=5_000,
        )?;

        Ok(Self {
            bind_addr,
            jwt_secret,
            auth_clock_skew: Duration::from_secs(auth_clock_skew_secs),
            rate_limit_window: Duration::from_secs(rate_limit_window_secs),
            upload_rate_limit_per_window: u32::try_from(upload_rate_limit_per_window)
                .map_err(|_| ConfigError::Invalid("upload rate limit out of range".to_string()))?,
            download_rate_limit_per_window: u32::try_from(download_rate_limit_per_window)
                .map_err(|_| {
                    ConfigError::Invalid("download rate limit out of range".to_string())
                })?,
        })
    }
}

fn parse_in_range(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
    range: std::ops::RangeInclusive<u64>,
) -> Result<u64, ConfigError> {
    let message = || {
        ConfigError::Invalid(format!(
            "{name} must be an integer in [{}, {}]",
            range.start(),
            range.end()
        ))
    };

    let value = value_or_default(lookup, name, default)
        .parse::<u64>()
        .map_err(|_| message())?;
    if !range.contains(&value) {
        return Err(message());
    }
    Ok(value)
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
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
