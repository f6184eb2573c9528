//! Client sync configuration.
//!
//! `SyncSettings` gathers everything a client needs to reach the remote sync
//! service: the endpoint, request timeout, bearer token and the account fields
//! used to derive the watermark partition. Values come from the process
//! environment (`SCRIBE_*` variables); tests feed a map through
//! [`SyncSettings::from_lookup`].

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::sync::AccountIdentity;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Remote sync settings for a client
#[derive(Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Base URL of the sync service, e.g. `https://sync.example.com/v1`
    pub endpoint: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Bearer token presented to the sync service
    pub access_token: Option<String>,
    /// Account fields used to resolve the caller's user id
    pub account: AccountIdentity,
    /// Explicit local database path
    pub db_path: Option<PathBuf>,
}

impl fmt::Debug for SyncSettings {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SyncSettings")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("account", &self.account)
            .field("db_path", &self.db_path)
            .finish()
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            access_token: None,
            account: AccountIdentity::default(),
            db_path: None,
        }
    }
}

impl SyncSettings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    /// Read settings through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let endpoint = optional_trimmed(&lookup, "SCRIBE_SYNC_URL")
            .map(|value| parse_endpoint(&value))
            .transpose()
            .map_err(|error| ConfigError::Invalid(format!("SCRIBE_SYNC_URL {error}")))?;

        let timeout_secs = optional_trimmed(&lookup, "SCRIBE_SYNC_TIMEOUT_SECS")
            .map_or(Ok(DEFAULT_TIMEOUT_SECS), |value| value.parse::<u64>())
            .map_err(|_| {
                ConfigError::Invalid(
                    "SCRIBE_SYNC_TIMEOUT_SECS must be an integer in [1, 600]".to_string(),
                )
            })?;
        if !(1..=600).contains(&timeout_secs) {
            return Err(ConfigError::Invalid(
                "SCRIBE_SYNC_TIMEOUT_SECS must be in [1, 600]".to_string(),
            ));
        }

        let account = AccountIdentity {
            local_account_id: optional_trimmed(&lookup, "SCRIBE_ACCOUNT_ID"),
            home_account_id: optional_trimmed(&lookup, "SCRIBE_HOME_ACCOUNT_ID"),
            username: optional_trimmed(&lookup, "SCRIBE_USERNAME"),
        };

        Ok(Self {
            endpoint,
            timeout: Duration::from_secs(timeout_secs),
            access_token: optional_trimmed(&lookup, "SCRIBE_ACCESS_TOKEN"),
            account,
            db_path: optional_trimmed(&lookup, "SCRIBE_DB_PATH").map(PathBuf::from),
        })
    }

    /// Whether a remote endpoint is configured at all
    #[must_use]
    pub const fn remote_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// The configured endpoint, or a configuration error naming the variable
    pub fn require_endpoint(&self) -> Result<&str, ConfigError> {
        self.endpoint
            .as_deref()
            .ok_or(ConfigError::MissingVar("SCRIBE_SYNC_URL"))
    }
}

/// Validate a sync service base URL and strip trailing slashes.
///
/// The error text completes a sentence naming the offending setting.
pub(crate) fn parse_endpoint(raw: &str) -> Result<String, String> {
    let endpoint = raw.trim().trim_end_matches('/');
    if endpoint.is_empty() {
        return Err("must not be empty".to_string());
    }
    match endpoint.split_once("://") {
        Some(("http" | "https", host)) if !host.is_empty() => Ok(endpoint.to_string()),
        _ => Err("must start with http:// or https://".to_string()),
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Result<SyncSettings, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        SyncSettings::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn empty_environment_disables_remote() {
        let settings = settings(&[]).unwrap();
        assert!(!settings.remote_enabled());
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert!(settings.require_endpoint().is_err());
    }

    #[test]
    fn endpoint_is_trimmed_and_validated() {
        let settings = settings(&[("SCRIBE_SYNC_URL", " https://sync.example.com/v1/ ")]).unwrap();
        assert_eq!(settings.require_endpoint().unwrap(), "https://sync.example.com/v1");

        let err = self::settings(&[("SCRIBE_SYNC_URL", "sync.example.com")]).unwrap_err();
        assert!(err.to_string().contains("SCRIBE_SYNC_URL"));
    }

    #[test]
    fn endpoint_requires_http_scheme_and_host() {
        assert_eq!(parse_endpoint("http://localhost:8080").unwrap(), "http://localhost:8080");
        assert_eq!(parse_endpoint("https://sync.example.com//").unwrap(), "https://sync.example.com");
        assert!(parse_endpoint("ftp://sync.example.com").is_err());
        assert!(parse_endpoint("https://").is_err());
        assert!(parse_endpoint("   ").is_err());
    }

    #[test]
    fn timeout_must_be_in_range() {
        assert!(settings(&[("SCRIBE_SYNC_TIMEOUT_SECS", "0")]).is_err());
        assert!(settings(&[("SCRIBE_SYNC_TIMEOUT_SECS", "soon")]).is_err());
        let ok = settings(&[("SCRIBE_SYNC_TIMEOUT_SECS", "5")]).unwrap();
        assert_eq!(ok.timeout, Duration::from_secs(5));
    }

    #[test]
    fn account_fields_are_collected() {
        let settings = settings(&[
            ("SCRIBE_HOME_ACCOUNT_ID", "abc.tenant"),
            ("SCRIBE_USERNAME", "  "),
        ])
        .unwrap();
        assert_eq!(settings.account.home_account_id.as_deref(), Some("abc.tenant"));
        assert_eq!(settings.account.username, None);
    }

    #[test]
    fn debug_redacts_access_token() {
        let settings = settings(&[("SCRIBE_ACCESS_TOKEN", "very-secret-token")]).unwrap();
        let debug_output = format!("{settings:?}");
        assert!(!debug_output.contains("very-secret-token"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
