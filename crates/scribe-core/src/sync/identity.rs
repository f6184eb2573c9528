//! Caller identity and bearer credentials

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{SyncError, SyncResult};
use crate::config::SyncSettings;

/// Bearer token plus the user id that partitions sync metadata
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: String,
    pub access_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Account fields reported by the sign-in provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    /// Stable per-tenant account id
    #[serde(default)]
    pub local_account_id: Option<String>,
    /// Composite `<object-id>.<tenant-id>` account id
    #[serde(default)]
    pub home_account_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl AccountIdentity {
    /// Resolve the user id used to scope sync metadata.
    ///
    /// Falls back from the stable account id, to the first `.` segment of the
    /// composite account id, to the username.
    pub fn resolve_user_id(&self) -> SyncResult<String> {
        let home_segment = self
            .home_account_id
            .as_deref()
            .and_then(|id| id.split('.').next());

        non_blank(self.local_account_id.as_deref())
            .or_else(|| non_blank(home_segment))
            .or_else(|| non_blank(self.username.as_deref()))
            .ok_or_else(|| {
                SyncError::Identity(
                    "account has no account id, home account id or username".to_string(),
                )
            })
    }
}

/// Supplies credentials for each sync call
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn credentials(&self) -> SyncResult<Credentials>;
}

/// Identity provider backed by fixed configuration values
#[derive(Clone)]
pub struct StaticIdentityProvider {
    account: AccountIdentity,
    access_token: Option<String>,
}

impl StaticIdentityProvider {
    pub fn new(account: AccountIdentity, access_token: Option<String>) -> Self {
        Self {
            account,
            access_token: non_blank(access_token.as_deref()),
        }
    }

    /// Build from `SCRIBE_*` settings
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self::new(settings.account.clone(), settings.access_token.clone())
    }
}

impl fmt::Debug for StaticIdentityProvider {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StaticIdentityProvider")
            .field("account", &self.account)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn credentials(&self) -> SyncResult<Credentials> {
        let user_id = self.account.resolve_user_id()?;
        let access_token = self
            .access_token
            .clone()
            .ok_or_else(|| SyncError::Identity("no access token available".to_string()))?;

        Ok(Credentials {
            user_id,
            access_token,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
