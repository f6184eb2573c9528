//! Remote sync transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{Credentials, SyncError, SyncResult};
use crate::config::{parse_endpoint, SyncSettings};
use crate::models::{RecordCounts, RecordSet};

/// Upload/download exchange with the remote store.
///
/// Failures are never retried by the caller.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Push every local record
    async fn upload(&self, credentials: &Credentials, records: &RecordSet)
        -> SyncResult<UploadAck>;

    /// Pull the caller's full remote record set
    async fn download(&self, credentials: &Credentials) -> SyncResult<RecordSet>;
}

/// Acknowledgement returned by a successful upload
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub synced: Option<RecordCounts>,
}

#[derive(Serialize)]
struct UploadEnvelope<'a> {
    data: &'a RecordSet,
}

#[derive(Deserialize)]
struct DownloadEnvelope {
    data: Option<RecordSet>,
}

const MAX_ERROR_BODY_CHARS: usize = 180;

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

/// JSON-over-HTTP transport for the `/sync` endpoint
#[derive(Clone)]
pub struct HttpSyncTransport {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSyncTransport {
    /// Create a transport for `base_url`, e.g. `https://sync.example.com/v1`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let base_url: String = base_url.into();
        let base_url = parse_endpoint(&base_url)
            .map_err(|error| SyncError::Configuration(format!("endpoint {error}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| SyncError::Configuration(error.to_string()))?;

        Ok(Self {
            endpoint: format!("{base_url}/sync"),
            client,
        })
    }

    /// Create a transport from `SCRIBE_*` settings
    pub fn from_settings(settings: &SyncSettings) -> SyncResult<Self> {
        Self::new(settings.require_endpoint()?, settings.timeout)
    }

    /// Full URL of the sync endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteTransport for HttpSyncTransport {
    async fn upload(
        &self,
        credentials: &Credentials,
        records: &RecordSet,
    ) -> SyncResult<UploadAck> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&credentials.access_token)
            .header("Accept", "application/json")
            .json(&UploadEnvelope { data: records })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(rejected(status, &body));
        }

        parse_upload_ack(&body)
    }

    async fn download(&self, credentials: &Credentials) -> SyncResult<RecordSet> {
        let response = self
            .client
            .get(&self.endpoint)
            .bearer_auth(&credentials.access_token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(rejected(status, &body));
        }

        parse_download(&body)
    }
}

/// An empty 2xx body counts as success; anything else must be a JSON object.
fn parse_upload_ack(body: &str) -> SyncResult<UploadAck> {
    if body.trim().is_empty() {
        return Ok(UploadAck {
            success: true,
            ..UploadAck::default()
        });
    }

    serde_json::from_str(body).map_err(|error| {
        SyncError::InvalidResponse(format!(
            "malformed upload acknowledgement: {error} (body: {})",
            clip(body)
        ))
    })
}

fn parse_download(body: &str) -> SyncResult<RecordSet> {
    let envelope: DownloadEnvelope = serde_json::from_str(body)
        .map_err(|error| SyncError::InvalidResponse(format!("malformed sync payload: {error}")))?;
    envelope
        .data
        .ok_or_else(|| SyncError::InvalidResponse("response did not include data".to_string()))
}

fn rejected(status: StatusCode, body: &str) -> SyncError {
    SyncError::Rejected {
        status: status.as_u16(),
        body: summarize_error_body(status, body),
    }
}

fn summarize_error_body(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.error.or(payload.message).or(payload.details) {
            return clip(&message);
        }
    }

    let trimmed = clip(body);
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string)
    } else {
        trimmed
    }
}

fn clip(value: &str) -> String {
    value.trim().chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn transport_rejects_invalid_endpoints() {
        let timeout = Duration::from_secs(5);
        assert!(matches!(
            HttpSyncTransport::new("", timeout),
            Err(SyncError::Configuration(_))
        ));
        assert!(matches!(
            HttpSyncTransport::new("sync.example.com", timeout),
            Err(SyncError::Configuration(_))
        ));
        let transport = HttpSyncTransport::new(" https://sync.example.com/v1// ", timeout).unwrap();
        assert_eq!(transport.endpoint(), "https://sync.example.com/v1/sync");
    }

    #[test]
    fn transport_targets_sync_path() {
        let transport =
            HttpSyncTransport::new("http://127.0.0.1:8080/v1/", Duration::from_secs(5)).unwrap();
        assert_eq!(transport.endpoint(), "http://127.0.0.1:8080/v1/sync");
    }

    #[test]
    fn error_body_prefers_json_fields() {
        let status = StatusCode::UNAUTHORIZED;
        assert_eq!(
            summarize_error_body(status, r#"{"error":"Invalid token"}"#),
            "Invalid token"
        );
        assert_eq!(
            summarize_error_body(status, r#"{"success":false,"message":"Sync failed","details":"x"}"#),
            "Sync failed"
        );
        assert_eq!(summarize_error_body(status, "  gateway down \n"), "gateway down");
        assert_eq!(summarize_error_body(status, ""), "Unauthorized");
    }

    #[test]
    fn error_body_is_truncated() {
        let body = "e".repeat(1_000);
        assert_eq!(
            summarize_error_body(StatusCode::BAD_GATEWAY, &body).len(),
            180
        );
    }

    #[test]
    fn upload_ack_accepts_json_and_empty_bodies() {
        let ack = parse_upload_ack(
            r#"{"success":true,"message":"Data synced successfully","synced":{"archives":1,"tomes":2,"entries":3}}"#,
        )
        .unwrap();
        assert!(ack.success);
        assert_eq!(ack.synced.map(|counts| counts.total()), Some(6));

        assert!(parse_upload_ack("").unwrap().success);
        assert_eq!(parse_upload_ack(r#"{"success":true}"#).unwrap().synced, None);
    }

    #[test]
    fn upload_ack_rejects_non_json_bodies() {
        for body in ["OK", "<html>captive portal login</html>", "[1, 2"] {
            assert!(
                matches!(parse_upload_ack(body), Err(SyncError::InvalidResponse(_))),
                "{body}"
            );
        }
    }

    #[test]
    fn download_requires_data() {
        let set = parse_download(r#"{"success":true,"data":{"archives":[],"tomes":[],"entries":[]}}"#)
            .unwrap();
        assert!(set.is_empty());

        assert!(matches!(
            parse_download(r#"{"success":true}"#),
            Err(SyncError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_download("<html>"),
            Err(SyncError::InvalidResponse(_))
        ));
    }

    #[test]
    fn download_ignores_extra_record_fields() {
        let body = r#"{"data":{"archives":[{"id":"0190a5d4-6a4e-7cc0-8000-000000000001","name":"Work","description":null,"user_id":"u1","created_at":"2024-05-01T10:00:00.000Z","updated_at":"2024-05-01T10:00:00.000Z"}]}}"#;
        let set = parse_download(body).unwrap();
        assert_eq!(set.archives.len(), 1);
        assert_eq!(set.archives[0].description, "");
        assert!(set.tomes.is_empty());
    }
}
