use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::error::AppError;

/// Fixed-window request limiter keyed by user and sync direction
#[derive(Clone)]
pub struct SyncRateLimiter {
    state: Arc<Mutex<HashMap<(SyncDirection, String), RateWindow>>>,
    window: Duration,
    upload_limit: u32,
    download_limit: u32,
    metrics: Arc<RateLimitMetrics>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncDirection {
    Upload,
    Download,
}

#[derive(Default)]
struct RateLimitMetrics {
    upload_allowed: AtomicU64,
    upload_limited: AtomicU64,
    download_allowed: AtomicU64,
    download_limited: AtomicU64,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct RateLimitMetricsSnapshot {
    pub upload_allowed: u64,
    pub upload_limited: u64,
    pub download_allowed: u64,
    pub download_limited: u64,
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    started_at: Instant,
    count: u32,
}

impl SyncRateLimiter {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.rate_limit_window,
            config.upload_rate_limit_per_window,
            config.download_rate_limit_per_window,
        )
    }

    fn new(window: Duration, upload_limit: u32, download_limit: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
            window,
            upload_limit,
            download_limit,
            metrics: Arc::new(RateLimitMetrics::default()),
        }
    }

    pub async fn check(&self, direction: SyncDirection, user_id: &str) -> Result<(), AppError> {
        let limit = match direction {
            SyncDirection::Upload => self.upload_limit,
            SyncDirection::Download => self.download_limit,
        };

        let now = Instant::now();
        let mut guard = self.state.lock().await;
        let entry = guard
            .entry((direction, user_id.to_string()))
            .or_insert(RateWindow {
                started_at: now,
                count: 0,
            });

        if now.duration_since(entry.started_at) >= self.window {
            entry.started_at = now;
            entry.count = 0;
        }

        if entry.count >= limit {
            let retry_after_secs = self
                .window
                .saturating_sub(now.duration_since(entry.started_at))
                .as_secs();
            self.counter(direction, false).fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                direction = direction.label(),
                user = user_fingerprint(user_id),
                retry_after_secs,
                "Rate limit exceeded"
            );
            return Err(AppError::too_many_requests(
                format!("Rate limit exceeded for sync {}", direction.label()),
                retry_after_secs,
            ));
        }

        entry.count += 1;
        self.counter(direction, true).fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn metrics_snapshot(&self) -> RateLimitMetricsSnapshot {
        RateLimitMetricsSnapshot {
            upload_allowed: self.metrics.upload_allowed.load(Ordering::Relaxed),
            upload_limited: self.metrics.upload_limited.load(Ordering::Relaxed),
            download_allowed: self.metrics.download_allowed.load(Ordering::Relaxed),
            download_limited: self.metrics.download_limited.load(Ordering::Relaxed),
        }
    }

    fn counter(&self, direction: SyncDirection, allowed: bool) -> &AtomicU64 {
        match (direction, allowed) {
            (SyncDirection::Upload, true) => &self.metrics.upload_allowed,
            (SyncDirection::Upload, false) => &self.metrics.upload_limited,
            (SyncDirection::Download, true) => &self.metrics.download_allowed,
            (SyncDirection::Download, false) => &self.metrics.download_limited,
        }
    }
}

impl SyncDirection {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Download => "download",
        }
    }
}

pub fn user_fingerprint(user_id: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    user_id.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rate_limiter_blocks_after_limit() {
        let limiter = SyncRateLimiter::new(Duration::from_secs(60), 2, 2);

        limiter.check(SyncDirection::Upload, "user-a").await.unwrap();
        limiter.check(SyncDirection::Upload, "user-a").await.unwrap();

        let err = limiter
            .check(SyncDirection::Upload, "user-a")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TooManyRequests(_, _)));

        let metrics = limiter.metrics_snapshot();
        assert_eq!(metrics.upload_allowed, 2);
        assert_eq!(metrics.upload_limited, 1);
    }

    #[tokio::test]
    async fn limits_are_per_user_and_direction() {
        let limiter = SyncRateLimiter::new(Duration::from_secs(60), 1, 1);

        limiter.check(SyncDirection::Upload, "user-a").await.unwrap();
        limiter.check(SyncDirection::Download, "user-a").await.unwrap();
        limiter.check(SyncDirection::Upload, "user-b").await.unwrap();
        assert!(limiter.check(SyncDirection::Upload, "user-a").await.is_err());

        assert_eq!(limiter.metrics_snapshot().download_allowed, 1);
    }
}
