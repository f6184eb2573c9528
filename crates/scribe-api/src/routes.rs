use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::Utc;
use scribe_core::{RecordCounts, RecordSet};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{extract_bearer_token, AuthenticatedUser, JwtVerifier};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::rate_limit::{user_fingerprint, RateLimitMetricsSnapshot, SyncDirection, SyncRateLimiter};
use crate::store::RecordStore;

/// Full snapshots can be large; the axum default of 2 MiB is too small.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    jwt_verifier: Arc<JwtVerifier>,
    records: RecordStore,
    rate_limiter: Arc<SyncRateLimiter>,
}

impl AppState {
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        Self {
            jwt_verifier: Arc::new(JwtVerifier::new(&config)),
            records: RecordStore::new(),
            rate_limiter: Arc::new(SyncRateLimiter::from_config(&config)),
            config,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/sync", get(download).post(upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/v1", protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    rate_limit: RateLimitMetricsSnapshot,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        rate_limit: state.rate_limiter.metrics_snapshot(),
    })
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let user = state.jwt_verifier.verify_access_token(token)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
struct UploadRequest {
    data: Option<RecordSet>,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    success: bool,
    message: &'static str,
    synced: RecordCounts,
}

#[derive(Debug, Serialize)]
struct DownloadResponse {
    success: bool,
    data: RecordSet,
}

async fn upload(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    state
        .rate_limiter
        .check(SyncDirection::Upload, &user.user_id)
        .await?;

    let Json(request) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let data = request
        .data
        .ok_or_else(|| AppError::bad_request("Missing data in request body"))?;

    let synced = state.records.upsert(&user.user_id, data).await;
    tracing::info!(
        endpoint = "sync_upload",
        user = user_fingerprint(&user.user_id),
        archives = synced.archives,
        tomes = synced.tomes,
        entries = synced.entries,
        "Stored uploaded records"
    );

    Ok(Json(UploadResponse {
        success: true,
        message: "Data synced successfully",
        synced,
    }))
}

async fn download(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<DownloadResponse>, AppError> {
    state
        .rate_limiter
        .check(SyncDirection::Download, &user.user_id)
        .await?;

    let data = state.records.snapshot(&user.user_id).await;
    let counts = data.counts();
    tracing::info!(
        endpoint = "sync_download",
        user = user_fingerprint(&user.user_id),
        archives = counts.archives,
        tomes = counts.tomes,
        entries = counts.entries,
        "Served stored records"
    );

    Ok(Json(DownloadResponse {
        success: true,
        data,
    }))
}
