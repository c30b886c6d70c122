//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Auth | Description |
//! |--------|------|------|-------------|
//! | `GET`  | `/api/restaurants.json` | none | All valid records, newest first |
//! | `POST` | `/api/login` | none | `{username, password}` → `{token}` |
//! | `POST` | `/api/maps_upload` | Bearer | `{data: html}` → ingest |
//! | `GET`  | `/health` | none | Status, version, data-quality counters |
//!
//! # Error Contract
//!
//! Failures are plain-text bodies with these statuses:
//!
//! | Status | When |
//! |--------|------|
//! | 401 | missing/invalid/expired bearer token, wrong credentials |
//! | 404 | the store holds no valid records |
//! | 500 | malformed request body, missing HTML, nothing extracted, nothing new, unset secrets, storage failure |
//!
//! Malformed request bodies are reported as 500 rather than 400 to match
//! what the browser client already handles.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{extract_bearer_token, AuthError, AuthService};
use crate::blob::{self, BlobStore};
use crate::config::{Config, Secrets};
use crate::extract::Extractor;
use crate::ingest::{IngestError, Ingestor};
use crate::models::RestaurantRecord;
use crate::quality::{QualityCounters, QualitySnapshot};
use crate::store::RecordStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    store: RecordStore,
    ingestor: Arc<Ingestor>,
    auth: Arc<AuthService>,
    quality: Arc<QualityCounters>,
}

impl AppState {
    /// Wires the components over an already-opened blob store.
    pub fn new(config: &Config, secrets: Secrets, blobs: Arc<dyn BlobStore>) -> anyhow::Result<Self> {
        let quality = Arc::new(QualityCounters::new());
        let store = RecordStore::new(blobs, config.store.key.clone()).with_quality(quality.clone());
        let extractor = Arc::new(Extractor::new(config.extraction.clone())?);

        Ok(Self {
            ingestor: Arc::new(Ingestor::new(store.clone(), extractor)),
            auth: Arc::new(AuthService::new(secrets, config.auth.token_ttl_secs)),
            store,
            quality,
        })
    }
}

/// Starts the server on `[server].bind` with the configured blob backend.
///
/// Runs until the process is terminated or a shutdown signal arrives.
pub async fn run_server(config: &Config, secrets: Secrets) -> anyhow::Result<()> {
    let blobs = blob::open(&config.store)?;
    run_server_with_store(config, secrets, blobs).await
}

/// Like [`run_server`], over a caller-supplied blob store.
pub async fn run_server_with_store(
    config: &Config,
    secrets: Secrets,
    blobs: Arc<dyn BlobStore>,
) -> anyhow::Result<()> {
    let state = AppState::new(config, secrets, blobs)?;
    tracing::info!(store = %state.store.describe(), strategy = ?config.extraction.strategy, "state initialized");

    let app = router(state, config.server.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/restaurants.json", get(handle_list_restaurants))
        .route("/api/login", post(handle_login))
        .route("/api/maps_upload", post(handle_maps_upload))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

// ============ Error response ============

/// Error that renders as a status code plus a plain-text message.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, message = %self.message, "request failed");
        } else {
            tracing::info!(status = %self.status, message = %self.message, "request rejected");
        }
        (self.status, self.message).into_response()
    }
}

fn unauthorized(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::UNAUTHORIZED, message)
}

fn internal(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::INTERNAL_SERVER_ERROR, message)
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotConfigured(_) => internal(err.to_string()),
            AuthError::InvalidToken(_) => unauthorized("Unauthorized"),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        internal(err.to_string())
    }
}

/// Parses a JSON body; malformed input is a 500 per the error contract.
fn parse_body<T: for<'de> Deserialize<'de>>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| internal(format!("Malformed request body: {}", e)))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    quality: QualitySnapshot,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        quality: state.quality.snapshot(),
    })
}

// ============ GET /api/restaurants.json ============

async fn handle_list_restaurants(
    State(state): State<AppState>,
) -> Result<Json<Vec<RestaurantRecord>>, AppError> {
    let records = state
        .store
        .read_all()
        .await
        .map_err(|e| internal(format!("Failed to read restaurants: {}", e)))?;

    if records.is_empty() {
        return Err(AppError::new(StatusCode::NOT_FOUND, "No restaurants found."));
    }
    Ok(Json(records))
}

// ============ POST /api/login ============

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
}

async fn handle_login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<LoginResponse>, AppError> {
    let req: LoginRequest = parse_body(&body)?;

    if !state.auth.check_credentials(&req.username, &req.password)? {
        return Err(unauthorized("Invalid credentials"));
    }

    let session = state.auth.issue_token(&req.username)?;
    tracing::info!(username = %req.username, expires_at = ?session.expires_at(), "admin logged in");
    Ok(Json(LoginResponse {
        token: session.token,
    }))
}

// ============ POST /api/maps_upload ============

#[derive(Deserialize)]
struct UploadRequest {
    #[serde(default)]
    data: Option<String>,
}

async fn handle_maps_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<String, AppError> {
    let token = extract_bearer_token(&headers).ok_or_else(|| unauthorized("Unauthorized"))?;
    let username = state.auth.verify_token(token)?;

    let req: UploadRequest = parse_body(&body)?;
    let html = req
        .data
        .filter(|d| !d.trim().is_empty())
        .ok_or(IngestError::MissingHtml)?;

    let report = state.ingestor.ingest_html(&html).await?;
    tracing::info!(
        username = %username,
        added = report.added,
        duplicates = report.duplicates,
        dropped = report.dropped,
        "upload ingested"
    );

    Ok(format!(
        "Added {} new restaurant(s); {} already known.",
        report.added, report.duplicates
    ))
}
