//! HTTP surface of the publication service
//!
//! Endpoints:
//!   POST   /v0/publications                  publish (multipart)
//!   POST   /v0/publications/access           access (JSON) -> raw file bytes
//!   POST   /v0/publications/search           metadata search (JSON)
//!   GET    /v0/publications/{id}             public details
//!   DELETE /v0/publications/{id}             revoke (owner in x-pubseal-owner)
//!   GET    /v0/owners/{owner}/publications   owner's publications
//!   GET    /v0/owners/{owner}/stats          owner aggregate
//!   GET    /healthz, /readyz, /metrics
//!
//! Owner identity is taken from the `x-pubseal-owner` header as given;
//! authenticating it is the job of whatever fronts the daemon.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pubseal_core::{
    ErrorKind, OwnerStats, PublicationMetadata, PublicationSummary, PubsealError, SearchQuery,
};
use pubseal_service::{PublicationService, PublishRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

use crate::metrics::Metrics;

pub const OWNER_HEADER: &str = "x-pubseal-owner";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PublicationService>,
    pub metrics: Arc<Metrics>,
}

pub fn router(state: AppState, expose_metrics: bool) -> Router {
    let mut app = Router::new()
        .route("/v0/publications", post(publish_handler))
        .route("/v0/publications/access", post(access_handler))
        .route("/v0/publications/search", post(search_handler))
        .route(
            "/v0/publications/{id}",
            get(details_handler).delete(revoke_handler),
        )
        .route("/v0/owners/{owner}/publications", get(list_owned_handler))
        .route("/v0/owners/{owner}/stats", get(owner_stats_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler));
    if expose_metrics {
        app = app.route("/metrics", get(metrics_handler));
    }
    app.with_state(state)
}

// ── errors ───────────────────────────────────────────────────────────────

/// Maps service errors onto status codes. Internal details stay in the log.
#[derive(Debug)]
pub struct ApiError(PubsealError);

impl From<PubsealError> for ApiError {
    fn from(e: PubsealError) -> Self {
        Self(e)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    /// Stable machine-readable failure kind
    pub kind: String,
}

/// Wire name of each failure kind. Unknown ids and wrong secrets share
/// `access_denied`.
fn kind_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidInput => "invalid_input",
        ErrorKind::StoreUnavailable => "store_unavailable",
        ErrorKind::NotFound => "not_found",
        ErrorKind::StoreDivergence => "store_divergence",
        ErrorKind::AccessDenied => "access_denied",
        ErrorKind::Revoked => "revoked",
        ErrorKind::Integrity => "integrity",
        ErrorKind::NotOwner => "not_owner",
        ErrorKind::Internal => "internal",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let (status, message) = match kind {
            ErrorKind::InvalidInput => (StatusCode::BAD_REQUEST, self.0.to_string()),
            ErrorKind::AccessDenied | ErrorKind::NotOwner => {
                (StatusCode::FORBIDDEN, self.0.to_string())
            }
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, self.0.to_string()),
            ErrorKind::Revoked => (StatusCode::GONE, self.0.to_string()),
            ErrorKind::StoreUnavailable => {
                warn!("request failed: {}", self.0);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "content store unavailable".to_string(),
                )
            }
            ErrorKind::Integrity | ErrorKind::StoreDivergence | ErrorKind::Internal => {
                error!(kind = kind_code(kind), "request failed: {}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };
        let body = ErrorBody {
            error: message,
            kind: kind_code(kind).to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn invalid(msg: impl Into<String>) -> ApiError {
    ApiError(PubsealError::InvalidInput(msg.into()))
}

fn owner_from(headers: &HeaderMap) -> ApiResult<String> {
    headers
        .get(OWNER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| invalid(format!("missing {OWNER_HEADER} header")))
}

// ── publish ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct PublishResponse {
    pub publication_id: String,
    /// Shown once; the server keeps no copy
    pub secret: String,
    pub content_address: String,
    pub title: String,
}

async fn publish_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<PublishResponse>)> {
    let owner_id = owner_from(&headers)?;

    let mut metadata = PublicationMetadata::default();
    let mut owner_name = None;
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| invalid(format!("multipart: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| invalid(format!("reading file: {e}")))?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            "title" | "description" | "domain" | "keywords" | "owner_name" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| invalid(format!("reading {name}: {e}")))?;
                match name.as_str() {
                    "title" => metadata.title = text,
                    "description" => metadata.description = text,
                    "domain" => metadata.domain = text,
                    "keywords" => metadata.keywords = PublicationMetadata::parse_keywords(&text),
                    _ => owner_name = Some(text),
                }
            }
            other => warn!(field = other, "publish: ignoring unknown multipart field"),
        }
    }

    let (file_name, file_type, bytes) = file.ok_or_else(|| invalid("missing file field"))?;
    // Browsers send application/octet-stream when they don't know; let the
    // service guess from the name instead.
    let file_type = file_type.filter(|t| t != "application/octet-stream");

    let receipt = state
        .service
        .publish(PublishRequest {
            metadata,
            owner_id,
            owner_name,
            file_name,
            file_type,
            bytes,
        })
        .await?;
    state.metrics.publications.inc();

    Ok((
        StatusCode::CREATED,
        Json(PublishResponse {
            publication_id: receipt.publication_id.to_string(),
            secret: receipt.secret.expose().to_string(),
            content_address: receipt.content_address.to_string(),
            title: receipt.title,
        }),
    ))
}

// ── access ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessBody {
    pub publication_id: String,
    pub secret: String,
}

async fn access_handler(
    State(state): State<AppState>,
    Json(body): Json<AccessBody>,
) -> ApiResult<Response> {
    let grant = match state
        .service
        .access(&body.publication_id, &body.secret)
        .await
    {
        Ok(grant) => grant,
        Err(e) => {
            match e.kind() {
                ErrorKind::AccessDenied => {
                    state.metrics.access_denials.inc();
                }
                ErrorKind::Integrity => {
                    state.metrics.integrity_failures.inc();
                }
                _ => {}
            }
            return Err(e.into());
        }
    };
    state.metrics.accesses.inc();

    let content_type = HeaderValue::from_str(&grant.file_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        sanitize_filename(&grant.file_name)
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        grant.bytes,
    )
        .into_response())
}

/// Keep a file name safe for a quoted Content-Disposition value.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && !matches!(c, '"' | '\\' | '/')) {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim().is_empty() {
        "download".to_string()
    } else {
        cleaned
    }
}

// ── catalog ──────────────────────────────────────────────────────────────

async fn search_handler(
    State(state): State<AppState>,
    Json(query): Json<SearchQuery>,
) -> ApiResult<Json<Vec<PublicationSummary>>> {
    Ok(Json(state.service.search(&query).await?))
}

async fn details_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PublicationSummary>> {
    Ok(Json(state.service.details(&id).await?))
}

async fn revoke_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<PublicationSummary>> {
    let owner = owner_from(&headers)?;
    Ok(Json(state.service.revoke(&id, &owner).await?))
}

async fn list_owned_handler(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> ApiResult<Json<Vec<PublicationSummary>>> {
    Ok(Json(state.service.list_owned(&owner).await?))
}

async fn owner_stats_handler(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> ApiResult<Json<OwnerStats>> {
    Ok(Json(state.service.owner_stats(&owner).await?))
}

// ── probes ───────────────────────────────────────────────────────────────

/// Liveness probe: returns 200 if the process is running.
async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness probe: returns 200 if the content store is reachable, 503 otherwise.
async fn readyz_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.check_health().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(e) => {
            warn!("readiness: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "storage unreachable")
        }
    }
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            error!("metrics encode failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                e.to_string(),
            )
        }
    }
}
