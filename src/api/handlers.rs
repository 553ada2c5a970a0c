//! API Handlers
//!
//! HTTP request handlers for each worker endpoint.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::models::{
    ActivateResponse, CachesResponse, FetchQuery, HealthResponse, InstallResponse, Response,
};
use crate::tasks::EventScope;
use crate::worker::Worker;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub worker: Arc<Worker>,
}

impl AppState {
    pub fn new(worker: Arc<Worker>) -> Self {
        Self { worker }
    }
}

/// Handler for GET /fetch
///
/// Resolves the described request through the router and returns the
/// response as-is. Background cache writes outlive the HTTP exchange.
pub async fn fetch_handler(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Result<axum::response::Response> {
    let scope = EventScope::new();
    let response = state.worker.fetch(query.into_request(), &scope).await?;
    debug!(pending = scope.pending(), "Fetch resolved");
    into_http(response)
}

fn into_http(response: Response) -> Result<axum::response::Response> {
    let status = StatusCode::from_u16(response.status)
        .map_err(|e| EngineError::Internal(format!("invalid status: {e}")))?;

    let mut http = axum::response::Response::new(Body::from(response.body));
    *http.status_mut() = status;
    for (name, value) in &response.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            http.headers_mut().insert(name, value);
        }
    }
    Ok(http)
}

/// Handler for POST /message
///
/// Answers `GET_VERSION` with 200; every other message is accepted with 202.
pub async fn message_handler(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> axum::response::Response {
    let scope = EventScope::new();
    match state.worker.message(payload, &scope).await {
        Some(reply) => (StatusCode::OK, Json(reply)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Handler for POST /lifecycle/install
pub async fn install_handler(State(state): State<AppState>) -> Result<Json<InstallResponse>> {
    let report = state.worker.install().await?;
    Ok(Json(InstallResponse::new(state.worker.state(), report)))
}

/// Handler for POST /lifecycle/activate
pub async fn activate_handler(State(state): State<AppState>) -> Result<Json<ActivateResponse>> {
    let report = state.worker.activate().await?;
    Ok(Json(ActivateResponse::new(state.worker.state(), report)))
}

/// Handler for GET /caches
pub async fn caches_handler(State(state): State<AppState>) -> Json<CachesResponse> {
    Json(CachesResponse {
        caches: state.worker.cache_summaries().await,
    })
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        state.worker.version(),
        state.worker.state(),
    ))
}
