//! Shared state, error responses and operational endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use campaign_analytics::SignificanceTester;
use campaign_core::error::AnalyticsError;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};
use utoipa::ToSchema;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub node_id: String,
    pub start_time: Instant,
    pub tester: Arc<SignificanceTester>,
}

impl AppState {
    pub fn new(node_id: impl Into<String>, tester: SignificanceTester) -> Self {
        Self {
            node_id: node_id.into(),
            start_time: Instant::now(),
            tester: Arc::new(tester),
        }
    }
}

/// Error body returned with every 4xx/5xx response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
    pub version: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// 400 with the given message. Counted as a validation error.
pub fn bad_request(endpoint: &'static str, message: impl Into<String>) -> ApiError {
    let message = message.into();
    warn!(endpoint, error = %message, "Request validation failed");
    metrics::counter!("analytics.api.validation_errors", "endpoint" => endpoint).increment(1);
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message }))
}

/// Map an engine error to a response: caller mistakes are 400, anything
/// else is a 500 whose detail stays in the logs.
pub fn engine_error(endpoint: &'static str, err: AnalyticsError) -> ApiError {
    if err.is_client_error() {
        return bad_request(endpoint, err.to_string());
    }
    error!(endpoint, error = %err, "Analytics request failed");
    metrics::counter!("analytics.api.errors", "endpoint" => endpoint).increment(1);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal processing error".to_string(),
        }),
    )
}

/// Unwrap an extracted JSON body, turning a malformed body (missing field,
/// negative count, wrong type) into a 400 `{ error }` response.
pub fn parse_body<T>(
    endpoint: &'static str,
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    metrics::counter!("analytics.api.requests", "endpoint" => endpoint).increment(1);
    body.map(|Json(value)| value)
        .map_err(|rejection| bad_request(endpoint, rejection.body_text()))
}

/// GET /health — Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Operations",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /ready — Readiness check. Ready once the tester holds a valid
/// configuration.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Operations",
    responses(
        (status = 200, description = "Ready to accept traffic"),
        (status = 503, description = "Not ready"),
    )
)]
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.tester.config().validate().is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /live — Liveness check.
#[utoipa::path(
    get,
    path = "/live",
    tag = "Operations",
    responses((status = 200, description = "Process is alive"))
)]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
