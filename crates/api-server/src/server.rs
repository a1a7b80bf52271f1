//! API server: the HTTP analytics surface and the Prometheus exporter.

use crate::analytics_rest;
use crate::rest::{self, AppState};
use crate::swagger::ApiDoc;
use axum::routing::{get, post};
use axum::Router;
use campaign_analytics::SignificanceTester;
use campaign_core::config::AppConfig;
use std::net::SocketAddr;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Build the full router over `state`. Exposed so tests can drive it
/// without binding a socket.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Significance testing
        .route("/v1/abtest", post(analytics_rest::handle_abtest))
        .route("/v1/significance", post(analytics_rest::handle_significance))
        .route("/v1/records/ab-test", post(analytics_rest::handle_records_abtest))
        // KPIs
        .route("/v1/kpis", post(analytics_rest::handle_kpis))
        .route("/v1/segments", post(analytics_rest::handle_segments))
        .route("/v1/records/segments", post(analytics_rest::handle_records_segments))
        .route("/v1/improvement", post(analytics_rest::handle_improvement))
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, tester: SignificanceTester) -> Self {
        let state = AppState::new(config.node_id.clone(), tester);
        Self { config, state }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router()).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
