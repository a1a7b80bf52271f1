//! OpenAPI specification and Swagger UI configuration.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Campaign Insights API",
        version = "0.1.0",
        description = "Email campaign analytics.\n\nDerives KPIs from raw send/open/click/conversion counts, rolls them up by audience segment, and decides whether two campaign variants differ significantly (chi-square test of independence, 95% confidence).",
        license(name = "MIT"),
    ),
    tags(
        (name = "Significance", description = "A/B significance tests"),
        (name = "KPIs", description = "KPI derivation, segment rollups and improvement deltas"),
        (name = "Operations", description = "Health, readiness and liveness checks"),
    ),
    paths(
        // Significance
        crate::analytics_rest::handle_abtest,
        crate::analytics_rest::handle_significance,
        crate::analytics_rest::handle_records_abtest,
        // KPIs
        crate::analytics_rest::handle_kpis,
        crate::analytics_rest::handle_segments,
        crate::analytics_rest::handle_records_segments,
        crate::analytics_rest::handle_improvement,
        // Operations
        crate::rest::health_check,
        crate::rest::readiness,
        crate::rest::liveness,
    ),
    components(schemas(
        // Engine types
        campaign_core::types::CampaignCounts,
        campaign_core::types::KpiMetric,
        campaign_core::types::KpiSet,
        campaign_core::types::KpiSummary,
        campaign_core::types::SegmentRecord,
        campaign_core::types::SegmentKpis,
        campaign_core::types::SegmentReport,
        campaign_core::types::MetricDelta,
        campaign_core::types::ImprovementReport,
        campaign_core::email::EmailSendRecord,
        campaign_core::experimentation::TestMetric,
        campaign_core::experimentation::Variant,
        campaign_core::experimentation::Winner,
        campaign_core::experimentation::TestWarning,
        campaign_core::experimentation::ObservedTable,
        campaign_core::experimentation::TestResult,
        // Request/response types
        crate::analytics_rest::RateOrCounts,
        crate::analytics_rest::ObservedCounts,
        crate::analytics_rest::AbTestRequest,
        crate::analytics_rest::AbTestResponse,
        crate::analytics_rest::SignificanceRequest,
        crate::analytics_rest::KpiRequest,
        crate::analytics_rest::SegmentRequest,
        crate::analytics_rest::ImprovementRequest,
        crate::analytics_rest::RecordsAbTestRequest,
        crate::analytics_rest::RecordsSegmentRequest,
        // REST error/health types
        crate::rest::ErrorResponse,
        crate::rest::HealthResponse,
    ))
)]
pub struct ApiDoc;
