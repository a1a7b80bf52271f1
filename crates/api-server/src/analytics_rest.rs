//! Campaign analytics REST endpoints: KPIs, segment rollups, improvement
//! deltas and A/B significance tests.

use crate::format::{format_fraction_as_percent, format_p_value, format_percent};
use crate::rest::{bad_request, engine_error, parse_body, ApiError, AppState};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use campaign_analytics::records::{filter_sent_between, segment_records, variants_from_records};
use campaign_analytics::{
    aggregate_by_segment, compute_improvement, compute_improvement_for, summarize,
};
use campaign_core::email::EmailSendRecord;
use campaign_core::error::{AnalyticsError, AnalyticsResult};
use campaign_core::experimentation::{Proportion, TestMetric, TestResult, Variant};
use campaign_core::types::{
    CampaignCounts, ImprovementReport, KpiMetric, KpiSet, KpiSummary, SegmentRecord, SegmentReport,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

const NO_DATA: &str = "No data provided. Please supply at least one record.";

fn default_metric() -> TestMetric {
    TestMetric::Open
}

fn record_significant(endpoint: &'static str, result: &TestResult) {
    if result.significant {
        metrics::counter!("analytics.api.significant_results", "endpoint" => endpoint).increment(1);
    }
}

// ---------------------------------------------------------------------------
// POST /v1/abtest
// ---------------------------------------------------------------------------

/// One side of the compatibility A/B request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum RateOrCounts {
    /// Observed rate as a percentage, `12.5` meaning 12.5 %.
    Rate(f64),
    Counts(ObservedCounts),
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ObservedCounts {
    pub successes: u64,
    /// Overrides the request-level sample size for this variant.
    #[serde(default)]
    pub sample_size: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AbTestRequest {
    pub variant_a: Option<RateOrCounts>,
    pub variant_b: Option<RateOrCounts>,
    pub sample_size: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AbTestResponse {
    /// Four-decimal p-value.
    pub p_value: String,
    pub significant: bool,
    /// Variant with the higher observed rate.
    pub winner: String,
    /// `(1 - p) * 100` with two decimals and a trailing `%`.
    pub confidence: String,
    pub rate_a: String,
    pub rate_b: String,
}

impl RateOrCounts {
    fn to_proportion(&self, sample_size: Option<u64>) -> AnalyticsResult<Proportion> {
        let (successes, trials) = match self {
            RateOrCounts::Rate(percent) => {
                let trials = sample_size
                    .ok_or_else(|| AnalyticsError::insufficient("sample_size is required"))?;
                if !percent.is_finite() || !(0.0..=100.0).contains(percent) {
                    return Err(AnalyticsError::invalid(format!(
                        "rate must be a percentage between 0 and 100, got {percent}"
                    )));
                }
                ((percent / 100.0 * trials as f64).round() as u64, trials)
            }
            RateOrCounts::Counts(counts) => {
                let trials = counts
                    .sample_size
                    .or(sample_size)
                    .ok_or_else(|| AnalyticsError::insufficient("sample_size is required"))?;
                (counts.successes, trials)
            }
        };
        Proportion::new(successes, trials)
    }
}

/// POST /v1/abtest — Two-variant chi-square test over rates or counts.
#[utoipa::path(
    post,
    path = "/v1/abtest",
    tag = "Significance",
    request_body = AbTestRequest,
    responses(
        (status = 200, description = "Test computed", body = AbTestResponse),
        (status = 400, description = "Missing input or bad sample size", body = ErrorResponse),
    )
)]
pub async fn handle_abtest(
    State(state): State<AppState>,
    body: Result<Json<AbTestRequest>, JsonRejection>,
) -> Result<Json<AbTestResponse>, ApiError> {
    const ENDPOINT: &str = "abtest";
    let request = parse_body(ENDPOINT, body)?;

    let (Some(variant_a), Some(variant_b)) = (request.variant_a, request.variant_b) else {
        return Err(bad_request(ENDPOINT, "Missing required fields: variant_a and variant_b"));
    };
    let sample_size = match request.sample_size {
        Some(n) if n <= 0 => {
            return Err(bad_request(ENDPOINT, "sample_size must be a positive integer"));
        }
        Some(n) => Some(n as u64),
        None => None,
    };

    let pa = variant_a
        .to_proportion(sample_size)
        .map_err(|e| engine_error(ENDPOINT, e.context("variant_a")))?;
    let pb = variant_b
        .to_proportion(sample_size)
        .map_err(|e| engine_error(ENDPOINT, e.context("variant_b")))?;

    let result = state
        .tester
        .test_proportions(pa, pb)
        .map_err(|e| engine_error(ENDPOINT, e))?;
    record_significant(ENDPOINT, &result);

    let winner = if result.rate_b > result.rate_a { "B" } else { "A" };
    Ok(Json(AbTestResponse {
        p_value: format_p_value(result.p_value),
        significant: result.significant,
        winner: winner.to_string(),
        confidence: format_percent(result.confidence_percent),
        rate_a: format_fraction_as_percent(result.rate_a),
        rate_b: format_fraction_as_percent(result.rate_b),
    }))
}

// ---------------------------------------------------------------------------
// POST /v1/significance
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignificanceRequest {
    pub variant_a: Variant,
    pub variant_b: Variant,
    #[serde(default = "default_metric")]
    pub metric: TestMetric,
}

/// POST /v1/significance — Chi-square test between two labelled variants.
#[utoipa::path(
    post,
    path = "/v1/significance",
    tag = "Significance",
    request_body = SignificanceRequest,
    responses(
        (status = 200, description = "Test computed", body = TestResult),
        (status = 400, description = "Malformed counts or insufficient data", body = ErrorResponse),
    )
)]
pub async fn handle_significance(
    State(state): State<AppState>,
    body: Result<Json<SignificanceRequest>, JsonRejection>,
) -> Result<Json<TestResult>, ApiError> {
    const ENDPOINT: &str = "significance";
    let request = parse_body(ENDPOINT, body)?;
    let result = state
        .tester
        .run(&request.variant_a, &request.variant_b, request.metric)
        .map_err(|e| engine_error(ENDPOINT, e))?;
    record_significant(ENDPOINT, &result);
    Ok(Json(result))
}

// ---------------------------------------------------------------------------
// POST /v1/kpis
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct KpiRequest {
    pub records: Vec<CampaignCounts>,
}

/// POST /v1/kpis — Sum the records and derive one KPI set.
#[utoipa::path(
    post,
    path = "/v1/kpis",
    tag = "KPIs",
    request_body = KpiRequest,
    responses(
        (status = 200, description = "Totals and derived KPIs", body = KpiSummary),
        (status = 400, description = "Malformed counts", body = ErrorResponse),
    )
)]
pub async fn handle_kpis(
    body: Result<Json<KpiRequest>, JsonRejection>,
) -> Result<Json<KpiSummary>, ApiError> {
    const ENDPOINT: &str = "kpis";
    let request = parse_body(ENDPOINT, body)?;
    if request.records.is_empty() {
        return Err(bad_request(ENDPOINT, NO_DATA));
    }
    summarize(&request.records)
        .map(Json)
        .map_err(|e| engine_error(ENDPOINT, e))
}

// ---------------------------------------------------------------------------
// POST /v1/segments
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct SegmentRequest {
    pub records: Vec<SegmentRecord>,
}

/// POST /v1/segments — Per-segment KPIs plus the overall rollup.
#[utoipa::path(
    post,
    path = "/v1/segments",
    tag = "KPIs",
    request_body = SegmentRequest,
    responses(
        (status = 200, description = "Segment report", body = SegmentReport),
        (status = 400, description = "Malformed counts", body = ErrorResponse),
    )
)]
pub async fn handle_segments(
    body: Result<Json<SegmentRequest>, JsonRejection>,
) -> Result<Json<SegmentReport>, ApiError> {
    const ENDPOINT: &str = "segments";
    let request = parse_body(ENDPOINT, body)?;
    if request.records.is_empty() {
        return Err(bad_request(ENDPOINT, NO_DATA));
    }
    aggregate_by_segment(&request.records)
        .map(Json)
        .map_err(|e| engine_error(ENDPOINT, e))
}

// ---------------------------------------------------------------------------
// POST /v1/improvement
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImprovementRequest {
    pub baseline: KpiSet,
    pub optimized: KpiSet,
    /// Metrics to compare; open, click-through, conversion and delivery
    /// rates when omitted.
    #[serde(default)]
    pub metrics: Option<Vec<KpiMetric>>,
}

/// POST /v1/improvement — Relative and absolute change per metric.
#[utoipa::path(
    post,
    path = "/v1/improvement",
    tag = "KPIs",
    request_body = ImprovementRequest,
    responses(
        (status = 200, description = "Per-metric deltas", body = ImprovementReport),
        (status = 400, description = "Metric out of range", body = ErrorResponse),
    )
)]
pub async fn handle_improvement(
    body: Result<Json<ImprovementRequest>, JsonRejection>,
) -> Result<Json<ImprovementReport>, ApiError> {
    const ENDPOINT: &str = "improvement";
    let request = parse_body(ENDPOINT, body)?;
    request
        .baseline
        .validate()
        .map_err(|e| engine_error(ENDPOINT, e.context("baseline")))?;
    request
        .optimized
        .validate()
        .map_err(|e| engine_error(ENDPOINT, e.context("optimized")))?;
    let report = match &request.metrics {
        Some(metrics) => compute_improvement_for(&request.baseline, &request.optimized, metrics),
        None => compute_improvement(&request.baseline, &request.optimized),
    };
    Ok(Json(report))
}

// ---------------------------------------------------------------------------
// Row-level records
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordsAbTestRequest {
    pub records: Vec<EmailSendRecord>,
    #[serde(default = "default_metric")]
    pub metric: TestMetric,
    /// Inclusive lower bound on `sent_at`.
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `sent_at`.
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

/// POST /v1/records/ab-test — A/B test over per-email send records,
/// grouped by their `variant` label.
#[utoipa::path(
    post,
    path = "/v1/records/ab-test",
    tag = "Significance",
    request_body = RecordsAbTestRequest,
    responses(
        (status = 200, description = "Test computed", body = TestResult),
        (status = 400, description = "Malformed records or variants", body = ErrorResponse),
    )
)]
pub async fn handle_records_abtest(
    State(state): State<AppState>,
    body: Result<Json<RecordsAbTestRequest>, JsonRejection>,
) -> Result<Json<TestResult>, ApiError> {
    const ENDPOINT: &str = "records_abtest";
    let request = parse_body(ENDPOINT, body)?;
    if request.records.is_empty() {
        return Err(bad_request(ENDPOINT, NO_DATA));
    }

    let window = filter_sent_between(&request.records, request.start, request.end);
    let (a, b) = variants_from_records(&window, request.metric)
        .map_err(|e| engine_error(ENDPOINT, e))?;
    let result = state
        .tester
        .run(&a, &b, request.metric)
        .map_err(|e| engine_error(ENDPOINT, e))?;
    record_significant(ENDPOINT, &result);

    info!(
        records = window.len(),
        metric = %request.metric,
        winner = %result.winner_label,
        "Record-level A/B test completed"
    );
    Ok(Json(result))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordsSegmentRequest {
    pub records: Vec<EmailSendRecord>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

/// POST /v1/records/segments — Segment report over per-email send records.
#[utoipa::path(
    post,
    path = "/v1/records/segments",
    tag = "KPIs",
    request_body = RecordsSegmentRequest,
    responses(
        (status = 200, description = "Segment report", body = SegmentReport),
        (status = 400, description = "Malformed records", body = ErrorResponse),
    )
)]
pub async fn handle_records_segments(
    body: Result<Json<RecordsSegmentRequest>, JsonRejection>,
) -> Result<Json<SegmentReport>, ApiError> {
    const ENDPOINT: &str = "records_segments";
    let request = parse_body(ENDPOINT, body)?;
    if request.records.is_empty() {
        return Err(bad_request(ENDPOINT, NO_DATA));
    }
    let window = filter_sent_between(&request.records, request.start, request.end);
    segment_records(&window)
        .and_then(|segments| aggregate_by_segment(&segments))
        .map(Json)
        .map_err(|e| engine_error(ENDPOINT, e))
}
