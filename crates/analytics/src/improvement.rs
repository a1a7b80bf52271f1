//! Baseline vs optimized KPI deltas.

use campaign_core::types::{ImprovementReport, KpiMetric, KpiSet, MetricDelta};

/// Deltas for the default metric list (open, click-through, conversion,
/// delivery).
pub fn compute_improvement(baseline: &KpiSet, optimized: &KpiSet) -> ImprovementReport {
    compute_improvement_for(baseline, optimized, &KpiMetric::IMPROVEMENT_DEFAULTS)
}

/// Deltas for the caller's metric list. Each metric is independent.
pub fn compute_improvement_for(
    baseline: &KpiSet,
    optimized: &KpiSet,
    metrics: &[KpiMetric],
) -> ImprovementReport {
    ImprovementReport {
        metrics: metrics
            .iter()
            .map(|&m| (m, metric_delta(baseline.value(m), optimized.value(m))))
            .collect(),
    }
}

/// Relative change is undefined (`None`) for a zero baseline, and for a
/// baseline so small that the ratio does not fit in an `f64`.
pub fn metric_delta(baseline: f64, optimized: f64) -> MetricDelta {
    let absolute_change = optimized - baseline;
    let relative_change_percent = if baseline != 0.0 {
        Some(absolute_change / baseline * 100.0).filter(|r| r.is_finite())
    } else {
        None
    };
    MetricDelta {
        baseline_value: baseline,
        optimized_value: optimized,
        relative_change_percent,
        absolute_change,
    }
}
