use crate::error::{AnalyticsError, AnalyticsResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Raw aggregate event counts for one campaign, variant or segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CampaignCounts {
    pub sent: u64,
    pub delivered: u64,
    pub opens: u64,
    pub unique_opens: u64,
    pub clicks: u64,
    pub unique_clicks: u64,
    pub conversions: u64,
    #[serde(default)]
    pub unsubscribes: u64,
    #[serde(default)]
    pub revenue: f64,
    /// Set by the data supplier when clicks are tracked independently of
    /// opens (image blocking, plain-text sends). Lifts `unique_clicks <= opens`.
    #[serde(default)]
    pub clicks_without_opens: bool,
}

impl CampaignCounts {
    /// Check every structural invariant. Rates are only derived from
    /// counts that pass this.
    pub fn validate(&self) -> AnalyticsResult<()> {
        if !self.revenue.is_finite() || self.revenue < 0.0 {
            return Err(AnalyticsError::invalid(format!(
                "revenue must be a finite non-negative number, got {}",
                self.revenue
            )));
        }
        ensure_le("delivered", self.delivered, "sent", self.sent)?;
        ensure_le("unique_opens", self.unique_opens, "opens", self.opens)?;
        ensure_le("unique_opens", self.unique_opens, "delivered", self.delivered)?;
        ensure_le("unique_clicks", self.unique_clicks, "clicks", self.clicks)?;
        ensure_le("unique_clicks", self.unique_clicks, "delivered", self.delivered)?;
        if !self.clicks_without_opens {
            ensure_le("unique_clicks", self.unique_clicks, "opens", self.opens)?;
        }
        ensure_le("conversions", self.conversions, "unique_clicks", self.unique_clicks)?;
        ensure_le("unsubscribes", self.unsubscribes, "delivered", self.delivered)?;
        Ok(())
    }

    /// Component-wise sum. Fails on integer overflow instead of wrapping.
    pub fn merge(&self, other: &Self) -> AnalyticsResult<Self> {
        Ok(Self {
            sent: checked_sum("sent", self.sent, other.sent)?,
            delivered: checked_sum("delivered", self.delivered, other.delivered)?,
            opens: checked_sum("opens", self.opens, other.opens)?,
            unique_opens: checked_sum("unique_opens", self.unique_opens, other.unique_opens)?,
            clicks: checked_sum("clicks", self.clicks, other.clicks)?,
            unique_clicks: checked_sum("unique_clicks", self.unique_clicks, other.unique_clicks)?,
            conversions: checked_sum("conversions", self.conversions, other.conversions)?,
            unsubscribes: checked_sum("unsubscribes", self.unsubscribes, other.unsubscribes)?,
            revenue: self.revenue + other.revenue,
            clicks_without_opens: self.clicks_without_opens || other.clicks_without_opens,
        })
    }
}

fn ensure_le(lhs: &str, lhs_value: u64, rhs: &str, rhs_value: u64) -> AnalyticsResult<()> {
    if lhs_value > rhs_value {
        return Err(AnalyticsError::invalid(format!(
            "{lhs} ({lhs_value}) exceeds {rhs} ({rhs_value})"
        )));
    }
    Ok(())
}

fn checked_sum(field: &str, a: u64, b: u64) -> AnalyticsResult<u64> {
    a.checked_add(b)
        .ok_or_else(|| AnalyticsError::invalid(format!("{field} overflows when aggregated")))
}

/// Identifies one derived KPI.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum KpiMetric {
    OpenRate,
    ClickThroughRate,
    ClickToOpenRate,
    ConversionRate,
    DeliveryRate,
    UnsubscribeRate,
    RevenuePerEmail,
}

impl KpiMetric {
    pub const ALL: [KpiMetric; 7] = [
        KpiMetric::OpenRate,
        KpiMetric::ClickThroughRate,
        KpiMetric::ClickToOpenRate,
        KpiMetric::ConversionRate,
        KpiMetric::DeliveryRate,
        KpiMetric::UnsubscribeRate,
        KpiMetric::RevenuePerEmail,
    ];

    /// Metrics compared by the improvement calculator when the caller does
    /// not name any.
    pub const IMPROVEMENT_DEFAULTS: [KpiMetric; 4] = [
        KpiMetric::OpenRate,
        KpiMetric::ClickThroughRate,
        KpiMetric::ConversionRate,
        KpiMetric::DeliveryRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KpiMetric::OpenRate => "open_rate",
            KpiMetric::ClickThroughRate => "click_through_rate",
            KpiMetric::ClickToOpenRate => "click_to_open_rate",
            KpiMetric::ConversionRate => "conversion_rate",
            KpiMetric::DeliveryRate => "delivery_rate",
            KpiMetric::UnsubscribeRate => "unsubscribe_rate",
            KpiMetric::RevenuePerEmail => "revenue_per_email",
        }
    }

    /// Revenue per email is a currency amount; every other metric is a
    /// fraction in `[0, 1]`.
    pub fn is_fraction(&self) -> bool {
        !matches!(self, KpiMetric::RevenuePerEmail)
    }
}

impl std::fmt::Display for KpiMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate-based KPIs derived from one `CampaignCounts`. Rates are raw
/// fractions, never pre-multiplied by 100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct KpiSet {
    pub open_rate: f64,
    pub click_through_rate: f64,
    pub click_to_open_rate: f64,
    pub conversion_rate: f64,
    pub delivery_rate: f64,
    pub unsubscribe_rate: f64,
    pub revenue_per_email: f64,
    /// Metrics reported as 0 because their denominator was zero.
    #[serde(default)]
    pub undefined: Vec<KpiMetric>,
}

impl KpiSet {
    pub fn value(&self, metric: KpiMetric) -> f64 {
        match metric {
            KpiMetric::OpenRate => self.open_rate,
            KpiMetric::ClickThroughRate => self.click_through_rate,
            KpiMetric::ClickToOpenRate => self.click_to_open_rate,
            KpiMetric::ConversionRate => self.conversion_rate,
            KpiMetric::DeliveryRate => self.delivery_rate,
            KpiMetric::UnsubscribeRate => self.unsubscribe_rate,
            KpiMetric::RevenuePerEmail => self.revenue_per_email,
        }
    }

    pub fn is_defined(&self, metric: KpiMetric) -> bool {
        !self.undefined.contains(&metric)
    }

    /// Check a caller-supplied set: every value finite, fractions within
    /// `[0, 1]` and revenue per email non-negative.
    pub fn validate(&self) -> AnalyticsResult<()> {
        for metric in KpiMetric::ALL {
            let value = self.value(metric);
            let in_range = if metric.is_fraction() {
                (0.0..=1.0).contains(&value)
            } else {
                value >= 0.0
            };
            if !value.is_finite() || !in_range {
                return Err(AnalyticsError::invalid(format!("{metric} out of range: {value}")));
            }
        }
        Ok(())
    }
}

/// Summed counts together with the KPIs derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct KpiSummary {
    pub totals: CampaignCounts,
    pub kpis: KpiSet,
}

/// One campaign record tagged with its audience segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SegmentRecord {
    pub segment: String,
    pub counts: CampaignCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SegmentKpis {
    pub segment: String,
    pub totals: CampaignCounts,
    pub kpis: KpiSet,
}

/// Per-segment KPIs in first-appearance order plus the all-records rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SegmentReport {
    pub segments: Vec<SegmentKpis>,
    pub overall: KpiSummary,
}

impl SegmentReport {
    pub fn get(&self, segment: &str) -> Option<&SegmentKpis> {
        self.segments.iter().find(|s| s.segment == segment)
    }
}

/// Baseline vs optimized value of one KPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MetricDelta {
    pub baseline_value: f64,
    pub optimized_value: f64,
    /// `None` when the baseline is zero.
    pub relative_change_percent: Option<f64>,
    pub absolute_change: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImprovementReport {
    pub metrics: BTreeMap<KpiMetric, MetricDelta>,
}

impl ImprovementReport {
    pub fn get(&self, metric: KpiMetric) -> Option<&MetricDelta> {
        self.metrics.get(&metric)
    }
}
