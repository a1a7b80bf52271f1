//! A/B test inputs and results.

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::types::CampaignCounts;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Label reported when no variant wins.
pub const INCONCLUSIVE_LABEL: &str = "inconclusive";

/// Which event defines "success" in a significance test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TestMetric {
    Open,
    Click,
    Conversion,
}

impl TestMetric {
    /// Number of exposures in which the event occurred.
    pub fn occurred(&self, counts: &CampaignCounts) -> u64 {
        match self {
            TestMetric::Open => counts.unique_opens,
            TestMetric::Click => counts.unique_clicks,
            TestMetric::Conversion => counts.conversions,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestMetric::Open => "open",
            TestMetric::Click => "click",
            TestMetric::Conversion => "conversion",
        }
    }
}

impl std::fmt::Display for TestMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One arm of an A/B test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Variant {
    pub label: String,
    pub counts: CampaignCounts,
    /// Recipients exposed to this variant.
    pub sample_size: u64,
}

impl Variant {
    pub fn new(label: impl Into<String>, counts: CampaignCounts, sample_size: u64) -> Self {
        Self {
            label: label.into(),
            counts,
            sample_size,
        }
    }

    /// Reduce to the success/trial pair for `metric`, validating the counts
    /// and the exposure.
    pub fn proportion(&self, metric: TestMetric) -> AnalyticsResult<Proportion> {
        self.counts
            .validate()
            .and_then(|_| Proportion::new(metric.occurred(&self.counts), self.sample_size))
            .map_err(|e| e.context(format_args!("variant '{}'", self.label)))
    }
}

/// Successes out of trials for one arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Proportion {
    pub successes: u64,
    pub trials: u64,
}

impl Proportion {
    pub fn new(successes: u64, trials: u64) -> AnalyticsResult<Self> {
        if trials == 0 {
            return Err(AnalyticsError::insufficient("sample size must be positive"));
        }
        if successes > trials {
            return Err(AnalyticsError::insufficient(format!(
                "{successes} events exceed sample size {trials}"
            )));
        }
        Ok(Self { successes, trials })
    }

    pub fn failures(&self) -> u64 {
        self.trials - self.successes
    }

    pub fn rate(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.successes as f64 / self.trials as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    A,
    B,
    Inconclusive,
}

/// Non-fatal conditions the caller should inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TestWarning {
    /// A contingency cell had an expected frequency of zero.
    DegenerateTable,
    /// The test came out significant although both rates are equal.
    SignificantTie,
}

/// Observed 2x2 contingency table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ObservedTable {
    pub a_occurred: u64,
    pub a_not_occurred: u64,
    pub b_occurred: u64,
    pub b_not_occurred: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TestResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<TestMetric>,
    pub p_value: f64,
    pub chi_square_statistic: f64,
    pub degrees_of_freedom: u32,
    pub significant: bool,
    pub winner: Winner,
    pub winner_label: String,
    pub confidence_percent: f64,
    pub recommended_minimum_sample_size: Option<u64>,
    pub rate_a: f64,
    pub rate_b: f64,
    pub observed: ObservedTable,
    #[serde(default)]
    pub warnings: Vec<TestWarning>,
}

impl TestResult {
    pub fn is_inconclusive(&self) -> bool {
        self.winner == Winner::Inconclusive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proportion_rejects_zero_trials() {
        assert!(matches!(
            Proportion::new(0, 0),
            Err(AnalyticsError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_proportion_rejects_impossible_cell() {
        assert!(Proportion::new(11, 10).is_err());
        let p = Proportion::new(3, 12).unwrap();
        assert_eq!(p.failures(), 9);
        assert!((p.rate() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_variant_proportion_names_label() {
        let counts = CampaignCounts {
            sent: 200,
            delivered: 200,
            opens: 150,
            unique_opens: 150,
            ..Default::default()
        };
        let variant = Variant::new("Subject B", counts, 100);
        let err = variant.proportion(TestMetric::Open).unwrap_err();
        assert!(err.to_string().contains("Subject B"));
    }

    #[test]
    fn test_variant_proportion_validates_counts_first() {
        let counts = CampaignCounts {
            sent: 10,
            delivered: 20,
            ..Default::default()
        };
        let variant = Variant::new("A", counts, 10);
        assert!(matches!(
            variant.proportion(TestMetric::Open),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_metric_selects_event() {
        let counts = CampaignCounts {
            unique_opens: 5,
            unique_clicks: 3,
            conversions: 1,
            ..Default::default()
        };
        assert_eq!(TestMetric::Open.occurred(&counts), 5);
        assert_eq!(TestMetric::Click.occurred(&counts), 3);
        assert_eq!(TestMetric::Conversion.occurred(&counts), 1);
    }
}
