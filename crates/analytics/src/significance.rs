//! Chi-square test of independence over contingency tables. The
//! two-variant A/B comparison is the 2x2 case.

use campaign_core::config::SignificanceConfig;
use campaign_core::error::{AnalyticsError, AnalyticsResult};
use campaign_core::experimentation::{
    ObservedTable, Proportion, TestMetric, TestResult, TestWarning, Variant, Winner,
    INCONCLUSIVE_LABEL,
};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Two-sided significance threshold (95% confidence). Fixed for every test.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Observed counts cross-tabulated as rows (groups) x columns (outcomes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContingencyTable {
    rows: usize,
    cols: usize,
    cells: Vec<u64>,
}

/// Chi-square statistic and its upper-tail probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChiSquareOutcome {
    pub statistic: f64,
    pub degrees_of_freedom: u32,
    pub p_value: f64,
    /// Some expected frequency was zero; the test is reported as
    /// inconclusive (statistic 0, p-value 1).
    pub degenerate: bool,
}

impl ContingencyTable {
    /// Build an r x c table. Requires at least two rows and two columns of
    /// equal length.
    pub fn new(rows: Vec<Vec<u64>>) -> AnalyticsResult<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.len() < 2 || cols < 2 {
            return Err(AnalyticsError::insufficient(
                "contingency table needs at least two rows and two columns",
            ));
        }
        if rows.iter().any(|r| r.len() != cols) {
            return Err(AnalyticsError::invalid(
                "contingency table rows must have equal length",
            ));
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// Rows = {A, B}, columns = {event occurred, did not occur}.
    pub fn two_by_two(a: Proportion, b: Proportion) -> Self {
        Self {
            rows: 2,
            cols: 2,
            cells: vec![a.successes, a.failures(), b.successes, b.failures()],
        }
    }

    /// Observed count at `(row, col)`, `None` outside the table.
    pub fn get(&self, row: usize, col: usize) -> Option<u64> {
        if row < self.rows && col < self.cols {
            Some(self.cell(row, col))
        } else {
            None
        }
    }

    fn cell(&self, row: usize, col: usize) -> u64 {
        self.cells[row * self.cols + col]
    }

    pub fn degrees_of_freedom(&self) -> u32 {
        ((self.rows - 1) * (self.cols - 1)) as u32
    }

    fn row_total(&self, row: usize) -> u128 {
        (0..self.cols).map(|c| self.cell(row, c) as u128).sum()
    }

    fn col_total(&self, col: usize) -> u128 {
        (0..self.rows).map(|r| self.cell(r, col) as u128).sum()
    }

    /// Pearson chi-square test of independence.
    ///
    /// `continuity_correction` applies Yates' correction, only when the
    /// table has one degree of freedom. Each row's contributions are summed
    /// before the rows are added, so swapping the two rows of a 2x2 table
    /// yields a bit-identical statistic.
    pub fn chi_square(&self, continuity_correction: bool) -> ChiSquareOutcome {
        let df = self.degrees_of_freedom();
        let grand_total = (0..self.rows).map(|r| self.row_total(r)).sum::<u128>() as f64;
        let col_totals: Vec<f64> = (0..self.cols).map(|c| self.col_total(c) as f64).collect();
        let yates = continuity_correction && df == 1;

        let mut row_sums = Vec::with_capacity(self.rows);
        for row in 0..self.rows {
            let row_total = self.row_total(row) as f64;
            let mut row_sum = 0.0;
            for (col, col_total) in col_totals.iter().enumerate() {
                let expected = if grand_total > 0.0 {
                    row_total * col_total / grand_total
                } else {
                    0.0
                };
                if expected == 0.0 {
                    return ChiSquareOutcome {
                        statistic: 0.0,
                        degrees_of_freedom: df,
                        p_value: 1.0,
                        degenerate: true,
                    };
                }
                let mut deviation = (self.cell(row, col) as f64 - expected).abs();
                if yates {
                    deviation = (deviation - 0.5).max(0.0);
                }
                row_sum += deviation * deviation / expected;
            }
            row_sums.push(row_sum);
        }

        let statistic: f64 = row_sums.iter().sum();
        ChiSquareOutcome {
            statistic,
            degrees_of_freedom: df,
            p_value: upper_tail_probability(statistic, df),
            degenerate: false,
        }
    }
}

/// P(X >= statistic) for X ~ chi-square(df).
pub fn upper_tail_probability(statistic: f64, df: u32) -> f64 {
    if statistic.is_nan() || statistic <= 0.0 || df == 0 {
        return 1.0;
    }
    match ChiSquared::new(df as f64) {
        Ok(dist) => dist.sf(statistic).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

/// The winner is reported by label, so labels must be distinct and must not
/// collide with the inconclusive marker.
fn check_labels(label_a: &str, label_b: &str) -> AnalyticsResult<()> {
    if let Some(label) = [label_a, label_b]
        .into_iter()
        .find(|&l| l == INCONCLUSIVE_LABEL)
    {
        return Err(AnalyticsError::invalid(format!("variant label '{label}' is reserved")));
    }
    if label_a == label_b {
        return Err(AnalyticsError::invalid(format!("both variants are labelled '{label_a}'")));
    }
    Ok(())
}

/// Compares two proportions exactly, without floating-point rounding.
fn compare_rates(a: Proportion, b: Proportion) -> Ordering {
    let lhs = a.successes as u128 * b.trials as u128;
    let rhs = b.successes as u128 * a.trials as u128;
    lhs.cmp(&rhs)
}

/// Runs chi-square A/B tests with a fixed 95% confidence threshold.
#[derive(Debug, Clone, Default)]
pub struct SignificanceTester {
    config: SignificanceConfig,
}

impl SignificanceTester {
    pub fn new(config: SignificanceConfig) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SignificanceConfig {
        &self.config
    }

    /// Compare two variants on `metric`.
    ///
    /// Fails with `InvalidInput` for malformed counts or labels that cannot
    /// identify a winner, and with `InsufficientData` for a zero sample size
    /// or more events than exposures.
    pub fn run(&self, a: &Variant, b: &Variant, metric: TestMetric) -> AnalyticsResult<TestResult> {
        check_labels(&a.label, &b.label)?;
        let pa = a.proportion(metric)?;
        let pb = b.proportion(metric)?;
        let mut result = self.compare(&a.label, pa, &b.label, pb);
        result.metric = Some(metric);
        debug!(
            metric = %metric,
            variant_a = %a.label,
            variant_b = %b.label,
            chi_square = result.chi_square_statistic,
            p_value = result.p_value,
            winner = %result.winner_label,
            "Significance test completed"
        );
        Ok(result)
    }

    /// Compare two bare proportions; the variants are labelled "A" and "B".
    pub fn test_proportions(&self, a: Proportion, b: Proportion) -> AnalyticsResult<TestResult> {
        let pa = Proportion::new(a.successes, a.trials).map_err(|e| e.context("variant A"))?;
        let pb = Proportion::new(b.successes, b.trials).map_err(|e| e.context("variant B"))?;
        Ok(self.compare("A", pa, "B", pb))
    }

    fn compare(&self, label_a: &str, a: Proportion, label_b: &str, b: Proportion) -> TestResult {
        let table = ContingencyTable::two_by_two(a, b);
        let outcome = table.chi_square(self.config.continuity_correction);

        let mut warnings = Vec::new();
        if outcome.degenerate {
            warn!(
                variant_a = label_a,
                variant_b = label_b,
                "Contingency table has a zero expected frequency, reporting inconclusive"
            );
            warnings.push(TestWarning::DegenerateTable);
        }

        let significant = outcome.p_value < SIGNIFICANCE_LEVEL;
        let winner = if !significant {
            Winner::Inconclusive
        } else {
            match compare_rates(a, b) {
                Ordering::Greater => Winner::A,
                Ordering::Less => Winner::B,
                Ordering::Equal => {
                    warn!(
                        variant_a = label_a,
                        variant_b = label_b,
                        "Significant result with equal rates"
                    );
                    warnings.push(TestWarning::SignificantTie);
                    Winner::Inconclusive
                }
            }
        };
        let winner_label = match winner {
            Winner::A => label_a.to_string(),
            Winner::B => label_b.to_string(),
            Winner::Inconclusive => INCONCLUSIVE_LABEL.to_string(),
        };

        let rate_a = a.rate();
        let rate_b = b.rate();
        let small_samples =
            a.trials < self.config.small_sample_floor && b.trials < self.config.small_sample_floor;
        let recommended_minimum_sample_size = if !significant && small_samples {
            Some(self.recommended_sample_size(rate_a, rate_b))
        } else {
            None
        };

        TestResult {
            metric: None,
            p_value: outcome.p_value,
            chi_square_statistic: outcome.statistic,
            degrees_of_freedom: outcome.degrees_of_freedom,
            significant,
            winner,
            winner_label,
            confidence_percent: ((1.0 - outcome.p_value) * 100.0).clamp(0.0, 100.0),
            recommended_minimum_sample_size,
            rate_a,
            rate_b,
            observed: ObservedTable {
                a_occurred: a.successes,
                a_not_occurred: a.failures(),
                b_occurred: b.successes,
                b_not_occurred: b.failures(),
            },
            warnings,
        }
    }

    /// Exposures per variant needed to detect the observed difference at
    /// the fixed significance level and the configured power.
    ///
    /// Uses Cohen's h, `n = ((z_alpha + z_power) / h)^2`, so the estimate
    /// strictly grows as the effect shrinks. Bounded below by the small
    /// sample floor and above by the configured cap (returned for h = 0).
    pub fn recommended_sample_size(&self, rate_a: f64, rate_b: f64) -> u64 {
        let cap = self.config.max_recommended_sample_size;
        let h = cohens_h(rate_a, rate_b).abs();
        if h == 0.0 || !h.is_finite() {
            return cap;
        }
        let (Some(z_alpha), Some(z_power)) = (
            standard_normal_quantile(1.0 - SIGNIFICANCE_LEVEL / 2.0),
            standard_normal_quantile(self.config.target_power),
        ) else {
            return cap;
        };
        let n = ((z_alpha + z_power) / h).powi(2);
        if !n.is_finite() || n >= cap as f64 {
            return cap;
        }
        (n.ceil() as u64).clamp(self.config.small_sample_floor, cap)
    }
}

/// Quantile of the standard normal distribution.
fn standard_normal_quantile(p: f64) -> Option<f64> {
    Normal::new(0.0, 1.0).ok().map(|n| n.inverse_cdf(p))
}

/// Effect size for two proportions on the arcsine scale.
pub fn cohens_h(rate_a: f64, rate_b: f64) -> f64 {
    let phi = |p: f64| 2.0 * p.clamp(0.0, 1.0).sqrt().asin();
    phi(rate_a) - phi(rate_b)
}

/// Compare two variants with the default configuration.
pub fn run_significance_test(
    variant_a: &Variant,
    variant_b: &Variant,
    metric: TestMetric,
) -> AnalyticsResult<TestResult> {
    SignificanceTester::default().run(variant_a, variant_b, metric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::types::CampaignCounts;

    fn variant(label: &str, sample_size: u64, unique_opens: u64) -> Variant {
        Variant::new(
            label,
            CampaignCounts {
                sent: sample_size,
                delivered: sample_size,
                opens: unique_opens,
                unique_opens,
                ..Default::default()
            },
            sample_size,
        )
    }

    #[test]
    fn test_clear_difference_is_significant() {
        let a = variant("A", 1000, 250);
        let b = variant("B", 1000, 300);
        let result = run_significance_test(&a, &b, TestMetric::Open).unwrap();
        assert!(result.significant);
        assert!(result.p_value < 0.05);
        assert_eq!(result.winner, Winner::B);
        assert_eq!(result.winner_label, "B");
        assert_eq!(result.degrees_of_freedom, 1);
        assert_eq!(result.metric, Some(TestMetric::Open));
        // 2 * 25^2/275 + 2 * 25^2/725
        assert!((result.chi_square_statistic - 6.2696).abs() < 1e-3);
        assert!(result.recommended_minimum_sample_size.is_none());
    }

    #[test]
    fn test_small_samples_inconclusive_with_recommendation() {
        let a = variant("A", 50, 12);
        let b = variant("B", 50, 14);
        let result = run_significance_test(&a, &b, TestMetric::Open).unwrap();
        assert!(!result.significant);
        assert_eq!(result.winner_label, INCONCLUSIVE_LABEL);
        let n = result.recommended_minimum_sample_size.unwrap();
        assert!(n > 100, "recommendation {n} should exceed the current sample");
    }

    #[test]
    fn test_identical_rates() {
        let a = variant("A", 1000, 300);
        let b = variant("B", 1000, 300);
        let result = run_significance_test(&a, &b, TestMetric::Open).unwrap();
        assert_eq!(result.chi_square_statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
        assert_eq!(result.confidence_percent, 0.0);
        assert_eq!(result.winner_label, INCONCLUSIVE_LABEL);
    }

    #[test]
    fn test_argument_order_symmetry() {
        let a = variant("Control", 1200, 310);
        let b = variant("Treatment", 900, 280);
        let ab = run_significance_test(&a, &b, TestMetric::Open).unwrap();
        let ba = run_significance_test(&b, &a, TestMetric::Open).unwrap();
        assert_eq!(ab.chi_square_statistic, ba.chi_square_statistic);
        assert_eq!(ab.p_value, ba.p_value);
        assert_eq!(ab.winner_label, ba.winner_label);
        assert_eq!(ab.winner_label, "Treatment");
    }

    #[test]
    fn test_degenerate_table_is_inconclusive() {
        // No opens anywhere: the "occurred" column total is zero.
        let a = variant("A", 40, 0);
        let b = variant("B", 60, 0);
        let result = run_significance_test(&a, &b, TestMetric::Open).unwrap();
        assert!(!result.significant);
        assert_eq!(result.p_value, 1.0);
        assert_eq!(result.chi_square_statistic, 0.0);
        assert_eq!(result.warnings, vec![TestWarning::DegenerateTable]);
    }

    #[test]
    fn test_zero_sample_size_is_insufficient() {
        let a = variant("A", 0, 0);
        let b = variant("B", 100, 10);
        assert!(matches!(
            run_significance_test(&a, &b, TestMetric::Open),
            Err(AnalyticsError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_events_above_sample_size_is_insufficient() {
        let mut a = variant("A", 100, 60);
        a.sample_size = 50;
        let b = variant("B", 100, 10);
        assert!(matches!(
            run_significance_test(&a, &b, TestMetric::Open),
            Err(AnalyticsError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_metric_selects_column() {
        let counts = |clicks: u64| CampaignCounts {
            sent: 2000,
            delivered: 2000,
            opens: 800,
            unique_opens: 800,
            clicks,
            unique_clicks: clicks,
            ..Default::default()
        };
        let a = Variant::new("A", counts(100), 2000);
        let b = Variant::new("B", counts(160), 2000);
        let opens = run_significance_test(&a, &b, TestMetric::Open).unwrap();
        let clicks = run_significance_test(&a, &b, TestMetric::Click).unwrap();
        assert_eq!(opens.chi_square_statistic, 0.0);
        assert!(clicks.significant);
        assert_eq!(clicks.winner, Winner::B);
        assert_eq!(clicks.observed.b_occurred, 160);
    }

    #[test]
    fn test_confidence_is_complement_of_p_value() {
        let tester = SignificanceTester::default();
        let result = tester
            .test_proportions(
                Proportion {
                    successes: 100,
                    trials: 1000,
                },
                Proportion {
                    successes: 120,
                    trials: 1000,
                },
            )
            .unwrap();
        assert_eq!(result.confidence_percent, (1.0 - result.p_value) * 100.0);
        assert!(!result.significant);
    }

    #[test]
    fn test_proportions_validated() {
        let tester = SignificanceTester::default();
        let bad = Proportion {
            successes: 5,
            trials: 0,
        };
        let ok = Proportion {
            successes: 5,
            trials: 10,
        };
        assert!(tester.test_proportions(bad, ok).is_err());
    }

    #[test]
    fn test_continuity_correction_shrinks_statistic() {
        let a = Proportion::new(250, 1000).unwrap();
        let b = Proportion::new(300, 1000).unwrap();
        let table = ContingencyTable::two_by_two(a, b);
        let plain = table.chi_square(false);
        let corrected = table.chi_square(true);
        assert!(corrected.statistic < plain.statistic);
        assert!(corrected.p_value > plain.p_value);
        // Correction never pushes an exact match below zero.
        let same = ContingencyTable::two_by_two(a, a).chi_square(true);
        assert_eq!(same.statistic, 0.0);
    }

    #[test]
    fn test_two_by_k_table_degrees_of_freedom() {
        let table = ContingencyTable::new(vec![vec![20, 30, 50], vec![30, 30, 40]]).unwrap();
        assert_eq!(table.degrees_of_freedom(), 2);
        let outcome = table.chi_square(true);
        // Yates is only applied at one degree of freedom.
        assert_eq!(outcome, table.chi_square(false));
        assert!(outcome.p_value > 0.0 && outcome.p_value < 1.0);
    }

    #[test]
    fn test_reserved_label_rejected() {
        let a = variant(INCONCLUSIVE_LABEL, 1000, 300);
        let b = variant("B", 1000, 250);
        let err = run_significance_test(&a, &b, TestMetric::Open).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidInput(_)));
        assert!(run_significance_test(&b, &a, TestMetric::Open).is_err());
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let a = variant("Subject", 1000, 300);
        let b = variant("Subject", 1000, 250);
        assert!(matches!(
            run_significance_test(&a, &b, TestMetric::Open),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_get_outside_table_is_none() {
        let table = ContingencyTable::new(vec![vec![20, 30, 50], vec![30, 30, 40]]).unwrap();
        assert_eq!(table.get(1, 2), Some(40));
        assert_eq!(table.get(2, 0), None);
        assert_eq!(table.get(0, 3), None);
    }

    #[test]
    fn test_table_shape_validated() {
        assert!(ContingencyTable::new(vec![vec![1, 2]]).is_err());
        assert!(ContingencyTable::new(vec![vec![1, 2], vec![3]]).is_err());
    }

    #[test]
    fn test_upper_tail_reference_values() {
        // chi-square(1) critical value at alpha = 0.05
        assert!((upper_tail_probability(3.841458820694124, 1) - 0.05).abs() < 1e-6);
        assert_eq!(upper_tail_probability(0.0, 1), 1.0);
        assert!(upper_tail_probability(1e6, 1) >= 0.0);
    }

    #[test]
    fn test_recommendation_grows_as_effect_shrinks() {
        let tester = SignificanceTester::default();
        let large = tester.recommended_sample_size(0.20, 0.30);
        let medium = tester.recommended_sample_size(0.24, 0.28);
        let small = tester.recommended_sample_size(0.25, 0.26);
        assert!(large < medium && medium < small);
        assert_eq!(
            tester.recommended_sample_size(0.3, 0.3),
            tester.config().max_recommended_sample_size
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SignificanceConfig {
            target_power: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            SignificanceTester::new(config),
            Err(AnalyticsError::Config(_))
        ));
    }
}
