//! Rate metrics derived from raw campaign counts.

use campaign_core::error::AnalyticsResult;
use campaign_core::types::{CampaignCounts, KpiMetric, KpiSet};

/// Derive a fresh `KpiSet` from validated counts.
///
/// A rate whose denominator is zero is reported as `0.0` and listed in
/// `KpiSet::undefined`; no NaN or infinity is ever produced.
pub fn compute_kpis(counts: &CampaignCounts) -> AnalyticsResult<KpiSet> {
    counts.validate()?;

    let mut undefined = Vec::new();
    let mut rate = |metric: KpiMetric, numerator: f64, denominator: u64| {
        if denominator == 0 {
            undefined.push(metric);
            0.0
        } else {
            numerator / denominator as f64
        }
    };

    let open_rate = rate(
        KpiMetric::OpenRate,
        counts.unique_opens as f64,
        counts.delivered,
    );
    let click_through_rate = rate(
        KpiMetric::ClickThroughRate,
        counts.unique_clicks as f64,
        counts.delivered,
    );
    let click_to_open_rate = rate(
        KpiMetric::ClickToOpenRate,
        counts.unique_clicks as f64,
        counts.unique_opens,
    );
    let conversion_rate = rate(
        KpiMetric::ConversionRate,
        counts.conversions as f64,
        counts.unique_clicks,
    );
    let delivery_rate = rate(KpiMetric::DeliveryRate, counts.delivered as f64, counts.sent);
    let unsubscribe_rate = rate(
        KpiMetric::UnsubscribeRate,
        counts.unsubscribes as f64,
        counts.delivered,
    );
    let revenue_per_email = rate(KpiMetric::RevenuePerEmail, counts.revenue, counts.sent);

    Ok(KpiSet {
        open_rate,
        click_through_rate,
        click_to_open_rate,
        conversion_rate,
        delivery_rate,
        unsubscribe_rate,
        revenue_per_email,
        undefined,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::error::AnalyticsError;

    fn counts() -> CampaignCounts {
        CampaignCounts {
            sent: 1000,
            delivered: 800,
            opens: 300,
            unique_opens: 200,
            clicks: 80,
            unique_clicks: 50,
            conversions: 10,
            unsubscribes: 8,
            revenue: 250.0,
            clicks_without_opens: false,
        }
    }

    #[test]
    fn test_rates_use_unique_events_over_deliveries() {
        let kpis = compute_kpis(&counts()).unwrap();
        assert!((kpis.open_rate - 0.25).abs() < 1e-12);
        assert!((kpis.click_through_rate - 0.0625).abs() < 1e-12);
        assert!((kpis.click_to_open_rate - 0.25).abs() < 1e-12);
        assert!((kpis.conversion_rate - 0.2).abs() < 1e-12);
        assert!((kpis.delivery_rate - 0.8).abs() < 1e-12);
        assert!((kpis.unsubscribe_rate - 0.01).abs() < 1e-12);
        assert!((kpis.revenue_per_email - 0.25).abs() < 1e-12);
        assert!(kpis.undefined.is_empty());
    }

    #[test]
    fn test_zero_deliveries_flag_instead_of_nan() {
        let c = CampaignCounts {
            sent: 100,
            ..Default::default()
        };
        let kpis = compute_kpis(&c).unwrap();
        assert_eq!(kpis.open_rate, 0.0);
        assert_eq!(kpis.delivery_rate, 0.0);
        assert!(!kpis.is_defined(KpiMetric::OpenRate));
        assert!(!kpis.is_defined(KpiMetric::ClickThroughRate));
        assert!(!kpis.is_defined(KpiMetric::ConversionRate));
        // sent > 0, so these have a denominator
        assert!(kpis.is_defined(KpiMetric::DeliveryRate));
        assert!(kpis.is_defined(KpiMetric::RevenuePerEmail));
        assert!(KpiMetric::ALL.iter().all(|m| kpis.value(*m).is_finite()));
    }

    #[test]
    fn test_nothing_sent_flags_everything() {
        let kpis = compute_kpis(&CampaignCounts::default()).unwrap();
        assert_eq!(kpis.undefined.len(), KpiMetric::ALL.len());
    }

    #[test]
    fn test_invalid_counts_rejected_before_deriving() {
        let c = CampaignCounts {
            delivered: 1200,
            ..counts()
        };
        assert!(matches!(
            compute_kpis(&c),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_click_to_open_is_not_ctr() {
        let kpis = compute_kpis(&counts()).unwrap();
        assert_ne!(kpis.click_to_open_rate, kpis.click_through_rate);
    }
}
