//! Segment aggregation. KPIs are derived per segment from summed counts.

use crate::kpi::compute_kpis;
use campaign_core::error::AnalyticsResult;
use campaign_core::types::{CampaignCounts, KpiSummary, SegmentKpis, SegmentRecord, SegmentReport};
use std::collections::HashMap;
use tracing::debug;

/// Sum a collection of counts, validating each record on the way in.
pub fn sum_counts<'a, I>(records: I) -> AnalyticsResult<CampaignCounts>
where
    I: IntoIterator<Item = &'a CampaignCounts>,
{
    records
        .into_iter()
        .enumerate()
        .try_fold(CampaignCounts::default(), |acc, (i, counts)| {
            counts
                .validate()
                .map_err(|e| e.context(format_args!("record {i}")))?;
            acc.merge(counts)
        })
}

/// Totals and KPIs for a flat collection of campaign records.
pub fn summarize<'a, I>(records: I) -> AnalyticsResult<KpiSummary>
where
    I: IntoIterator<Item = &'a CampaignCounts>,
{
    let totals = sum_counts(records)?;
    Ok(KpiSummary {
        kpis: compute_kpis(&totals)?,
        totals,
    })
}

/// Combine two summaries by summing their totals and re-deriving the KPIs.
pub fn combine(a: &KpiSummary, b: &KpiSummary) -> AnalyticsResult<KpiSummary> {
    let totals = a.totals.merge(&b.totals)?;
    Ok(KpiSummary {
        kpis: compute_kpis(&totals)?,
        totals,
    })
}

/// Group records by segment label and derive one `KpiSet` per group from
/// the group's summed counts, never from an average of per-record rates.
///
/// Segments keep the order in which they first appear. A segment whose
/// records sum to zero sends is omitted; it still counts toward `overall`
/// (where it contributes nothing).
pub fn aggregate_by_segment(records: &[SegmentRecord]) -> AnalyticsResult<SegmentReport> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, CampaignCounts)> = Vec::new();
    let mut overall = CampaignCounts::default();

    for record in records {
        record
            .counts
            .validate()
            .map_err(|e| e.context(format_args!("segment '{}'", record.segment)))?;
        overall = overall.merge(&record.counts)?;

        match index.get(record.segment.as_str()) {
            Some(&i) => {
                let (_, totals) = &mut groups[i];
                *totals = totals.merge(&record.counts)?;
            }
            None => {
                index.insert(record.segment.as_str(), groups.len());
                groups.push((record.segment.as_str(), record.counts));
            }
        }
    }

    let segments = groups
        .into_iter()
        .filter(|(_, totals)| totals.sent > 0)
        .map(|(segment, totals)| {
            Ok(SegmentKpis {
                segment: segment.to_string(),
                kpis: compute_kpis(&totals)?,
                totals,
            })
        })
        .collect::<AnalyticsResult<Vec<_>>>()?;

    debug!(
        records = records.len(),
        segments = segments.len(),
        "Aggregated campaign records by segment"
    );

    Ok(SegmentReport {
        segments,
        overall: KpiSummary {
            kpis: compute_kpis(&overall)?,
            totals: overall,
        },
    })
}
