//! Folding row-level email send records into aggregate counts.

use campaign_core::email::EmailSendRecord;
use campaign_core::error::{AnalyticsError, AnalyticsResult};
use campaign_core::experimentation::{TestMetric, Variant};
use campaign_core::types::{CampaignCounts, SegmentRecord};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Counts contributed by one send. A click without an open, a conversion
/// without a click, or engagement on an undelivered email is malformed.
fn record_counts(record: &EmailSendRecord) -> AnalyticsResult<CampaignCounts> {
    if record.clicked && !record.opened {
        return Err(AnalyticsError::invalid("clicked without being opened"));
    }
    if record.converted && !record.clicked {
        return Err(AnalyticsError::invalid("converted without a click"));
    }
    if !record.delivered && (record.opened || record.unsubscribed) {
        return Err(AnalyticsError::invalid("engagement recorded on an undelivered email"));
    }
    let counts = CampaignCounts {
        sent: 1,
        delivered: record.delivered as u64,
        opens: record.opened as u64,
        unique_opens: record.opened as u64,
        clicks: record.clicked as u64,
        unique_clicks: record.clicked as u64,
        conversions: record.converted as u64,
        unsubscribes: record.unsubscribed as u64,
        revenue: record.revenue,
        clicks_without_opens: false,
    };
    counts.validate()?;
    Ok(counts)
}

/// Sum row-level records into one `CampaignCounts`.
pub fn fold_records<'a, I>(records: I) -> AnalyticsResult<CampaignCounts>
where
    I: IntoIterator<Item = &'a EmailSendRecord>,
{
    records
        .into_iter()
        .enumerate()
        .try_fold(CampaignCounts::default(), |acc, (i, record)| {
            let counts = record_counts(record).map_err(|e| e.context(format_args!("record {i}")))?;
            acc.merge(&counts)
        })
}

/// Records sent within `[start, end)`. A missing bound is open.
pub fn filter_sent_between(
    records: &[EmailSendRecord],
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<&EmailSendRecord> {
    records
        .iter()
        .filter(|r| start.map_or(true, |s| r.sent_at >= s))
        .filter(|r| end.map_or(true, |e| r.sent_at < e))
        .collect()
}

/// Group records by `key`, keeping first-appearance order.
fn group_by<'a, F>(
    records: &[&'a EmailSendRecord],
    key: F,
) -> Vec<(&'a str, Vec<&'a EmailSendRecord>)>
where
    F: Fn(&'a EmailSendRecord) -> &'a str,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&EmailSendRecord>)> = Vec::new();
    for &record in records {
        let label = key(record);
        match index.get(label) {
            Some(&i) => groups[i].1.push(record),
            None => {
                index.insert(label, groups.len());
                groups.push((label, vec![record]));
            }
        }
    }
    groups
}

/// Per-segment counts, ready for the segment aggregator.
pub fn segment_records(records: &[&EmailSendRecord]) -> AnalyticsResult<Vec<SegmentRecord>> {
    group_by(records, |r| r.segment.as_str())
        .into_iter()
        .map(|(segment, rows)| {
            Ok(SegmentRecord {
                segment: segment.to_string(),
                counts: fold_records(rows)?,
            })
        })
        .collect()
}

/// Build the two variants of an A/B test from row-level records.
///
/// Records are grouped by `variant` label; the first label seen is A. The
/// exposed population depends on the metric: delivered emails for opens,
/// openers for clicks, clickers for conversions.
pub fn variants_from_records(
    records: &[&EmailSendRecord],
    metric: TestMetric,
) -> AnalyticsResult<(Variant, Variant)> {
    let groups = group_by(records, |r| r.variant.as_str());
    if groups.len() != 2 {
        return Err(AnalyticsError::insufficient(format!(
            "an A/B test needs exactly two variants, found {}",
            groups.len()
        )));
    }

    let exposed = |r: &EmailSendRecord| match metric {
        TestMetric::Open => r.delivered,
        TestMetric::Click => r.opened,
        TestMetric::Conversion => r.clicked,
    };

    let mut variants = groups.into_iter().map(|(label, rows)| {
        let counts = fold_records(rows.iter().copied())?;
        let sample_size = rows.iter().filter(|r| exposed(r)).count() as u64;
        Ok::<_, AnalyticsError>(Variant::new(label, counts, sample_size))
    });

    match (variants.next(), variants.next()) {
        (Some(a), Some(b)) => Ok((a?, b?)),
        _ => Err(AnalyticsError::insufficient("an A/B test needs exactly two variants")),
    }
}
