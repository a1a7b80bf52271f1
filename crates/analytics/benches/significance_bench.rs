//! Benchmarks for the significance tester and segment aggregator.
//! Run with: cargo bench -p campaign-analytics

use campaign_analytics::{aggregate_by_segment, SignificanceTester};
use campaign_core::experimentation::{TestMetric, Variant};
use campaign_core::types::{CampaignCounts, SegmentRecord};

fn counts(sent: u64, opens: u64) -> CampaignCounts {
    CampaignCounts {
        sent,
        delivered: sent,
        opens,
        unique_opens: opens,
        clicks: opens / 4,
        unique_clicks: opens / 4,
        conversions: opens / 20,
        revenue: (opens / 20) as f64 * 35.0,
        ..Default::default()
    }
}

fn main() {
    let tester = SignificanceTester::default();
    let variants: Vec<(Variant, Variant)> = (0..64u64)
        .map(|i| {
            (
                Variant::new("A", counts(1000 + i, 250 + i), 1000 + i),
                Variant::new("B", counts(1000 + i, 260 + 2 * i), 1000 + i),
            )
        })
        .collect();

    // Warmup
    for (a, b) in &variants {
        tester.run(a, b, TestMetric::Open).unwrap();
    }

    let iterations = 10_000u32;
    let start = std::time::Instant::now();
    for _ in 0..iterations {
        for (a, b) in &variants {
            let _ = tester.run(a, b, TestMetric::Open).unwrap();
        }
    }
    let elapsed = start.elapsed();
    let tests = iterations as f64 * variants.len() as f64;

    println!("=== Significance Benchmark ===");
    println!("Tests:       {}", tests);
    println!("Total time:  {:?}", elapsed);
    println!("Per test:    {:?}", elapsed / (iterations * variants.len() as u32));
    println!("Throughput:  {:.0} tests/sec", tests / elapsed.as_secs_f64());

    let segments = ["New User", "Loyal Customer", "Churn Risk", "High Value"];
    let records: Vec<SegmentRecord> = (0..20_000u64)
        .map(|i| SegmentRecord {
            segment: segments[(i % 4) as usize].to_string(),
            counts: counts(10 + i % 7, 3 + i % 5),
        })
        .collect();

    let start = std::time::Instant::now();
    let report = aggregate_by_segment(&records).unwrap();
    println!("=== Segment Aggregation ===");
    println!("Records:     {}", records.len());
    println!("Segments:    {}", report.segments.len());
    println!("Time:        {:?}", start.elapsed());
}
