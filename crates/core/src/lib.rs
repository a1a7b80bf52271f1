pub mod config;
pub mod email;
pub mod error;
pub mod experimentation;
pub mod types;

pub use config::{AppConfig, SignificanceConfig};
pub use email::EmailSendRecord;
pub use error::{AnalyticsError, AnalyticsResult};
pub use experimentation::{
    ObservedTable, Proportion, TestMetric, TestResult, TestWarning, Variant, Winner,
    INCONCLUSIVE_LABEL,
};
pub use types::{
    CampaignCounts, ImprovementReport, KpiMetric, KpiSet, KpiSummary, MetricDelta, SegmentKpis,
    SegmentRecord, SegmentReport,
};
