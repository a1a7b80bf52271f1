//! Row-level email send records, one per recipient.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome of a single email send. Flags are cumulative: a click implies an
/// open and a conversion implies a click.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmailSendRecord {
    pub segment: String,
    /// A/B variant label (subject line version, content version, ...).
    #[serde(default)]
    pub variant: String,
    pub sent_at: DateTime<Utc>,
    #[serde(default = "default_delivered")]
    pub delivered: bool,
    #[serde(default)]
    pub opened: bool,
    #[serde(default)]
    pub clicked: bool,
    #[serde(default)]
    pub converted: bool,
    #[serde(default)]
    pub unsubscribed: bool,
    #[serde(default)]
    pub revenue: f64,
}

fn default_delivered() -> bool {
    true
}

impl EmailSendRecord {
    pub fn new(
        segment: impl Into<String>,
        variant: impl Into<String>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            segment: segment.into(),
            variant: variant.into(),
            sent_at,
            delivered: true,
            opened: false,
            clicked: false,
            converted: false,
            unsubscribed: false,
            revenue: 0.0,
        }
    }

    pub fn opened(mut self) -> Self {
        self.opened = true;
        self
    }

    pub fn clicked(mut self) -> Self {
        self.opened = true;
        self.clicked = true;
        self
    }

    pub fn converted(mut self, revenue: f64) -> Self {
        self.opened = true;
        self.clicked = true;
        self.converted = true;
        self.revenue = revenue;
        self
    }

    pub fn bounced(mut self) -> Self {
        self.delivered = false;
        self
    }
}
