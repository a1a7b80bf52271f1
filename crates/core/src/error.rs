use thiserror::Error;

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// Counts that violate a `CampaignCounts` invariant.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A test that cannot be computed from the supplied exposures.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AnalyticsError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn insufficient(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }

    /// Prefix the message with where the error occurred, keeping the variant.
    pub fn context(self, location: impl std::fmt::Display) -> Self {
        match self {
            Self::InvalidInput(msg) => Self::InvalidInput(format!("{location}: {msg}")),
            Self::InsufficientData(msg) => Self::InsufficientData(format!("{location}: {msg}")),
            other => other,
        }
    }

    /// Whether the caller can fix this by correcting the request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::InsufficientData(_))
    }
}
