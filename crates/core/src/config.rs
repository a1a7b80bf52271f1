use crate::error::{AnalyticsError, AnalyticsResult};
use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `CAMPAIGN_INSIGHTS__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub significance: SignificanceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Tuning for the significance tester. The 0.05 decision threshold is an
/// engine constant, not a setting.
#[derive(Debug, Clone, Deserialize)]
pub struct SignificanceConfig {
    /// Exposures per variant below which an inconclusive test carries a
    /// recommended sample size.
    #[serde(default = "default_small_sample_floor")]
    pub small_sample_floor: u64,
    /// Statistical power targeted by the sample-size heuristic.
    #[serde(default = "default_target_power")]
    pub target_power: f64,
    /// Upper bound on the recommendation, used when the observed effect is zero.
    #[serde(default = "default_max_recommended_sample_size")]
    pub max_recommended_sample_size: u64,
    /// Apply Yates' continuity correction to 2x2 tables.
    #[serde(default)]
    pub continuity_correction: bool,
}

// Default functions
fn default_node_id() -> String {
    "insights-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_small_sample_floor() -> u64 {
    100
}
fn default_target_power() -> f64 {
    0.8
}
fn default_max_recommended_sample_size() -> u64 {
    1_000_000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for SignificanceConfig {
    fn default() -> Self {
        Self {
            small_sample_floor: default_small_sample_floor(),
            target_power: default_target_power(),
            max_recommended_sample_size: default_max_recommended_sample_size(),
            continuity_correction: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            significance: SignificanceConfig::default(),
        }
    }
}

impl SignificanceConfig {
    pub fn validate(&self) -> AnalyticsResult<()> {
        if !(self.target_power > 0.0 && self.target_power < 1.0) {
            return Err(AnalyticsError::Config(format!(
                "target_power must lie strictly between 0 and 1, got {}",
                self.target_power
            )));
        }
        if self.small_sample_floor == 0 {
            return Err(AnalyticsError::Config(
                "small_sample_floor must be positive".to_string(),
            ));
        }
        if self.max_recommended_sample_size < self.small_sample_floor {
            return Err(AnalyticsError::Config(
                "max_recommended_sample_size must not be below small_sample_floor".to_string(),
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("CAMPAIGN_INSIGHTS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert_eq!(config.api.http_port, 8080);
        assert_eq!(config.significance.small_sample_floor, 100);
        assert!(!config.significance.continuity_correction);
        assert!(config.significance.validate().is_ok());
    }

    #[test]
    fn test_rejects_power_outside_unit_interval() {
        let config = SignificanceConfig {
            target_power: 1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AnalyticsError::Config(_))));
    }

    #[test]
    fn test_rejects_cap_below_floor() {
        let config = SignificanceConfig {
            small_sample_floor: 500,
            max_recommended_sample_size: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
