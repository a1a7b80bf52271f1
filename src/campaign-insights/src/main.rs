//! Campaign Insights — email campaign analytics and A/B significance service.
//!
//! Main entry point: parses the CLI, loads configuration and serves the API.

use campaign_analytics::SignificanceTester;
use campaign_api::ApiServer;
use campaign_core::config::AppConfig;
use clap::Parser;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "campaign-insights")]
#[command(about = "Email campaign KPIs, segment rollups and A/B significance testing")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "CAMPAIGN_INSIGHTS__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "CAMPAIGN_INSIGHTS__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Prometheus exporter port (overrides config)
    #[arg(long, env = "CAMPAIGN_INSIGHTS__METRICS__PORT")]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "campaign_insights=info,campaign_api=info,tower_http=info".into()
            }),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Campaign Insights starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }

    let tester = SignificanceTester::new(config.significance.clone()).unwrap_or_else(|e| {
        warn!(error = %e, "Invalid significance settings, using defaults");
        SignificanceTester::default()
    });

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        small_sample_floor = tester.config().small_sample_floor,
        target_power = tester.config().target_power,
        continuity_correction = tester.config().continuity_correction,
        "Configuration loaded"
    );

    let api_server = ApiServer::new(config, tester);

    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Campaign Insights is ready to serve traffic");

    // Blocks until shutdown
    api_server.start_http().await?;

    Ok(())
}
