//! bayhook webhook receiver.
//!
//! Main entry point. Loads configuration, wires the authenticator and the
//! BigQuery client into the HTTP server, and serves until shutdown.

use std::sync::Arc;

use anyhow::{Context, Result};
use bayhook_api::{AppState, Authenticator, Config};
use bayhook_core::RealClock;
use bayhook_warehouse::{BigQueryClient, MetadataServerToken, StaticToken, TokenSource};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    init_tracing(&config.rust_log)?;

    info!("Starting bayhook webhook receiver");
    info!(
        server_addr = %format!("{}:{}", config.host, config.port),
        auth_strategy = %config.auth_strategy,
        destination = %config.table(),
        api_url = %config.bigquery_api_url,
        "Configuration loaded"
    );

    let authenticator = Authenticator::from_config(&config);
    if !authenticator.is_configured() {
        warn!(
            variable = config.auth_strategy.secret_variable(),
            "Authentication secret not set, every webhook will be answered with 500"
        );
    }

    let tokens = create_token_source(&config)?;
    let warehouse = BigQueryClient::new(config.to_bigquery_config(), tokens)
        .context("Failed to create BigQuery client")?;
    info!(insert_url = %warehouse.insert_url(), "BigQuery client ready");

    let state = AppState::new(
        authenticator,
        Arc::new(warehouse),
        Arc::new(RealClock::new()),
        config.request_timeout(),
    );

    let addr = config.parse_server_addr()?;
    bayhook_api::start_server(state, addr).await.context("Server failed")?;

    info!("bayhook shutdown complete");
    Ok(())
}

/// Initializes tracing. `RUST_LOG` wins over the configured default.
fn init_tracing(default_filter: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .context("Invalid log filter")?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    Ok(())
}

/// Picks the access token source: a provisioned token if one is configured,
/// otherwise the metadata server.
fn create_token_source(config: &Config) -> Result<Arc<dyn TokenSource>> {
    if let Some(token) = config.static_access_token() {
        info!("Using provisioned BigQuery access token");
        return Ok(Arc::new(StaticToken::new(token)));
    }

    info!(metadata_url = %config.metadata_url, "Using metadata server for access tokens");
    let source = MetadataServerToken::new(&config.metadata_url, config.warehouse_timeout())
        .context("Failed to create metadata token source")?;
    Ok(Arc::new(source))
}
