//! Deal Aggregator Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the aggregation pipeline, routes and
//! metrics exporter.
//!
//! See `README.md` for quickstart.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use deal_aggregator::aggregate::{Aggregator, AggregatorConfig};
use deal_aggregator::api;
use deal_aggregator::catalog::SiteCatalog;
use deal_aggregator::metrics::Metrics;
use deal_aggregator::score::ScoreWeights;

const ENV_BIND_ADDR: &str = "BIND_ADDR";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

const ENV_SITE_CATALOG_PATH: &str = "SITE_CATALOG_PATH";
const DEFAULT_SITE_CATALOG_PATH: &str = "config/sites.json";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("deal_aggregator=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments. This enables
    // BACKEND_URL / DISCOVERY_API_KEY / SCORING_CONFIG_PATH overrides.
    let _ = dotenvy::dotenv();

    init_tracing();

    let catalog_path = std::env::var(ENV_SITE_CATALOG_PATH)
        .unwrap_or_else(|_| DEFAULT_SITE_CATALOG_PATH.to_string());
    let catalog = SiteCatalog::load_from_file(&catalog_path);
    let weights = ScoreWeights::from_toml()?;
    let config = AggregatorConfig::from_env();

    let metrics = Metrics::init(config.max_results);
    let aggregator = Aggregator::new(catalog, weights, config);
    let router = api::create_router(aggregator).merge(metrics.router());

    let addr = std::env::var(ENV_BIND_ADDR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "deal aggregator listening");
    axum::serve(listener, router).await?;

    Ok(())
}
