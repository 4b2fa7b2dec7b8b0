// src/aggregate.rs
//! Aggregation orchestrator: drives one search call through
//! fetch → normalize → merge → dedup → score → rank → truncate,
//! with a fallback branch when every real source comes up empty.
//!
//! All adapters are fetched concurrently; a single source failure never
//! aborts the call. The orchestrator is re-entrant: concurrent calls share
//! no mutable state beyond the reloadable scoring config.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::catalog::SiteCatalog;
use crate::dedup::dedup_cheapest;
use crate::fallback::FallbackGenerator;
use crate::listing::{AggregationResult, RawListing, SearchContext, SearchError};
use crate::normalize::Normalizer;
use crate::rank::rank;
use crate::score::ScoreWeights;
use crate::sources::backend::BackendApiAdapter;
use crate::sources::discovery::DiscoveryAdapter;
use crate::sources::storefront::StorefrontAdapter;
use crate::sources::{SourceAdapter, SourceError, SourceProfile};

pub const DEFAULT_DISCOVERY_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

pub const ENV_BACKEND_URL: &str = "BACKEND_URL";
pub const ENV_DISCOVERY_API_KEY: &str = "DISCOVERY_API_KEY";
pub const ENV_DISCOVERY_ENDPOINT: &str = "DISCOVERY_ENDPOINT";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "AGGREGATOR_FETCH_TIMEOUT_SECS";
pub const ENV_MAX_RESULTS: &str = "AGGREGATOR_MAX_RESULTS";

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("aggregate_runs_total", "Aggregation calls started.");
        describe_counter!(
            "aggregate_source_errors_total",
            "Source fetches that failed or timed out."
        );
        describe_counter!(
            "aggregate_dedup_total",
            "Listings removed as duplicate offers."
        );
        describe_counter!(
            "aggregate_fallback_total",
            "Calls that served synthetic fallback listings."
        );
        describe_counter!(
            "aggregate_results_total",
            "Listings returned after ranking and truncation."
        );
        describe_counter!("source_listings_total", "Raw listings parsed from sources.");
        describe_histogram!("source_parse_ms", "Source parse time in milliseconds.");
        describe_gauge!(
            "aggregate_last_run_ts",
            "Unix ts when an aggregation call last finished."
        );
    });
}

/// Explicit construction-time configuration; no module-level defaults are
/// consulted anywhere else.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Output cap after ranking.
    pub max_results: usize,
    /// Per-adapter fetch budget; a slower source counts as failed.
    pub fetch_timeout: Duration,
    /// Structured backend API; adapter is only built when set.
    pub backend_url: Option<String>,
    pub discovery_endpoint: String,
    /// Discovery adapter is only built when a key is present.
    pub discovery_api_key: Option<String>,
    /// Fixed seed for normalization/fallback randomness; tests set this for
    /// reproducible output, production leaves it `None`.
    pub rng_seed: Option<u64>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_results: 30,
            fetch_timeout: Duration::from_secs(8),
            backend_url: None,
            discovery_endpoint: DEFAULT_DISCOVERY_ENDPOINT.to_string(),
            discovery_api_key: None,
            rng_seed: None,
        }
    }
}

impl AggregatorConfig {
    /// Read the deployment knobs from the environment (after dotenv).
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var(ENV_BACKEND_URL) {
            if !v.trim().is_empty() {
                cfg.backend_url = Some(v);
            }
        }
        if let Ok(v) = std::env::var(ENV_DISCOVERY_API_KEY) {
            if !v.trim().is_empty() {
                cfg.discovery_api_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var(ENV_DISCOVERY_ENDPOINT) {
            if !v.trim().is_empty() {
                cfg.discovery_endpoint = v;
            }
        }
        if let Some(secs) = std::env::var(ENV_FETCH_TIMEOUT_SECS)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
        {
            cfg.fetch_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(n) = std::env::var(ENV_MAX_RESULTS)
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
        {
            cfg.max_results = n.max(1);
        }
        cfg
    }
}

pub struct Aggregator {
    catalog: Arc<SiteCatalog>,
    weights: Arc<RwLock<ScoreWeights>>,
    config: AggregatorConfig,
    client: reqwest::Client,
}

impl Aggregator {
    pub fn new(catalog: SiteCatalog, weights: ScoreWeights, config: AggregatorConfig) -> Self {
        Self {
            catalog: Arc::new(catalog),
            weights: Arc::new(RwLock::new(weights)),
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn catalog(&self) -> &SiteCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Effective preference weight for a site under the current scoring
    /// config.
    pub fn site_preference(&self, site: &str) -> f32 {
        self.weights
            .read()
            .expect("weights lock poisoned")
            .site_preference(site)
    }

    /// Re-read the scoring config from disk (admin surface).
    pub fn reload_weights(&self) -> anyhow::Result<()> {
        let fresh = ScoreWeights::from_toml()?;
        let mut guard = self.weights.write().expect("weights lock poisoned");
        *guard = fresh;
        Ok(())
    }

    /// Run one aggregation call against the default adapter set: one
    /// storefront scraper per distinct requested site, plus the discovery
    /// search and the backend API when configured.
    pub async fn search(&self, ctx: &SearchContext) -> Result<AggregationResult, SearchError> {
        ctx.validate()?;
        let adapters = self.build_adapters(ctx);
        Ok(self.run_with_adapters(ctx, adapters).await)
    }

    /// Same pipeline with an injected adapter set; the seam tests and
    /// alternative deployments plug into.
    pub async fn search_with_adapters(
        &self,
        ctx: &SearchContext,
        adapters: Vec<Arc<dyn SourceAdapter>>,
    ) -> Result<AggregationResult, SearchError> {
        ctx.validate()?;
        Ok(self.run_with_adapters(ctx, adapters).await)
    }

    fn build_adapters(&self, ctx: &SearchContext) -> Vec<Arc<dyn SourceAdapter>> {
        let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();

        for site in ctx.distinct_sites() {
            let cfg = self.catalog.resolve(&site);
            adapters.push(Arc::new(StorefrontAdapter::from_http(
                cfg,
                self.client.clone(),
            )));
        }

        if let Some(key) = &self.config.discovery_api_key {
            adapters.push(Arc::new(DiscoveryAdapter::from_http(
                Arc::clone(&self.catalog),
                self.config.discovery_endpoint.clone(),
                key.clone(),
                self.client.clone(),
            )));
        }

        if let Some(url) = &self.config.backend_url {
            adapters.push(Arc::new(BackendApiAdapter::new(
                url.clone(),
                self.client.clone(),
            )));
        }

        adapters
    }

    async fn run_with_adapters(
        &self,
        ctx: &SearchContext,
        adapters: Vec<Arc<dyn SourceAdapter>>,
    ) -> AggregationResult {
        ensure_metrics_described();
        counter!("aggregate_runs_total").increment(1);

        // Fetching: all adapters concurrently, each under its own timeout.
        // Results are slotted by adapter index so the rest of the pipeline
        // is independent of completion order.
        let mut set: JoinSet<(usize, SourceProfile, Result<Vec<RawListing>, SourceError>)> =
            JoinSet::new();
        for (idx, adapter) in adapters.iter().enumerate() {
            let adapter = Arc::clone(adapter);
            let ctx = ctx.clone();
            let budget = self.config.fetch_timeout;
            set.spawn(async move {
                let profile = adapter.profile();
                let result = match tokio::time::timeout(budget, adapter.fetch(&ctx)).await {
                    Ok(r) => r,
                    Err(_) => Err(SourceError::timeout(adapter.name())),
                };
                (idx, profile, result)
            });
        }

        let mut fetched: Vec<Option<(SourceProfile, Vec<RawListing>)>> =
            (0..adapters.len()).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, profile, Ok(raw))) => {
                    debug!(source = adapters[idx].name(), count = raw.len(), "source ok");
                    fetched[idx] = Some((profile, raw));
                }
                Ok((idx, _, Err(e))) => {
                    warn!(source = adapters[idx].name(), error = %e, "source failed");
                    counter!("aggregate_source_errors_total").increment(1);
                }
                Err(e) => {
                    warn!(error = ?e, "source task aborted");
                    counter!("aggregate_source_errors_total").increment(1);
                }
            }
        }

        // Normalizing + merging, in fixed adapter order.
        let mut normalizer = match self.config.rng_seed {
            Some(seed) => Normalizer::with_seed(Arc::clone(&self.catalog), seed),
            None => Normalizer::new(Arc::clone(&self.catalog)),
        };
        let mut merged = Vec::new();
        let mut next_id: u32 = 1;
        for (profile, raws) in fetched.into_iter().flatten() {
            for raw in raws {
                if let Some(listing) = normalizer.normalize(raw, next_id, profile) {
                    merged.push(listing);
                    next_id += 1;
                }
            }
        }

        // Deduplicating: same offer collapses to its cheapest instance.
        let before = merged.len();
        let mut listings = dedup_cheapest(merged);
        counter!("aggregate_dedup_total").increment((before - listings.len()) as u64);

        // Fallback branch: only when the merged, deduplicated set is empty —
        // individual source failures alone never trigger it.
        let used_fallback = listings.is_empty();
        if used_fallback {
            warn!(
                category = %ctx.category,
                sites = ctx.distinct_sites().len(),
                "all sources exhausted; serving synthetic fallback listings"
            );
            counter!("aggregate_fallback_total").increment(1);
            let mut generator = match self.config.rng_seed {
                Some(seed) => FallbackGenerator::with_seed(Arc::clone(&self.catalog), seed),
                None => FallbackGenerator::new(Arc::clone(&self.catalog)),
            };
            listings = generator.generate(ctx, next_id);
        }

        // Scoring, ranking, truncating.
        let weights = self
            .weights
            .read()
            .expect("weights lock poisoned")
            .clone();
        weights.score_all(&mut listings, ctx);
        rank(&mut listings, &weights);
        listings.truncate(self.config.max_results);

        counter!("aggregate_results_total").increment(listings.len() as u64);
        gauge!("aggregate_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

        AggregationResult {
            listings,
            used_fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_contract() {
        let cfg = AggregatorConfig::default();
        assert_eq!(cfg.max_results, 30);
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(8));
        assert!(cfg.backend_url.is_none());
        assert!(cfg.discovery_api_key.is_none());
    }
}
