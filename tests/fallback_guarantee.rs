// tests/fallback_guarantee.rs
use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use deal_aggregator::aggregate::{Aggregator, AggregatorConfig};
use deal_aggregator::catalog::SiteCatalog;
use deal_aggregator::listing::{RawListing, SearchContext};
use deal_aggregator::rank;
use deal_aggregator::score::ScoreWeights;
use deal_aggregator::sources::{SourceAdapter, SourceError};

struct AlwaysDown(&'static str);

#[async_trait]
impl SourceAdapter for AlwaysDown {
    async fn fetch(&self, _ctx: &SearchContext) -> Result<Vec<RawListing>, SourceError> {
        Err(SourceError::unavailable(self.0, "503 service unavailable"))
    }
    fn name(&self) -> &str {
        self.0
    }
}

fn aggregator(seed: u64) -> Aggregator {
    Aggregator::new(
        SiteCatalog::default_seed(),
        ScoreWeights::default(),
        AggregatorConfig {
            rng_seed: Some(seed),
            ..Default::default()
        },
    )
}

fn all_down() -> Vec<Arc<dyn SourceAdapter>> {
    vec![Arc::new(AlwaysDown("Amazon")), Arc::new(AlwaysDown("Flipkart"))]
}

#[tokio::test]
async fn every_source_failing_still_returns_results() {
    let ctx = SearchContext::new("Sneaker", "Red", vec!["Amazon".into(), "Flipkart".into()]);
    let result = aggregator(11)
        .search_with_adapters(&ctx, all_down())
        .await
        .unwrap();

    assert!(result.used_fallback);
    assert!(result.has_results());
    // 3-10 synthetic listings per requested site
    assert!(result.listings.len() >= 6);
    assert!(result.listings.len() <= 20);
}

#[tokio::test]
async fn fallback_listings_come_from_the_requested_sites() {
    let ctx = SearchContext::new("Sneaker", "Red", vec!["Amazon".into(), "Flipkart".into()]);
    let result = aggregator(12)
        .search_with_adapters(&ctx, all_down())
        .await
        .unwrap();

    for l in &result.listings {
        assert!(l.site == "Amazon" || l.site == "Flipkart", "site {}", l.site);
        assert!(l.relevance_score >= 0.0);
    }
}

#[tokio::test]
async fn fallback_output_respects_the_ranking_contract() {
    let ctx = SearchContext::new("Sneaker", "Red", vec!["Amazon".into(), "Flipkart".into()]);
    let result = aggregator(13)
        .search_with_adapters(&ctx, all_down())
        .await
        .unwrap();

    let weights = ScoreWeights::default();
    for pair in result.listings.windows(2) {
        assert_ne!(
            rank::compare(&pair[0], &pair[1], &weights),
            Ordering::Greater,
            "adjacent listings out of order"
        );
    }
}

#[tokio::test]
async fn fallback_respects_the_output_cap() {
    // enough requested sites that 3-10 synthetic listings each would
    // overflow the cap
    let sites: Vec<String> = [
        "Amazon", "Flipkart", "Meesho", "Nike", "Puma", "Myntra", "Ajio", "Nykaa",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let adapters: Vec<Arc<dyn SourceAdapter>> = sites
        .iter()
        .map(|_| Arc::new(AlwaysDown("down")) as Arc<dyn SourceAdapter>)
        .collect();

    let ctx = SearchContext::new("Sneaker", "Red", sites);
    let result = aggregator(14)
        .search_with_adapters(&ctx, adapters)
        .await
        .unwrap();

    assert!(result.used_fallback);
    assert!(result.listings.len() <= 30);
}
