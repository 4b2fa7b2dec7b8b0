// tests/pipeline_smoke.rs
use std::sync::Arc;

use async_trait::async_trait;
use deal_aggregator::aggregate::{Aggregator, AggregatorConfig};
use deal_aggregator::catalog::SiteCatalog;
use deal_aggregator::listing::{RawListing, SearchContext};
use deal_aggregator::score::ScoreWeights;
use deal_aggregator::sources::{SourceAdapter, SourceError};

struct StaticAdapter {
    name: &'static str,
    listings: Vec<RawListing>,
}

#[async_trait]
impl SourceAdapter for StaticAdapter {
    async fn fetch(&self, _ctx: &SearchContext) -> Result<Vec<RawListing>, SourceError> {
        Ok(self.listings.clone())
    }
    fn name(&self) -> &str {
        self.name
    }
}

fn raw(site: &str, title: &str, price: f64) -> RawListing {
    RawListing {
        title: title.into(),
        price,
        original_price: None,
        site: site.into(),
        image: None,
        url: format!("https://{}/p/{}", site.to_lowercase(), price),
        rating: Some(4.0),
        available: Some(true),
    }
}

fn aggregator() -> Aggregator {
    Aggregator::new(
        SiteCatalog::default_seed(),
        ScoreWeights::default(),
        AggregatorConfig {
            rng_seed: Some(7),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn comparable_relevance_ranks_cheaper_site_first() {
    // One "Red Sneaker" per site: Amazon at 89.99, Flipkart at 79.99.
    // Relevance differs only by site preference (0.1 apart, within the
    // near-tie threshold), so the lower price must win.
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(StaticAdapter {
            name: "Amazon",
            listings: vec![raw("Amazon", "Red Sneaker Classic", 89.99)],
        }),
        Arc::new(StaticAdapter {
            name: "Flipkart",
            listings: vec![raw("Flipkart", "Red Sneaker Classic", 79.99)],
        }),
    ];

    let ctx = SearchContext::new("Sneaker", "Red", vec!["Amazon".into(), "Flipkart".into()]);
    let result = aggregator()
        .search_with_adapters(&ctx, adapters)
        .await
        .unwrap();

    assert_eq!(result.listings.len(), 2);
    assert!(!result.used_fallback);
    assert_eq!(result.listings[0].site, "Flipkart");
    assert_eq!(result.listings[0].price, 79.99);
    assert_eq!(result.listings[1].site, "Amazon");
}

#[tokio::test]
async fn one_failing_source_never_aborts_the_call() {
    struct FailingAdapter;

    #[async_trait]
    impl SourceAdapter for FailingAdapter {
        async fn fetch(&self, _ctx: &SearchContext) -> Result<Vec<RawListing>, SourceError> {
            Err(SourceError::unavailable("Amazon", "connection refused"))
        }
        fn name(&self) -> &str {
            "Amazon"
        }
    }

    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(FailingAdapter),
        Arc::new(StaticAdapter {
            name: "Flipkart",
            listings: vec![raw("Flipkart", "Red Sneaker", 49.0)],
        }),
    ];

    let ctx = SearchContext::new("Sneaker", "Red", vec!["Amazon".into(), "Flipkart".into()]);
    let result = aggregator()
        .search_with_adapters(&ctx, adapters)
        .await
        .unwrap();

    // the surviving source's listing is served as real data
    assert_eq!(result.listings.len(), 1);
    assert!(!result.used_fallback);
    assert_eq!(result.listings[0].site, "Flipkart");
}

#[tokio::test]
async fn scores_are_attached_and_non_negative() {
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(StaticAdapter {
        name: "Amazon",
        listings: vec![
            raw("Amazon", "Red Sneaker Deluxe", 60.0),
            raw("Amazon", "Completely Unrelated Widget", 10.0),
        ],
    })];

    let ctx = SearchContext::new("Sneaker", "Red", vec!["Amazon".into()]);
    let result = aggregator()
        .search_with_adapters(&ctx, adapters)
        .await
        .unwrap();

    assert_eq!(result.listings.len(), 2);
    for l in &result.listings {
        assert!(l.relevance_score >= 0.0);
    }
    // the matching title must outrank the unrelated one despite its price
    assert_eq!(result.listings[0].title, "Red Sneaker Deluxe");
}

#[tokio::test]
async fn empty_sources_without_failure_still_fall_back() {
    // Adapters that succeed with zero listings leave the merged set empty;
    // the fallback branch serves synthetic data in that case too.
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(StaticAdapter {
        name: "Amazon",
        listings: vec![],
    })];

    let ctx = SearchContext::new("Sneaker", "Red", vec!["Amazon".into()]);
    let result = aggregator()
        .search_with_adapters(&ctx, adapters)
        .await
        .unwrap();

    assert!(result.used_fallback);
    assert!(result.has_results());
}
