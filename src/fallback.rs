// src/fallback.rs
//! Fallback generator: bounded synthetic listings used only when every real
//! source yields nothing. The output is clearly labeled via the
//! `used_fallback` flag end-to-end and flows through the same score/rank
//! path as real data, so user-visible ordering stays consistent.

use std::sync::Arc;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::catalog::SiteCatalog;
use crate::listing::{Listing, SearchContext};

const MIN_PER_SITE: u32 = 3;
const MAX_PER_SITE: u32 = 10;

pub struct FallbackGenerator {
    catalog: Arc<SiteCatalog>,
    rng: StdRng,
}

impl FallbackGenerator {
    pub fn new(catalog: Arc<SiteCatalog>) -> Self {
        Self {
            catalog,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(catalog: Arc<SiteCatalog>, seed: u64) -> Self {
        Self {
            catalog,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// 3–10 synthetic listings per requested site, prices and discounts from
    /// bounded ranges, titles templated from the query context. IDs continue
    /// from `next_id`.
    pub fn generate(&mut self, ctx: &SearchContext, mut next_id: u32) -> Vec<Listing> {
        let query = format!("{} {}", ctx.color.trim(), ctx.category.trim())
            .trim()
            .to_string();

        let mut out = Vec::new();
        for site in ctx.distinct_sites() {
            let cfg = self.catalog.resolve(&site);
            let count = self.rng.random_range(MIN_PER_SITE..=MAX_PER_SITE);
            let base_price: f64 = self.rng.random_range(50.0..550.0);

            for i in 0..count {
                let price = (base_price + self.rng.random_range(-100.0..100.0))
                    .round()
                    .max(1.0);
                let original_price = (price + self.rng.random_range(20.0..120.0)).round();
                let (lo, hi) = cfg.rating_range;

                out.push(Listing {
                    id: next_id,
                    title: format!("{} - {} Product {}", query, cfg.name, i + 1),
                    price,
                    original_price,
                    site: cfg.name.clone(),
                    image: format!("https://picsum.photos/300/300?random={next_id}"),
                    url: format!("{}/product/{}", cfg.base_url, i),
                    rating: (self.rng.random_range(lo..=hi) * 10.0).round() / 10.0,
                    available: self.rng.random_bool(0.9),
                    relevance_score: 0.0,
                });
                next_id += 1;
            }
        }
        out
    }
}
