// src/score.rs
//! Relevance scoring: a composite, non-negative quality/fit metric combining
//! text match, rating, discount, availability, and site preference.
//!
//! All signal weights and the ranker's tie thresholds are tunable
//! configuration, not load-bearing invariants. They load from
//! `config/scoring.toml` (path overridable via `SCORING_CONFIG_PATH`), with
//! compiled-in defaults matching observed behavior.

use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};
use tracing::info;

use crate::listing::{Listing, SearchContext};

pub const DEFAULT_SCORING_CONFIG_PATH: &str = "config/scoring.toml";
pub const ENV_SCORING_CONFIG_PATH: &str = "SCORING_CONFIG_PATH";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Exact category substring found in the title.
    pub category_exact: f32,
    /// Each category word longer than `category_word_min_chars` found in
    /// the title, per word (stacks with the exact-match bonus).
    pub category_word: f32,
    pub category_word_min_chars: usize,
    /// Exact color substring found in the title.
    pub color_exact: f32,
    /// Per rating point above neutral, floored at 0, capped at `rating_cap`.
    pub rating_per_point: f32,
    pub rating_neutral: f32,
    pub rating_cap: f32,
    /// Per discount percentage point, capped at `discount_cap`.
    pub discount_per_pct: f32,
    pub discount_cap: f32,
    /// Flat bonus for in-stock listings.
    pub availability: f32,
    /// Static per-site preference; unlisted sites contribute 0.
    pub site_preference: HashMap<String, f32>,
    /// Ranker: relevance difference below this is a near-tie.
    pub relevance_tie_threshold: f32,
    /// Ranker: discount-percentage difference below this is a near-tie.
    pub discount_tie_threshold: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        let mut site_preference = HashMap::new();
        for (site, w) in [
            ("Amazon", 0.3f32),
            ("Flipkart", 0.2),
            ("Nike", 0.2),
            ("Myntra", 0.1),
            ("Puma", 0.1),
        ] {
            site_preference.insert(site.to_string(), w);
        }
        Self {
            category_exact: 5.0,
            category_word: 2.0,
            category_word_min_chars: 3,
            color_exact: 3.0,
            rating_per_point: 0.5,
            rating_neutral: 3.0,
            rating_cap: 1.0,
            discount_per_pct: 0.02,
            discount_cap: 1.0,
            availability: 0.5,
            site_preference,
            relevance_tie_threshold: 0.5,
            discount_tie_threshold: 5.0,
        }
    }
}

impl ScoreWeights {
    /// Load from the configured TOML path; falls back to defaults when the
    /// file is absent. A present-but-broken file is an error, not a silent
    /// fallback.
    pub fn from_toml() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_SCORING_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_SCORING_CONFIG_PATH.to_string());
        let path = Path::new(&path);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading scoring config from {}", path.display()))?;
        let w: Self = toml::from_str(&s)
            .with_context(|| format!("parsing scoring config {}", path.display()))?;
        info!(path = %path.display(), "scoring config loaded");
        Ok(w)
    }

    /// Preference weight for a site, case-insensitive; unlisted sites get 0.
    pub fn site_preference(&self, site: &str) -> f32 {
        self.site_preference
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(site))
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }

    /// Deal-quality/relevance score for one listing in the query context.
    /// Always >= 0.
    pub fn score(&self, listing: &Listing, ctx: &SearchContext) -> f32 {
        let title = listing.title.to_lowercase();
        let category = ctx.category.trim().to_lowercase();
        let color = ctx.color.trim().to_lowercase();

        let mut score = 0.0f32;

        if !category.is_empty() && title.contains(&category) {
            score += self.category_exact;
        }
        for word in category.split_whitespace() {
            if word.chars().count() >= self.category_word_min_chars && title.contains(word) {
                score += self.category_word;
            }
        }
        if !color.is_empty() && title.contains(&color) {
            score += self.color_exact;
        }

        score += ((listing.rating - self.rating_neutral) * self.rating_per_point)
            .clamp(0.0, self.rating_cap);

        score += ((listing.discount_pct() as f32) * self.discount_per_pct).min(self.discount_cap);

        if listing.available {
            score += self.availability;
        }

        score += self.site_preference(&listing.site);

        score.max(0.0)
    }

    /// Attach relevance scores to a batch in place.
    pub fn score_all(&self, listings: &mut [Listing], ctx: &SearchContext) {
        for l in listings.iter_mut() {
            l.relevance_score = self.score(l, ctx);
        }
    }
}
