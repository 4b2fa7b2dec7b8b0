// src/listing.rs
//! Canonical listing shapes shared by the source adapters and the pipeline.

use serde::{Deserialize, Serialize};

/// One normalized product offer from one source.
///
/// Instances are created fresh per aggregation call and discarded with the
/// response; `id` is only stable for the lifetime of one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: u32,
    pub title: String,
    pub price: f64,
    pub original_price: f64,
    /// Canonical storefront name. Unknown sources get a label derived
    /// from the result URL host.
    pub site: String,
    pub image: String,
    pub url: String,
    pub rating: f32,
    pub available: bool,
    /// Attached during scoring; always >= 0.
    #[serde(default)]
    pub relevance_score: f32,
}

impl Listing {
    /// Discount percentage, clamped at 0. Sources do not guarantee
    /// `price <= original_price`, and `original_price <= 0` must not divide.
    pub fn discount_pct(&self) -> f64 {
        if self.original_price <= 0.0 {
            return 0.0;
        }
        (((self.original_price - self.price) / self.original_price) * 100.0).max(0.0)
    }
}

/// Source-shaped listing as reported by one adapter, before normalization.
/// Optional fields are filled in by the normalizer with source-labeled
/// defaults, never nulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawListing {
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub original_price: Option<f64>,
    pub site: String,
    #[serde(default)]
    pub image: Option<String>,
    pub url: String,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub available: Option<bool>,
}

/// Query context for one aggregation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchContext {
    /// Product type, e.g. "Sneaker".
    pub category: String,
    /// Dominant visual attribute, e.g. "Red".
    pub color: String,
    /// Storefronts to query. Duplicates are ignored; order does not
    /// affect output ordering.
    pub sites: Vec<String>,
}

impl SearchContext {
    pub fn new(
        category: impl Into<String>,
        color: impl Into<String>,
        sites: Vec<String>,
    ) -> Self {
        Self {
            category: category.into(),
            color: color.into(),
            sites,
        }
    }

    /// Requested sites with duplicates and blank entries removed,
    /// first occurrence wins.
    pub fn distinct_sites(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::with_capacity(self.sites.len());
        for s in &self.sites {
            let t = s.trim();
            if t.is_empty() {
                continue;
            }
            if seen.insert(t.to_ascii_lowercase()) {
                out.push(t.to_string());
            }
        }
        out
    }

    /// Fail-fast validation; runs before any fetch is attempted.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.category.trim().is_empty() {
            return Err(SearchError::InvalidContext("empty category".into()));
        }
        if self.distinct_sites().is_empty() {
            return Err(SearchError::InvalidContext("no sites selected".into()));
        }
        Ok(())
    }

    /// Shopping-intent query used by the discovery source.
    pub fn discovery_query(&self) -> String {
        let color = self.color.trim();
        if color.is_empty() {
            format!("{} buy online", self.category.trim())
        } else {
            format!("{} {} buy online", color, self.category.trim())
        }
    }
}

/// The one caller-visible rejection. Per-source failures are recovered
/// inside the orchestrator and never surface individually.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("invalid search context: {0}")]
    InvalidContext(String),
}

/// Final, ranked output of one aggregation call. Never an error for
/// "no matches": an empty list is a valid result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub listings: Vec<Listing>,
    /// True when every real source came up empty and the listings are
    /// synthetic. Callers surface this as an "approximate results" hint.
    pub used_fallback: bool,
}

impl AggregationResult {
    pub fn has_results(&self) -> bool {
        !self.listings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(price: f64, original: f64) -> Listing {
        Listing {
            id: 1,
            title: "x".into(),
            price,
            original_price: original,
            site: "Amazon".into(),
            image: String::new(),
            url: String::new(),
            rating: 4.0,
            available: true,
            relevance_score: 0.0,
        }
    }

    #[test]
    fn discount_pct_clamps_negative_and_zero_original() {
        assert_eq!(listing(80.0, 100.0).discount_pct(), 20.0);
        // price above original is tolerated, discount clamps to 0
        assert_eq!(listing(120.0, 100.0).discount_pct(), 0.0);
        assert_eq!(listing(50.0, 0.0).discount_pct(), 0.0);
    }

    #[test]
    fn distinct_sites_drops_dups_and_blanks() {
        let ctx = SearchContext::new(
            "Sneaker",
            "Red",
            vec![
                "Amazon".into(),
                " amazon ".into(),
                "".into(),
                "Flipkart".into(),
            ],
        );
        assert_eq!(ctx.distinct_sites(), vec!["Amazon", "Flipkart"]);
    }

    #[test]
    fn validate_rejects_empty_category_and_empty_sites() {
        let no_sites = SearchContext::new("Sneaker", "Red", vec![]);
        assert!(no_sites.validate().is_err());

        let no_category = SearchContext::new("  ", "Red", vec!["Amazon".into()]);
        assert!(no_category.validate().is_err());

        let ok = SearchContext::new("Sneaker", "", vec!["Amazon".into()]);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn discovery_query_includes_color_when_present() {
        let ctx = SearchContext::new("Sneaker", "Red", vec!["Amazon".into()]);
        assert_eq!(ctx.discovery_query(), "Red Sneaker buy online");

        let plain = SearchContext::new("Sneaker", "", vec!["Amazon".into()]);
        assert_eq!(plain.discovery_query(), "Sneaker buy online");
    }
}
