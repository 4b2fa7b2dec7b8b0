// src/sources/mod.rs
//! Source adapters: independent, potentially-failing providers of raw
//! listings for a query. The orchestrator treats every variant identically
//! through [`SourceAdapter`].

pub mod backend;
pub mod discovery;
pub mod storefront;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::listing::{RawListing, SearchContext};

/// Per-adapter failure. Recovered locally by the orchestrator: a failing
/// source contributes zero listings and is never surfaced individually.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source {source_name} unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },
    #[error("source {source_name} timed out")]
    Timeout { source_name: String },
}

impl SourceError {
    pub fn unavailable(source: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unavailable {
            source_name: source.into(),
            reason: reason.to_string(),
        }
    }

    pub fn timeout(source: impl Into<String>) -> Self {
        Self::Timeout {
            source_name: source.into(),
        }
    }
}

/// Reporting quirks the normalizer needs to know about a source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceProfile {
    /// True when the source reports discounted prices only. Missing
    /// original prices then get the 20% nominal markdown baseline;
    /// otherwise original price defaults to the reported price.
    pub discounted_only: bool,
}

/// One capability: fetch candidate listings for a query.
///
/// Zero results is a valid `Ok(vec![])`, never an error. Network or parse
/// failure must be an `Err` so the orchestrator can route to fallback
/// accounting.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self, ctx: &SearchContext) -> Result<Vec<RawListing>, SourceError>;

    fn name(&self) -> &str;

    fn profile(&self) -> SourceProfile {
        SourceProfile::default()
    }
}

/// Extract the first price-looking amount from free text.
/// Handles `$1,299.00`, `₹999`, `1299 USD` and friends.
pub(crate) fn extract_price(text: &str) -> Option<f64> {
    static RE_SYMBOL: OnceCell<Regex> = OnceCell::new();
    static RE_SUFFIX: OnceCell<Regex> = OnceCell::new();

    let re_symbol = RE_SYMBOL
        .get_or_init(|| Regex::new(r"[$₹€£]\s?([\d,]+(?:\.\d+)?)").expect("price symbol regex"));
    let re_suffix = RE_SUFFIX.get_or_init(|| {
        Regex::new(r"(?i)([\d,]+(?:\.\d+)?)\s*(?:USD|INR|EUR|GBP|dollars?|rupees?)")
            .expect("price suffix regex")
    });

    let digits = re_symbol
        .captures(text)
        .or_else(|| re_suffix.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().replace(',', ""))?;

    digits.parse::<f64>().ok().filter(|p| *p > 0.0)
}

/// Lowercased host of a URL, if it parses.
pub(crate) fn host_of(raw_url: &str) -> Option<String> {
    url::Url::parse(raw_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_symbol_prices() {
        assert_eq!(extract_price("now only $89.99 today"), Some(89.99));
        assert_eq!(extract_price("₹1,299 with free shipping"), Some(1299.0));
        assert_eq!(extract_price("€45"), Some(45.0));
    }

    #[test]
    fn extracts_suffix_prices() {
        assert_eq!(extract_price("priced at 120 USD"), Some(120.0));
        assert_eq!(extract_price("2,499 rupees only"), Some(2499.0));
    }

    #[test]
    fn no_price_means_none() {
        assert_eq!(extract_price("brand new red sneaker"), None);
        assert_eq!(extract_price("$0 down payment"), None);
    }

    #[test]
    fn host_of_parses_and_lowercases() {
        assert_eq!(
            host_of("https://WWW.Amazon.com/dp/B0"),
            Some("www.amazon.com".to_string())
        );
        assert_eq!(host_of("not a url"), None);
    }
}
