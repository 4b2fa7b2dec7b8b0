// src/sources/storefront.rs
//! Per-storefront scraper adapter.
//!
//! HTTP mode fetches the site's search page and extracts embedded JSON-LD
//! `Product` records — the one structured shape most storefronts share, so
//! no per-site selector logic lives here (a production deployment plugs in
//! real per-site adapters behind the same trait). Fixture mode parses a JSON
//! array of raw listings for tests and offline runs.

use async_trait::async_trait;
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::catalog::SiteConfig;
use crate::listing::{RawListing, SearchContext};
use crate::sources::{SourceAdapter, SourceError, SourceProfile};

pub struct StorefrontAdapter {
    cfg: SiteConfig,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl StorefrontAdapter {
    /// Adapter backed by a JSON fixture: an array of `RawListing`.
    pub fn from_fixture(cfg: SiteConfig, json: &str) -> Self {
        Self {
            cfg,
            mode: Mode::Fixture(json.to_string()),
        }
    }

    pub fn from_http(cfg: SiteConfig, client: reqwest::Client) -> Self {
        Self {
            cfg,
            mode: Mode::Http { client },
        }
    }

    fn parse_fixture(&self, json: &str) -> Result<Vec<RawListing>, SourceError> {
        let listings: Vec<RawListing> = serde_json::from_str(json)
            .map_err(|e| SourceError::unavailable(&self.cfg.name, format!("fixture: {e}")))?;
        counter!("source_listings_total").increment(listings.len() as u64);
        Ok(listings)
    }

    fn parse_page(&self, body: &str) -> Vec<RawListing> {
        let t0 = std::time::Instant::now();
        let mut out = Vec::new();

        for block in json_ld_blocks(body) {
            let Ok(value) = serde_json::from_str::<serde_json::Value>(&block) else {
                continue;
            };
            collect_products(&value, &self.cfg, &mut out);
        }

        histogram!("source_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("source_listings_total").increment(out.len() as u64);
        out
    }
}

#[async_trait]
impl SourceAdapter for StorefrontAdapter {
    async fn fetch(&self, ctx: &SearchContext) -> Result<Vec<RawListing>, SourceError> {
        let query = format!("{} {}", ctx.color.trim(), ctx.category.trim());
        match &self.mode {
            Mode::Fixture(json) => self.parse_fixture(json),
            Mode::Http { client } => {
                let url = self.cfg.search_url(query.trim());
                let mut req = client.get(&url);
                for (k, v) in &self.cfg.headers {
                    req = req.header(k.as_str(), v.as_str());
                }

                let resp = req
                    .send()
                    .await
                    .map_err(|e| SourceError::unavailable(&self.cfg.name, e))?;
                if !resp.status().is_success() {
                    return Err(SourceError::unavailable(
                        &self.cfg.name,
                        format!("http status {}", resp.status()),
                    ));
                }
                let body = resp
                    .text()
                    .await
                    .map_err(|e| SourceError::unavailable(&self.cfg.name, e))?;

                // No extractable products is a valid empty result,
                // not a failure.
                Ok(self.parse_page(&body))
            }
        }
    }

    fn name(&self) -> &str {
        &self.cfg.name
    }

    fn profile(&self) -> SourceProfile {
        SourceProfile {
            discounted_only: false,
        }
    }
}

/// Contents of every `<script type="application/ld+json">` block on the page.
fn json_ld_blocks(body: &str) -> Vec<String> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
            .expect("json-ld regex")
    });
    re.captures_iter(body)
        .filter_map(|c| c.get(1).map(|m| m.as_str().trim().to_string()))
        .collect()
}

/// Walk a JSON-LD value (object, array, or @graph) collecting Product nodes.
fn collect_products(value: &serde_json::Value, cfg: &SiteConfig, out: &mut Vec<RawListing>) {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                collect_products(item, cfg, out);
            }
        }
        serde_json::Value::Object(map) => {
            if let Some(graph) = map.get("@graph") {
                collect_products(graph, cfg, out);
            }
            if is_product(map.get("@type")) {
                if let Some(listing) = product_to_listing(map, cfg) {
                    out.push(listing);
                }
            }
        }
        _ => {}
    }
}

fn is_product(ty: Option<&serde_json::Value>) -> bool {
    match ty {
        Some(serde_json::Value::String(s)) => s == "Product",
        Some(serde_json::Value::Array(items)) => {
            items.iter().any(|v| v.as_str() == Some("Product"))
        }
        _ => false,
    }
}

fn product_to_listing(
    map: &serde_json::Map<String, serde_json::Value>,
    cfg: &SiteConfig,
) -> Option<RawListing> {
    let title = map.get("name")?.as_str()?.trim().to_string();
    if title.is_empty() {
        return None;
    }

    // offers may be a single object or an array; take the first usable one
    let offers = map.get("offers")?;
    let offer = match offers {
        serde_json::Value::Array(items) => items.first()?,
        other => other,
    };

    let price = num_field(offer, "price").or_else(|| num_field(offer, "lowPrice"))?;
    if price <= 0.0 {
        return None;
    }
    let original_price = num_field(offer, "highPrice").filter(|p| *p > 0.0);

    let available = offer
        .get("availability")
        .and_then(|v| v.as_str())
        .map(|s| s.contains("InStock"));

    let rating = map
        .get("aggregateRating")
        .and_then(|r| num_field(r, "ratingValue"))
        .map(|r| r as f32);

    let image = match map.get("image") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Array(items)) => {
            items.first().and_then(|v| v.as_str()).map(String::from)
        }
        _ => None,
    };

    let url = map
        .get("url")
        .and_then(|v| v.as_str())
        .map(String::from)
        .unwrap_or_else(|| cfg.base_url.clone());

    Some(RawListing {
        title,
        price,
        original_price,
        site: cfg.name.clone(),
        image,
        url,
        rating,
        available,
    })
}

/// JSON-LD numbers frequently arrive as strings; accept both.
fn num_field(value: &serde_json::Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}
