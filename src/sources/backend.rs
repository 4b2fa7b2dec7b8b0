// src/sources/backend.rs
//! Structured backend-API adapter: the one source that already speaks the
//! raw listing shape. A thin HTTP call, everything else is serde.

use async_trait::async_trait;
use metrics::counter;

use crate::listing::{RawListing, SearchContext};
use crate::sources::{SourceAdapter, SourceError, SourceProfile};

pub const BACKEND_SOURCE_NAME: &str = "Backend";

pub struct BackendApiAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl BackendApiAdapter {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, client }
    }
}

#[async_trait]
impl SourceAdapter for BackendApiAdapter {
    async fn fetch(&self, ctx: &SearchContext) -> Result<Vec<RawListing>, SourceError> {
        let url = format!("{}/search-products", self.base_url);
        let sites = ctx.distinct_sites().join(",");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("query", ctx.category.as_str()),
                ("color", ctx.color.as_str()),
                ("sites", sites.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SourceError::unavailable(BACKEND_SOURCE_NAME, e))?;

        if !resp.status().is_success() {
            return Err(SourceError::unavailable(
                BACKEND_SOURCE_NAME,
                format!("http status {}", resp.status()),
            ));
        }

        let listings: Vec<RawListing> = resp
            .json()
            .await
            .map_err(|e| SourceError::unavailable(BACKEND_SOURCE_NAME, e))?;

        counter!("source_listings_total").increment(listings.len() as u64);
        Ok(listings)
    }

    fn name(&self) -> &str {
        BACKEND_SOURCE_NAME
    }

    fn profile(&self) -> SourceProfile {
        // The backend reports both price and original price.
        SourceProfile {
            discounted_only: false,
        }
    }
}
