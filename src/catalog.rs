//! # Site Catalog
//!
//! Static registry mapping a storefront name to its search-endpoint template
//! and scraping metadata (CSS selectors, request headers, plausible rating
//! range).
//!
//! - Loads from a JSON file (list of site configs).
//! - Case-insensitive lookup.
//! - Unknown sites get a derived generic config so discovery results and
//!   unlisted requests still flow through the pipeline.
//! - Includes a built-in `default_seed()` with the supported storefronts,
//!   used as fallback if no config file is found.

use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

fn default_rating_range() -> (f32, f32) {
    (3.5, 5.0)
}

/// CSS selectors a production scraper plugs into its per-site extraction.
/// The core never interprets these beyond carrying them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Selectors {
    #[serde(default)]
    pub product_container: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub original_price: Option<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
    pub search_path: String,
    #[serde(default)]
    pub selectors: Selectors,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Range a missing rating is drawn from, per source.
    #[serde(default = "default_rating_range")]
    pub rating_range: (f32, f32),
}

impl SiteConfig {
    /// Full search URL for a query, with the query percent-encoded.
    pub fn search_url(&self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        format!("{}{}{}", self.base_url, self.search_path, encoded)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    sites: Vec<SiteConfig>,
}

/// Registry of storefront configurations, keyed by normalized name.
#[derive(Debug, Clone)]
pub struct SiteCatalog {
    // insertion order preserved separately for stable /sites listings
    order: Vec<String>,
    sites: HashMap<String, SiteConfig>,
}

impl SiteCatalog {
    /// Load the catalog from a JSON file.
    /// Falls back to `default_seed()` on any error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => match serde_json::from_str::<CatalogFile>(&s) {
                Ok(f) => Self::from_configs(f.sites),
                Err(_) => Self::default_seed(),
            },
            Err(_) => Self::default_seed(),
        }
    }

    pub fn from_configs(configs: Vec<SiteConfig>) -> Self {
        let mut order = Vec::with_capacity(configs.len());
        let mut sites = HashMap::with_capacity(configs.len());
        for cfg in configs {
            let key = normalize_name(&cfg.name);
            if !sites.contains_key(&key) {
                order.push(cfg.name.clone());
            }
            sites.insert(key, cfg);
        }
        Self { order, sites }
    }

    /// Case-insensitive lookup of a known storefront.
    pub fn get(&self, name: &str) -> Option<&SiteConfig> {
        self.sites.get(&normalize_name(name))
    }

    /// Config for a requested site: the registered one, or a derived
    /// generic entry for names outside the catalog.
    pub fn resolve(&self, name: &str) -> SiteConfig {
        if let Some(cfg) = self.get(name) {
            return cfg.clone();
        }
        let label = name.trim();
        SiteConfig {
            name: label.to_string(),
            base_url: format!("https://www.{}.com", normalize_name(label)),
            search_path: "/search?q=".to_string(),
            selectors: Selectors::default(),
            headers: HashMap::new(),
            rating_range: default_rating_range(),
        }
    }

    /// Canonical site name for a URL host, e.g. "www.amazon.in" -> "Amazon".
    /// Hosts matching no registered site get a label derived from the domain.
    pub fn site_for_host(&self, host: &str) -> String {
        let h = host.to_ascii_lowercase();
        for name in &self.order {
            if h.contains(&normalize_name(name)) {
                return name.clone();
            }
        }
        derive_site_label(&h)
    }

    /// Whether a URL host belongs to one of the registered storefronts.
    pub fn is_known_host(&self, host: &str) -> bool {
        let h = host.to_ascii_lowercase();
        self.order.iter().any(|name| h.contains(&normalize_name(name)))
    }

    /// Registered storefront names, in seed order.
    pub fn supported_sites(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Built-in seed with the supported storefronts and their scraping
    /// metadata. Used as fallback if no catalog file is found.
    pub fn default_seed() -> Self {
        let mut amazon_headers = HashMap::new();
        amazon_headers.insert(
            "User-Agent".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
        );

        let configs = vec![
            SiteConfig {
                name: "Amazon".into(),
                base_url: "https://www.amazon.com".into(),
                search_path: "/s?k=".into(),
                selectors: Selectors {
                    product_container: r#"[data-component-type="s-search-result"]"#.into(),
                    title: "h2 a span".into(),
                    price: ".a-price-whole".into(),
                    original_price: Some(".a-price.a-text-price .a-offscreen".into()),
                    image: ".s-image".into(),
                    rating: Some(".a-icon-alt".into()),
                    url: "h2 a".into(),
                },
                headers: amazon_headers,
                rating_range: default_rating_range(),
            },
            SiteConfig {
                name: "Flipkart".into(),
                base_url: "https://www.flipkart.com".into(),
                search_path: "/search?q=".into(),
                selectors: Selectors {
                    product_container: "._1AtVbE".into(),
                    title: "._4rR01T".into(),
                    price: "._30jeq3".into(),
                    original_price: Some("._3I9_wc".into()),
                    image: "._396cs4".into(),
                    rating: Some("._3LWZlK".into()),
                    url: "._1fQZEK".into(),
                },
                headers: HashMap::new(),
                rating_range: default_rating_range(),
            },
            SiteConfig {
                name: "Meesho".into(),
                base_url: "https://www.meesho.com".into(),
                search_path: "/search?q=".into(),
                selectors: Selectors {
                    product_container: ".ProductList__GridCol-sc-8lnc8o-0".into(),
                    title: ".NewProductCardstyled__StyledDesktopProductTitle-sc-6y2tys-5".into(),
                    price: ".NewProductCardstyled__StyledDesktopProductPrice-sc-6y2tys-6".into(),
                    original_price: None,
                    image: ".NewProductCardstyled__StyledProductImage-sc-6y2tys-2".into(),
                    rating: None,
                    url: "a".into(),
                },
                headers: HashMap::new(),
                rating_range: default_rating_range(),
            },
            SiteConfig {
                name: "Nike".into(),
                base_url: "https://www.nike.com".into(),
                search_path: "/w?q=".into(),
                selectors: Selectors {
                    product_container: ".product-card".into(),
                    title: ".product-card__title".into(),
                    price: ".product-price".into(),
                    original_price: None,
                    image: ".product-card__hero-image img".into(),
                    rating: None,
                    url: ".product-card__link-overlay".into(),
                },
                headers: HashMap::new(),
                rating_range: default_rating_range(),
            },
            SiteConfig {
                name: "Puma".into(),
                base_url: "https://in.puma.com".into(),
                search_path: "/search?q=".into(),
                selectors: Selectors {
                    product_container: ".product-tile".into(),
                    title: ".product-tile-name".into(),
                    price: ".sales .value".into(),
                    original_price: Some(".strike-through .value".into()),
                    image: ".product-image img".into(),
                    rating: None,
                    url: ".product-tile-inner a".into(),
                },
                headers: HashMap::new(),
                rating_range: default_rating_range(),
            },
            SiteConfig {
                name: "Myntra".into(),
                base_url: "https://www.myntra.com".into(),
                search_path: "/search?q=".into(),
                selectors: Selectors {
                    product_container: ".product-base".into(),
                    title: ".product-product".into(),
                    price: ".product-discountedPrice".into(),
                    original_price: Some(".product-strike".into()),
                    image: ".product-imageSliderContainer img".into(),
                    rating: Some(".product-ratingsContainer".into()),
                    url: "a".into(),
                },
                headers: HashMap::new(),
                rating_range: default_rating_range(),
            },
            SiteConfig {
                name: "Ajio".into(),
                base_url: "https://www.ajio.com".into(),
                search_path: "/search/?text=".into(),
                selectors: Selectors {
                    product_container: ".item".into(),
                    title: ".nameCls".into(),
                    price: ".price-new".into(),
                    original_price: Some(".price-old".into()),
                    image: ".imgHolder img".into(),
                    rating: None,
                    url: "a".into(),
                },
                headers: HashMap::new(),
                rating_range: default_rating_range(),
            },
            SiteConfig {
                name: "Nykaa".into(),
                base_url: "https://www.nykaa.com".into(),
                search_path: "/search/result/?q=".into(),
                selectors: Selectors {
                    product_container: ".product-listing".into(),
                    title: ".product-title".into(),
                    price: ".post-card-content-price-offer".into(),
                    original_price: Some(".post-card-content-price-original".into()),
                    image: ".product-image img".into(),
                    rating: Some(".rating-score".into()),
                    url: "a".into(),
                },
                headers: HashMap::new(),
                rating_range: default_rating_range(),
            },
        ];

        Self::from_configs(configs)
    }
}

impl Default for SiteCatalog {
    fn default() -> Self {
        Self::default_seed()
    }
}

fn normalize_name(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

/// "www.shopclues.com" -> "Shopclues"
fn derive_site_label(host: &str) -> String {
    let stripped = host.strip_prefix("www.").unwrap_or(host);
    let stem = stripped.split('.').next().unwrap_or(stripped);
    let mut chars = stem.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => "Unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let c = SiteCatalog::default_seed();
        assert!(c.get("amazon").is_some());
        assert!(c.get("AMAZON").is_some());
        assert!(c.get("Shopify").is_none());
    }

    #[test]
    fn resolve_derives_config_for_unknown_site() {
        let c = SiteCatalog::default_seed();
        let cfg = c.resolve("Shopclues");
        assert_eq!(cfg.name, "Shopclues");
        assert_eq!(cfg.base_url, "https://www.shopclues.com");
    }

    #[test]
    fn search_url_encodes_query() {
        let c = SiteCatalog::default_seed();
        let cfg = c.get("Amazon").unwrap();
        assert_eq!(
            cfg.search_url("red sneaker"),
            "https://www.amazon.com/s?k=red+sneaker"
        );
    }

    #[test]
    fn host_maps_to_canonical_site() {
        let c = SiteCatalog::default_seed();
        assert_eq!(c.site_for_host("www.amazon.in"), "Amazon");
        assert_eq!(c.site_for_host("www.flipkart.com"), "Flipkart");
        assert!(c.is_known_host("in.puma.com"));
        assert!(!c.is_known_host("www.example.com"));
        // unknown hosts derive a label instead of failing
        assert_eq!(c.site_for_host("www.shopclues.com"), "Shopclues");
    }

    #[test]
    fn file_fallback_uses_seed() {
        let c = SiteCatalog::load_from_file("does/not/exist.json");
        assert_eq!(c.supported_sites().len(), 8);
    }
}
