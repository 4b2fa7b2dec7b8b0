// src/classify.rs
//! Image-classifier collaborator: out-of-scope ML, in-scope degradation
//! policy. Any classifier failure resolves to the last known classification
//! or a synthetic default; a raw transport error never reaches the caller.

use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What the classifier says about an uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub color: String,
    /// In `[0, 1]`.
    pub confidence: f32,
}

impl Classification {
    /// Synthetic stand-in used when nothing better is known.
    pub fn synthetic() -> Self {
        Self {
            category: "Product".to_string(),
            color: "Black".to_string(),
            confidence: 0.0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ImageClassifier: Send + Sync {
    async fn classify(&self, image: &[u8]) -> Result<Classification, ClassifyError>;
}

/// Wrapper applying the degradation policy: remember the last good
/// classification, fall back to it (or the synthetic default) on failure.
pub struct ResilientClassifier<C> {
    inner: Option<C>,
    last_known: RwLock<Option<Classification>>,
}

impl<C: ImageClassifier> ResilientClassifier<C> {
    pub fn new(inner: Option<C>) -> Self {
        Self {
            inner,
            last_known: RwLock::new(None),
        }
    }

    /// Never fails: classifier output, else last known, else synthetic.
    pub async fn classify_or_fallback(&self, image: &[u8]) -> Classification {
        if let Some(classifier) = &self.inner {
            match classifier.classify(image).await {
                Ok(c) => {
                    *self.last_known.write().expect("classifier lock poisoned") = Some(c.clone());
                    return c;
                }
                Err(e) => {
                    warn!(error = %e, "image classification failed; using fallback");
                }
            }
        }
        self.last_known
            .read()
            .expect("classifier lock poisoned")
            .clone()
            .unwrap_or_else(Classification::synthetic)
    }
}

/// HTTP classifier speaking the analyze-image backend protocol.
pub struct HttpClassifier {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireClassification {
    product_category: String,
    dominant_color: WireColor,
    #[serde(default)]
    confidence: f32,
}

/// Backends report the dominant color either as a name or a raw RGB triple.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireColor {
    Name(String),
    Rgb([u8; 3]),
}

impl HttpClassifier {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, client }
    }
}

#[async_trait]
impl ImageClassifier for HttpClassifier {
    async fn classify(&self, image: &[u8]) -> Result<Classification, ClassifyError> {
        let url = format!("{}/analyze-image", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| ClassifyError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ClassifyError::Unavailable(format!(
                "http status {}",
                resp.status()
            )));
        }

        let wire: WireClassification = resp
            .json()
            .await
            .map_err(|e| ClassifyError::Unavailable(e.to_string()))?;

        Ok(Classification {
            category: map_to_product_category(&wire.product_category),
            color: match wire.dominant_color {
                WireColor::Name(name) => name,
                WireColor::Rgb([r, g, b]) => color_name_from_rgb(r, g, b).to_string(),
            },
            confidence: wire.confidence.clamp(0.0, 1.0),
        })
    }
}

/// Map raw classifier labels (ImageNet-style) to e-commerce product
/// categories.
pub fn map_to_product_category(label: &str) -> String {
    const MAPPINGS: &[(&str, &str)] = &[
        ("running_shoe", "Sneaker"),
        ("sneaker", "Sneaker"),
        ("sandal", "Sandal"),
        ("boot", "Boot"),
        ("shoe", "Shoe"),
        ("jersey", "T-Shirt"),
        ("sweatshirt", "Sweatshirt"),
        ("cardigan", "Cardigan"),
        ("suit", "Suit"),
        ("jean", "Jeans"),
        ("miniskirt", "Skirt"),
        ("cellular_telephone", "Smartphone"),
        ("laptop", "Laptop"),
        ("notebook", "Laptop"),
        ("desktop_computer", "Desktop"),
        ("monitor", "Monitor"),
        ("mouse", "Mouse"),
        ("keyboard", "Keyboard"),
        ("headphone", "Headphones"),
        ("sunglasses", "Sunglasses"),
        ("watch", "Watch"),
        ("backpack", "Backpack"),
        ("purse", "Handbag"),
        ("wallet", "Wallet"),
    ];

    let lower = label.to_ascii_lowercase();
    for (key, category) in MAPPINGS {
        if lower.contains(key) {
            return (*category).to_string();
        }
    }

    if ["shirt", "cloth", "wear"].iter().any(|w| lower.contains(w)) {
        "T-Shirt".to_string()
    } else if ["phone", "mobile", "cell"].iter().any(|w| lower.contains(w)) {
        "Smartphone".to_string()
    } else if ["computer", "laptop"].iter().any(|w| lower.contains(w)) {
        "Laptop".to_string()
    } else {
        "Product".to_string()
    }
}

/// Bucket an RGB triple into a coarse color name.
pub fn color_name_from_rgb(r: u8, g: u8, b: u8) -> &'static str {
    if r > 200 && g > 200 && b > 200 {
        "White"
    } else if r < 50 && g < 50 && b < 50 {
        "Black"
    } else if r > 150 && g > 150 && b < 100 {
        "Yellow"
    } else if r > 150 && g < 100 && b > 150 {
        "Purple"
    } else if r > 150 && g > 100 && b < 100 {
        "Orange"
    } else if r > g && r > b {
        "Red"
    } else if g > r && g > b {
        "Green"
    } else if b > r && b > g {
        "Blue"
    } else {
        "Gray"
    }
}
