use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::aggregate::Aggregator;
use crate::classify::{Classification, HttpClassifier, ResilientClassifier};
use crate::history::{History, HistoryEntry};
use crate::listing::{Listing, SearchContext, SearchError};

#[derive(Clone)]
pub struct AppState {
    aggregator: Arc<Aggregator>,
    history: Arc<History>,
    classifier: Arc<ResilientClassifier<HttpClassifier>>,
}

pub fn create_router(aggregator: Aggregator) -> Router {
    let classifier = aggregator
        .config()
        .backend_url
        .clone()
        .map(|url| HttpClassifier::new(url, reqwest::Client::new()));

    let state = AppState {
        aggregator: Arc::new(aggregator),
        history: Arc::new(History::with_capacity(2000)),
        classifier: Arc::new(ResilientClassifier::new(classifier)),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", post(search))
        .route("/sites", get(sites))
        .route("/analyze-image", post(analyze_image))
        .route("/debug/history", get(debug_history))
        .route("/debug/site-preference", get(debug_site_preference))
        .route("/admin/reload-scoring", get(admin_reload_scoring))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    count: usize,
    used_fallback: bool,
    listings: Vec<Listing>,
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
}

async fn search(
    State(state): State<AppState>,
    Json(ctx): Json<SearchContext>,
) -> Result<Json<SearchResponse>, (StatusCode, Json<ErrorBody>)> {
    match state.aggregator.search(&ctx).await {
        Ok(result) => {
            state.history.push(&ctx, &result);
            Ok(Json(SearchResponse {
                count: result.listings.len(),
                used_fallback: result.used_fallback,
                listings: result.listings,
            }))
        }
        Err(e @ SearchError::InvalidContext(_)) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: e.to_string(),
            }),
        )),
    }
}

async fn sites(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.aggregator.catalog().supported_sites())
}

/// Classify an uploaded image. Never fails: classifier errors degrade to the
/// last known or synthetic classification.
async fn analyze_image(State(state): State<AppState>, body: Bytes) -> Json<Classification> {
    Json(state.classifier.classify_or_fallback(&body).await)
}

async fn debug_history(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    Json(state.history.snapshot_last_n(10))
}

async fn debug_site_preference(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> String {
    let s = q.get("site").cloned().unwrap_or_default();
    let w = state.aggregator.site_preference(&s);
    format!("site='{}' -> preference={:.2}", s, w)
}

async fn admin_reload_scoring(State(state): State<AppState>) -> String {
    match state.aggregator.reload_weights() {
        Ok(()) => "reloaded".to_string(),
        Err(e) => format!("failed: {e}"),
    }
}
