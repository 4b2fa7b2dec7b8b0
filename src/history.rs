//! history.rs — bounded in-memory log of recent searches for the UI history
//! list. Deliberately not persisted.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::listing::{AggregationResult, SearchContext};

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub ts_unix: u64,
    pub category: String,
    pub color: String,
    pub sites: Vec<String>,
    pub result_count: usize,
    pub used_fallback: bool,
    /// Cheapest surviving price, for the history list's "best deal" badge.
    pub best_price: Option<f64>,
}

#[derive(Debug)]
pub struct History {
    inner: Mutex<Vec<HistoryEntry>>,
    cap: usize,
}

impl History {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Vec::with_capacity(cap.min(10_000))),
            cap: cap.min(10_000),
        }
    }

    pub fn push(&self, ctx: &SearchContext, result: &AggregationResult) {
        let best_price = result
            .listings
            .iter()
            .map(|l| l.price)
            .min_by(|a, b| a.total_cmp(b));

        let entry = HistoryEntry {
            ts_unix: now_unix(),
            category: ctx.category.clone(),
            color: ctx.color.clone(),
            sites: ctx.distinct_sites(),
            result_count: result.listings.len(),
            used_fallback: result.used_fallback,
            best_price,
        };

        let mut v = self.inner.lock().expect("history mutex poisoned");
        v.push(entry);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }

    pub fn snapshot_last_n(&self, n: usize) -> Vec<HistoryEntry> {
        let v = self.inner.lock().expect("history mutex poisoned");
        let len = v.len();
        let start = len.saturating_sub(n);
        v[start..].to_vec()
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
