// src/rank.rs
//! Ranker: total-orders the deduplicated, scored set.
//!
//! Three tiers, primary to tertiary:
//! 1. relevance score descending — decisive only when the absolute
//!    difference exceeds the configured near-tie threshold;
//! 2. discount percentage descending — decisive only beyond its threshold;
//! 3. price ascending as the final deterministic tie-break.
//!
//! This is deliberately NOT a plain `sort by (score, price)` key: score
//! noise within the threshold must not override a better deal.

use std::cmp::Ordering;

use crate::listing::Listing;
use crate::score::ScoreWeights;

/// `Less` means `a` ranks before `b`.
pub fn compare(a: &Listing, b: &Listing, weights: &ScoreWeights) -> Ordering {
    let rel_diff = a.relevance_score - b.relevance_score;
    if rel_diff.abs() > weights.relevance_tie_threshold {
        // higher relevance first
        return if rel_diff > 0.0 {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }

    let discount_diff = a.discount_pct() - b.discount_pct();
    if discount_diff.abs() > weights.discount_tie_threshold {
        // deeper discount first
        return if discount_diff > 0.0 {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }

    a.price.total_cmp(&b.price)
}

/// Sort in place per the three-tier contract.
///
/// The threshold comparator is not transitive across chained near-ties, so
/// std's sort (which rejects non-total orders) cannot be used; a stable
/// insertion sort keeps the result deterministic for a given input order.
/// Lists here are small (pre-truncation, a few hundred at most).
pub fn rank(listings: &mut Vec<Listing>, weights: &ScoreWeights) {
    for i in 1..listings.len() {
        let mut j = i;
        while j > 0 && compare(&listings[j - 1], &listings[j], weights) == Ordering::Greater {
            listings.swap(j - 1, j);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(score: f32, price: f64, original: f64) -> Listing {
        Listing {
            id: 0,
            title: String::new(),
            price,
            original_price: original,
            site: String::new(),
            image: String::new(),
            url: String::new(),
            rating: 4.0,
            available: true,
            relevance_score: score,
        }
    }

    #[test]
    fn clear_relevance_gap_wins() {
        let w = ScoreWeights::default();
        let mut v = vec![listing(5.0, 10.0, 10.0), listing(8.0, 99.0, 99.0)];
        rank(&mut v, &w);
        assert_eq!(v[0].relevance_score, 8.0);
    }

    #[test]
    fn near_tie_falls_through_to_discount() {
        let w = ScoreWeights::default();
        // scores within 0.5 of each other; b has a 20% discount
        let a = listing(10.4, 100.0, 100.0);
        let b = listing(10.0, 120.0, 150.0);
        let mut v = vec![a, b];
        rank(&mut v, &w);
        // a naive sort-by-score would put the 10.4 first; the deal wins
        assert_eq!(v[0].relevance_score, 10.0);
    }

    #[test]
    fn near_tie_on_both_falls_through_to_price() {
        let w = ScoreWeights::default();
        let a = listing(10.2, 89.99, 89.99);
        let b = listing(10.0, 79.99, 79.99);
        let mut v = vec![a, b];
        rank(&mut v, &w);
        assert_eq!(v[0].price, 79.99);
    }

    #[test]
    fn discount_gap_must_exceed_threshold() {
        let w = ScoreWeights::default();
        // 4 percentage points apart: not decisive, price decides
        let a = listing(10.0, 96.0, 100.0); // 4% off
        let b = listing(10.0, 98.0, 106.5); // ~8% off
        let mut v = vec![b.clone(), a.clone()];
        rank(&mut v, &w);
        assert_eq!(v[0].price, 96.0);
    }

    #[test]
    fn negative_discount_ranks_as_zero() {
        let w = ScoreWeights::default();
        // price above original: discount clamps to 0, not below
        let a = listing(10.0, 50.0, 40.0);
        let b = listing(10.0, 49.0, 49.0);
        let mut v = vec![a, b];
        rank(&mut v, &w);
        assert_eq!(v[0].price, 49.0);
    }

    #[test]
    fn rank_is_deterministic_for_equal_inputs() {
        let w = ScoreWeights::default();
        let items = vec![
            listing(10.0, 50.0, 60.0),
            listing(10.3, 45.0, 45.0),
            listing(9.8, 70.0, 140.0),
            listing(3.0, 5.0, 5.0),
        ];
        let mut a = items.clone();
        let mut b = items;
        rank(&mut a, &w);
        rank(&mut b, &w);
        assert_eq!(a, b);
    }
}
