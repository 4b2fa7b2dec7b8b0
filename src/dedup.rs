// src/dedup.rs
//! Deduplicator: collapses listings that represent the same offer,
//! keeping the cheaper instance. Key is `(site, normalized title)`.

use std::collections::BTreeMap;

use crate::listing::Listing;

/// Dedup key: canonical site + trimmed, lowercased title.
pub fn dedup_key(listing: &Listing) -> (String, String) {
    (
        listing.site.to_ascii_lowercase(),
        listing.title.trim().to_lowercase(),
    )
}

/// Collapse duplicate offers, keeping the lower price. Fields of the losing
/// listing are discarded entirely, no merging. Input order never decides the
/// winner: price does, with the URL as a deterministic tie-break for exact
/// price ties. Idempotent.
pub fn dedup_cheapest(listings: Vec<Listing>) -> Vec<Listing> {
    let mut by_key: BTreeMap<(String, String), Listing> = BTreeMap::new();

    for candidate in listings {
        let key = dedup_key(&candidate);
        let replace = match by_key.get(&key) {
            Some(kept) => wins_over(&candidate, kept),
            None => true,
        };
        if replace {
            by_key.insert(key, candidate);
        }
    }

    by_key.into_values().collect()
}

fn wins_over(candidate: &Listing, kept: &Listing) -> bool {
    if candidate.price != kept.price {
        return candidate.price < kept.price;
    }
    candidate.url < kept.url
}
