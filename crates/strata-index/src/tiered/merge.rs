//! Combining frontend and backend search results.

use crate::vector::{Label, SearchHit};
use std::collections::HashMap;

/// Merge ranked hits from both tiers.
///
/// Labels found in both tiers keep one hit: the backend's in single-value
/// mode, the better score in multi-value mode (the frontend's on a tie).
/// The result is sorted by score descending. Equal scores keep frontend hits
/// before backend hits and each tier's own order within it.
pub(crate) fn merge_hits(
    frontend: Vec<SearchHit>,
    backend: Vec<SearchHit>,
    multi: bool,
    limit: Option<usize>,
) -> Vec<SearchHit> {
    let mut combined: Vec<SearchHit> = frontend;
    combined.extend(backend);

    let mut keep = vec![true; combined.len()];
    let mut seen: HashMap<Label, usize> = HashMap::with_capacity(combined.len());
    for (pos, hit) in combined.iter().enumerate() {
        match seen.get(&hit.label).copied() {
            None => {
                seen.insert(hit.label, pos);
            }
            Some(prev) => {
                let replace = !multi || hit.score > combined[prev].score;
                if replace {
                    keep[prev] = false;
                    seen.insert(hit.label, pos);
                } else {
                    keep[pos] = false;
                }
            }
        }
    }

    let mut merged: Vec<SearchHit> = combined
        .into_iter()
        .zip(keep)
        .filter_map(|(hit, kept)| kept.then_some(hit))
        .collect();

    // Stable, so equal scores keep their tier order
    merged.sort_by(|a, b| b.score.total_cmp(&a.score));
    if let Some(limit) = limit {
        merged.truncate(limit);
    }
    merged
}
