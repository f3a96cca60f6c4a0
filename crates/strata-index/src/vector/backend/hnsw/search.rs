//! Layer search and neighbor selection.
//!
//! Distances here are metric distances (lower is better). Nodes rejected by
//! the `accept` predicate still steer the traversal but never reach results.

use super::visited::VisitedSet;
use super::HnswIndex;
use ordered_float::OrderedFloat;
use std::cell::RefCell;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

thread_local! {
    /// Per-thread visited set, reused across searches.
    static VISITED: RefCell<VisitedSet> = RefCell::new(VisitedSet::default());
}

/// Run `f` with this thread's visited set.
pub(super) fn with_visited<R>(f: impl FnOnce(&mut VisitedSet) -> R) -> R {
    VISITED.with(|cell| match cell.try_borrow_mut() {
        Ok(mut visited) => f(&mut visited),
        // Re-entrant use on the same thread gets a private set
        Err(_) => f(&mut VisitedSet::default()),
    })
}

/// Heap entry ordered by distance, then slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Scored {
    distance: OrderedFloat<f32>,
    slot: u32,
}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .cmp(&other.distance)
            .then(self.slot.cmp(&other.slot))
    }
}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl HnswIndex {
    /// Beam search on one layer. Returns up to `ef` accepted nodes, closest first.
    pub(super) fn search_layer(
        &self,
        query: &[f32],
        entry_points: &[u32],
        ef: usize,
        layer: usize,
        visited: &mut VisitedSet,
        accept: &dyn Fn(u32) -> bool,
    ) -> Vec<(f32, u32)> {
        visited.reset(self.nodes.len());

        let mut candidates: BinaryHeap<Reverse<Scored>> = BinaryHeap::with_capacity(ef * 2);
        let mut results: BinaryHeap<Scored> = BinaryHeap::with_capacity(ef + 1);
        let mut worst = f32::MAX;

        for &ep in entry_points {
            if !visited.insert(ep) {
                continue;
            }
            let entry = Scored {
                distance: OrderedFloat(self.metric.distance(query, self.vector(ep))),
                slot: ep,
            };
            candidates.push(Reverse(entry));
            if accept(ep) {
                results.push(entry);
                if results.len() > ef {
                    results.pop();
                }
                if results.len() >= ef {
                    worst = results.peek().map_or(f32::MAX, |r| r.distance.0);
                }
            }
        }

        while let Some(Reverse(current)) = candidates.pop() {
            if results.len() >= ef && current.distance.0 > worst {
                break;
            }

            let Some(node) = self.node(current.slot) else {
                continue;
            };
            let Some(neighbors) = node.neighbors.get(layer) else {
                continue;
            };

            for &neighbor in neighbors {
                if !visited.insert(neighbor) {
                    continue;
                }

                let distance = self.metric.distance(query, self.vector(neighbor));
                if results.len() < ef || distance < worst {
                    let entry = Scored {
                        distance: OrderedFloat(distance),
                        slot: neighbor,
                    };
                    candidates.push(Reverse(entry));
                    if accept(neighbor) {
                        results.push(entry);
                        if results.len() > ef {
                            results.pop();
                        }
                        worst = results.peek().map_or(f32::MAX, |r| r.distance.0);
                    }
                }
            }
        }

        results
            .into_sorted_vec()
            .into_iter()
            .map(|r| (r.distance.0, r.slot))
            .collect()
    }

    /// Greedy descent from the top layer to `floor + 1`, returning the closest node found.
    pub(super) fn descend(
        &self,
        query: &[f32],
        entry: u32,
        floor: usize,
        visited: &mut VisitedSet,
    ) -> u32 {
        let mut current = entry;
        for layer in (floor + 1..=self.max_level).rev() {
            if let Some(&(_, nearest)) = self
                .search_layer(query, &[current], 1, layer, visited, &|_| true)
                .first()
            {
                current = nearest;
            }
        }
        current
    }

    /// Diversity heuristic: keep a candidate only if it is closer to the base
    /// than to every neighbor already kept, then backfill with the closest
    /// leftovers up to `m`.
    pub(super) fn select_neighbors(&self, candidates: &[(f32, u32)], m: usize) -> Vec<u32> {
        let mut sorted = candidates.to_vec();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut selected: Vec<u32> = Vec::with_capacity(m);
        for &(to_base, candidate) in &sorted {
            if selected.len() >= m {
                break;
            }
            let diverse = selected.iter().all(|&kept| {
                to_base <= self.metric.distance(self.vector(candidate), self.vector(kept))
            });
            if diverse {
                selected.push(candidate);
            }
        }

        if selected.len() < m {
            let kept: HashSet<u32> = selected.iter().copied().collect();
            for &(_, candidate) in &sorted {
                if selected.len() >= m {
                    break;
                }
                if !kept.contains(&candidate) {
                    selected.push(candidate);
                }
            }
        }

        selected
    }

    /// Re-select the neighbors of `slot` on `layer` from `pool`.
    pub(super) fn reselect(&mut self, slot: u32, layer: usize, pool: &[u32]) {
        let base = self.vector(slot);
        let scored: Vec<(f32, u32)> = pool
            .iter()
            .filter(|&&candidate| candidate != slot)
            .map(|&candidate| (self.metric.distance(base, self.vector(candidate)), candidate))
            .collect();
        let chosen = self.select_neighbors(&scored, self.max_degree(layer));

        if let Some(node) = self.node_mut(slot) {
            if let Some(list) = node.neighbors.get_mut(layer) {
                *list = chosen;
            }
        }
    }
}
