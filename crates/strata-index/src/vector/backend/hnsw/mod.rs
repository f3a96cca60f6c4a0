//! Hierarchical navigable small world graph index.
//!
//! Vectors are kept at full precision in a slot arena. Each live slot owns a
//! node with one neighbor list per layer it reaches; layer 0 allows `2 * m`
//! neighbors, upper layers `m`.
//!
//! Removal is structural: the node is unlinked, every node that pointed at it
//! re-selects its neighbors from its remaining list plus the removed node's
//! neighbors, the entry point is re-elected if needed, and the slot goes on a
//! free list for reuse.

mod search;
mod visited;

use super::super::config::HnswParams;
use super::super::distance::{validate_radius, validate_vector};
use super::super::traits::{
    Algorithm, IndexBackend, IndexInfo, InternalId, Label, LabelFilter, SearchHit, VectorMetric,
};
use super::rank_best_per_label;
use crate::error::{IndexError, IndexResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use search::with_visited;
use std::collections::{BTreeMap, HashMap};
use std::mem::size_of;
use tracing::trace;

/// Hard cap on sampled levels.
const MAX_LEVEL: usize = 16;

#[derive(Debug, Clone)]
struct Node {
    label: Label,
    /// `neighbors[layer]`; the node's level is `neighbors.len() - 1`.
    neighbors: Vec<Vec<u32>>,
}

impl Node {
    fn level(&self) -> usize {
        self.neighbors.len() - 1
    }
}

/// HNSW graph index.
#[derive(Debug)]
pub struct HnswIndex {
    dimension: usize,
    metric: VectorMetric,
    multi: bool,
    block_size: usize,

    m: usize,
    m_max0: usize,
    ef_construction: usize,
    ef_runtime: usize,
    epsilon: f32,
    level_mult: f64,
    rng: StdRng,

    /// Slot-major vector arena. Freed slots keep stale data until reused.
    data: Vec<f32>,
    /// `None` marks a free slot.
    nodes: Vec<Option<Node>>,
    free: Vec<u32>,
    slots: HashMap<Label, Vec<u32>>,

    entry_point: Option<u32>,
    max_level: usize,
    live: usize,
}

impl HnswIndex {
    /// Create an empty graph.
    pub fn new(params: &HnswParams) -> Self {
        let common = &params.common;
        let seed = params.seed.unwrap_or_else(rand::random);

        Self {
            dimension: common.dimension,
            metric: common.metric,
            multi: common.multi,
            block_size: common.block_size,
            m: params.m,
            m_max0: params.m * 2,
            ef_construction: params.ef_construction.max(params.m),
            ef_runtime: params.ef_runtime,
            epsilon: params.epsilon,
            level_mult: 1.0 / (params.m.max(2) as f64).ln(),
            rng: StdRng::seed_from_u64(seed),
            data: Vec::with_capacity(common.block_size * common.dimension),
            nodes: Vec::with_capacity(common.block_size),
            free: Vec::new(),
            slots: HashMap::new(),
            entry_point: None,
            max_level: 0,
            live: 0,
        }
    }

    /// Bytes allocated by a freshly created graph.
    pub fn estimate_initial_size(params: &HnswParams) -> usize {
        let common = &params.common;
        size_of::<Self>()
            + common.block_size
                * (common.dimension * size_of::<f32>() + size_of::<Option<Node>>())
    }

    /// Bytes added per stored vector, with upper layers amortised.
    pub fn estimate_element_size(params: &HnswParams) -> usize {
        let m = params.m.max(2);
        let upper = (m * size_of::<u32>() + size_of::<Vec<u32>>()) / (m - 1);

        params.common.dimension * size_of::<f32>()
            + size_of::<Option<Node>>()
            + size_of::<Vec<u32>>()
            + 2 * m * size_of::<u32>()
            + upper
            + size_of::<(Label, Vec<u32>)>()
            + size_of::<u32>()
    }

    fn vector(&self, slot: u32) -> &[f32] {
        let start = slot as usize * self.dimension;
        &self.data[start..start + self.dimension]
    }

    fn node(&self, slot: u32) -> Option<&Node> {
        self.nodes.get(slot as usize).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, slot: u32) -> Option<&mut Node> {
        self.nodes.get_mut(slot as usize).and_then(Option::as_mut)
    }

    fn max_degree(&self, layer: usize) -> usize {
        if layer == 0 {
            self.m_max0
        } else {
            self.m
        }
    }

    fn random_level(&mut self) -> usize {
        // In (0, 1] so the log stays finite
        let r: f64 = 1.0 - self.rng.gen::<f64>();
        ((-r.ln() * self.level_mult).floor() as usize).min(MAX_LEVEL)
    }

    fn allocate(&mut self, label: Label, vector: &[f32], level: usize) -> IndexResult<u32> {
        let node = Node {
            label,
            neighbors: vec![Vec::new(); level + 1],
        };

        if let Some(slot) = self.free.pop() {
            let start = slot as usize * self.dimension;
            self.data[start..start + self.dimension].copy_from_slice(vector);
            self.nodes[slot as usize] = Some(node);
            return Ok(slot);
        }

        if self.nodes.len() >= u32::MAX as usize {
            return Err(IndexError::capacity("hnsw slot space exhausted"));
        }
        if self.nodes.len() == self.nodes.capacity() {
            self.nodes.reserve_exact(self.block_size);
            self.data.reserve_exact(self.block_size * self.dimension);
        }

        let slot = self.nodes.len() as u32;
        self.data.extend_from_slice(vector);
        self.nodes.push(Some(node));
        Ok(slot)
    }

    /// Connect a freshly allocated slot into the graph.
    fn link(&mut self, slot: u32, level: usize) {
        let Some(entry) = self.entry_point else {
            self.entry_point = Some(slot);
            self.max_level = level;
            return;
        };

        let query = self.vector(slot).to_vec();
        let top = level.min(self.max_level);

        let plan: Vec<(usize, Vec<u32>)> = with_visited(|visited| {
            let mut entry_points = vec![self.descend(&query, entry, top, visited)];
            let mut plan = Vec::with_capacity(top + 1);
            for layer in (0..=top).rev() {
                let candidates = self.search_layer(
                    &query,
                    &entry_points,
                    self.ef_construction,
                    layer,
                    visited,
                    &|s| s != slot,
                );
                plan.push((layer, self.select_neighbors(&candidates, self.max_degree(layer))));
                if !candidates.is_empty() {
                    entry_points = candidates.iter().map(|&(_, s)| s).collect();
                }
            }
            plan
        });

        for (layer, chosen) in plan {
            let cap = self.max_degree(layer);
            if let Some(list) = self.node_mut(slot).and_then(|n| n.neighbors.get_mut(layer)) {
                list.clone_from(&chosen);
            }

            for neighbor in chosen {
                let pool = match self.node_mut(neighbor).and_then(|n| n.neighbors.get_mut(layer)) {
                    Some(list) => {
                        list.push(slot);
                        (list.len() > cap).then(|| list.clone())
                    }
                    None => None,
                };
                if let Some(pool) = pool {
                    self.reselect(neighbor, layer, &pool);
                }
            }
        }

        if level > self.max_level {
            self.max_level = level;
            self.entry_point = Some(slot);
        }
    }

    /// Detach a slot from the graph and repair the nodes that pointed at it.
    fn unlink(&mut self, slot: u32) -> Option<Node> {
        let node = self.nodes.get_mut(slot as usize)?.take()?;

        for (layer, outgoing) in node.neighbors.iter().enumerate() {
            let incoming: Vec<u32> = self
                .nodes
                .iter()
                .enumerate()
                .filter(|(_, n)| {
                    n.as_ref()
                        .and_then(|n| n.neighbors.get(layer))
                        .is_some_and(|list| list.contains(&slot))
                })
                .map(|(id, _)| id as u32)
                .collect();

            for id in incoming {
                let Some(current) = self.node(id).and_then(|n| n.neighbors.get(layer)) else {
                    continue;
                };
                let mut pool: Vec<u32> = current.iter().copied().filter(|&s| s != slot).collect();
                let extra: Vec<u32> = outgoing
                    .iter()
                    .copied()
                    .filter(|&s| s != id && !pool.contains(&s))
                    .collect();
                pool.extend(extra);
                self.reselect(id, layer, &pool);
            }
        }

        if self.entry_point == Some(slot) {
            self.elect_entry_point();
        }
        Some(node)
    }

    /// Highest-level live node becomes the entry point; lowest slot wins ties.
    fn elect_entry_point(&mut self) {
        let best = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(id, n)| n.as_ref().map(|n| (n.level(), id)))
            .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        match best {
            Some((level, id)) => {
                self.entry_point = Some(id as u32);
                self.max_level = level;
            }
            None => {
                self.entry_point = None;
                self.max_level = 0;
            }
        }
    }

    /// Layer-0 beam search, closest first.
    fn search(&self, query: &[f32], ef: usize, filter: Option<&LabelFilter<'_>>) -> Vec<(f32, u32)> {
        let Some(entry) = self.entry_point else {
            return Vec::new();
        };
        let accept = |slot: u32| match filter {
            Some(f) => self.node(slot).is_some_and(|n| f(n.label)),
            None => true,
        };

        with_visited(|visited| {
            let start = self.descend(query, entry, 0, visited);
            self.search_layer(query, &[start], ef, 0, visited, &accept)
        })
    }

    fn rank(&self, query: &[f32], found: &[(f32, u32)]) -> Vec<SearchHit> {
        rank_best_per_label(found.iter().filter_map(|&(_, slot)| {
            self.node(slot).map(|n| {
                (
                    InternalId(slot),
                    n.label,
                    self.metric.score(query, self.vector(slot)),
                )
            })
        }))
    }
}

impl IndexBackend for HnswIndex {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Hnsw
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> VectorMetric {
        self.metric
    }

    fn is_multi(&self) -> bool {
        self.multi
    }

    fn len(&self) -> usize {
        self.live
    }

    fn label_count(&self) -> usize {
        self.slots.len()
    }

    fn count_label(&self, label: Label) -> usize {
        self.slots.get(&label).map(Vec::len).unwrap_or(0)
    }

    fn insert(&mut self, label: Label, vector: &[f32]) -> IndexResult<InternalId> {
        validate_vector(self.dimension, vector)?;

        if !self.multi && self.slots.contains_key(&label) {
            self.remove(label)?;
        }

        let level = self.random_level();
        let slot = self.allocate(label, vector, level)?;
        self.link(slot, level);
        self.slots.entry(label).or_default().push(slot);
        self.live += 1;

        trace!("Linked label {} at slot {} (level {})", label, slot, level);
        Ok(InternalId(slot))
    }

    fn remove(&mut self, label: Label) -> IndexResult<usize> {
        let Some(owned) = self.slots.remove(&label) else {
            return Ok(0);
        };

        for &slot in &owned {
            if self.unlink(slot).is_some() {
                self.free.push(slot);
                self.live -= 1;
            }
        }

        trace!("Unlinked label {} ({} slots)", label, owned.len());
        Ok(owned.len())
    }

    fn top_k(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&LabelFilter<'_>>,
    ) -> IndexResult<Vec<SearchHit>> {
        validate_vector(self.dimension, query)?;
        if k == 0 || self.live == 0 {
            return Ok(Vec::new());
        }

        // Widen the beam until k labels surface or the graph is exhausted
        let mut ef = self.ef_runtime.max(k);
        loop {
            let found = self.search(query, ef, filter);
            let mut hits = self.rank(query, &found);
            if hits.len() >= k || found.len() < ef || ef >= self.live {
                hits.truncate(k);
                return Ok(hits);
            }
            ef *= 2;
        }
    }

    fn range(
        &self,
        query: &[f32],
        radius: f32,
        filter: Option<&LabelFilter<'_>>,
    ) -> IndexResult<Vec<SearchHit>> {
        validate_vector(self.dimension, query)?;
        validate_radius(radius)?;
        if self.live == 0 {
            return Ok(Vec::new());
        }

        // Stop once the farthest result lies outside the widened boundary
        let boundary = radius * (1.0 + self.epsilon);
        let mut ef = self.ef_runtime;
        loop {
            let found = self.search(query, ef, filter);
            let beyond = found.last().map_or(true, |&(d, _)| d > boundary);
            if beyond || found.len() < ef || ef >= self.live {
                let metric = self.metric;
                let within: Vec<(f32, u32)> = found
                    .into_iter()
                    .filter(|&(_, slot)| {
                        metric.distance(query, self.vector(slot)) <= radius
                    })
                    .collect();
                return Ok(self.rank(query, &within));
            }
            ef *= 2;
        }
    }

    fn memory_usage(&self) -> usize {
        let graph: usize = self
            .nodes
            .iter()
            .flatten()
            .map(|n| {
                n.neighbors.capacity() * size_of::<Vec<u32>>()
                    + n.neighbors
                        .iter()
                        .map(|l| l.capacity() * size_of::<u32>())
                        .sum::<usize>()
            })
            .sum();

        size_of::<Self>()
            + self.data.capacity() * size_of::<f32>()
            + self.nodes.capacity() * size_of::<Option<Node>>()
            + graph
            + self.free.capacity() * size_of::<u32>()
            + self.slots.capacity() * size_of::<(Label, Vec<u32>)>()
            + self
                .slots
                .values()
                .map(|s| s.capacity() * size_of::<u32>())
                .sum::<usize>()
    }

    fn info(&self) -> IndexInfo {
        let mut details = BTreeMap::new();
        details.insert("m".to_string(), self.m.into());
        details.insert("efConstruction".to_string(), self.ef_construction.into());
        details.insert("efRuntime".to_string(), self.ef_runtime.into());
        details.insert("epsilon".to_string(), serde_json::json!(self.epsilon));
        details.insert("maxLevel".to_string(), self.max_level.into());
        details.insert("freeSlots".to_string(), self.free.len().into());
        details.insert("blockSize".to_string(), self.block_size.into());

        IndexInfo {
            algorithm: Algorithm::Hnsw,
            dimension: self.dimension,
            metric: self.metric,
            multi: self.multi,
            size: self.live,
            label_count: self.slots.len(),
            memory_bytes: self.memory_usage(),
            details,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
