//! Brute-force vector index.
//!
//! Vectors live in one contiguous arena (`dimension` floats per slot) that grows
//! in blocks of `block_size` vectors. Search is a linear scan, so results are
//! exact. This is the write buffer of every tiered index and a standalone
//! algorithm in its own right.

use super::super::config::{CommonParams, FlatParams};
use super::super::distance::{validate_radius, validate_vector};
use super::super::traits::{
    Algorithm, IndexBackend, IndexInfo, InternalId, Label, LabelFilter, SearchHit, VectorMetric,
    VectorRecord,
};
use super::rank_best_per_label;
use crate::error::{IndexError, IndexResult};
use std::collections::{BTreeMap, HashMap};
use std::mem::size_of;
use tracing::trace;

/// Brute-force index over a contiguous vector arena.
#[derive(Debug)]
pub struct FlatIndex {
    /// Dimension of vectors.
    dimension: usize,

    /// Distance metric.
    metric: VectorMetric,

    /// Whether a label may own several slots.
    multi: bool,

    /// Vectors reserved per growth step.
    block_size: usize,

    /// Slot-major vector arena.
    data: Vec<f32>,

    /// Owner label of each slot.
    labels: Vec<Label>,

    /// Slots owned by each label.
    slots: HashMap<Label, Vec<u32>>,
}

impl FlatIndex {
    /// Create an empty flat index.
    pub fn new(params: &FlatParams) -> Self {
        Self::from_common(&params.common)
    }

    /// Create an empty flat index from common params only.
    pub fn from_common(common: &CommonParams) -> Self {
        Self {
            dimension: common.dimension,
            metric: common.metric,
            multi: common.multi,
            block_size: common.block_size,
            data: Vec::with_capacity(common.block_size * common.dimension),
            labels: Vec::with_capacity(common.block_size),
            slots: HashMap::new(),
        }
    }

    /// Bytes allocated by a freshly created index.
    pub fn estimate_initial_size(common: &CommonParams) -> usize {
        size_of::<Self>()
            + common.block_size * common.dimension * size_of::<f32>()
            + common.block_size * size_of::<Label>()
    }

    /// Bytes added per stored vector.
    pub fn estimate_element_size(common: &CommonParams) -> usize {
        common.dimension * size_of::<f32>()
            + size_of::<Label>()
            + size_of::<(Label, Vec<u32>)>()
            + size_of::<u32>()
    }

    /// Whether any vector is stored under `label`.
    pub fn contains(&self, label: Label) -> bool {
        self.slots.contains_key(&label)
    }

    /// Stored labels, ascending.
    pub(crate) fn labels(&self) -> Vec<Label> {
        let mut labels: Vec<Label> = self.slots.keys().copied().collect();
        labels.sort_unstable();
        labels
    }

    /// Vectors stored under `label`, in slot order.
    pub(crate) fn vectors_of(&self, label: Label) -> Vec<(InternalId, VectorRecord)> {
        self.slots
            .get(&label)
            .map(|slots| {
                slots
                    .iter()
                    .map(|&slot| {
                        (
                            InternalId(slot),
                            VectorRecord::new(label, self.vector(slot).to_vec()),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every stored vector, in slot order.
    pub(crate) fn records(&self) -> Vec<(InternalId, VectorRecord)> {
        self.labels
            .iter()
            .enumerate()
            .map(|(slot, &label)| {
                (
                    InternalId(slot as u32),
                    VectorRecord::new(label, self.vector(slot as u32).to_vec()),
                )
            })
            .collect()
    }

    /// Remove specific slots.
    ///
    /// Slots are removed from the highest down, so removing one never moves
    /// another slot of the same call.
    pub(crate) fn remove_slots(&mut self, mut slots: Vec<InternalId>) {
        slots.sort_unstable_by(|a, b| b.cmp(a));
        slots.dedup();
        for slot in slots {
            if slot.index() < self.labels.len() {
                self.remove_slot(slot.0);
            }
        }
        self.shrink_if_sparse();
    }

    fn vector(&self, slot: u32) -> &[f32] {
        let start = slot as usize * self.dimension;
        &self.data[start..start + self.dimension]
    }

    fn push(&mut self, label: Label, vector: &[f32]) -> IndexResult<InternalId> {
        if self.labels.len() >= u32::MAX as usize {
            return Err(IndexError::capacity("flat index slot space exhausted"));
        }
        if self.labels.len() == self.labels.capacity() {
            self.labels.reserve_exact(self.block_size);
            self.data.reserve_exact(self.block_size * self.dimension);
        }

        let slot = self.labels.len() as u32;
        self.data.extend_from_slice(vector);
        self.labels.push(label);
        self.slots.entry(label).or_default().push(slot);
        Ok(InternalId(slot))
    }

    /// Remove one slot, filling the hole with the last slot.
    fn remove_slot(&mut self, slot: u32) {
        let last = (self.labels.len() - 1) as u32;
        let label = self.labels[slot as usize];

        if let Some(owned) = self.slots.get_mut(&label) {
            owned.retain(|&s| s != slot);
            if owned.is_empty() {
                self.slots.remove(&label);
            }
        }

        if slot != last {
            let dim = self.dimension;
            let from = last as usize * dim;
            self.data
                .copy_within(from..from + dim, slot as usize * dim);

            let moved = self.labels[last as usize];
            self.labels[slot as usize] = moved;
            if let Some(owned) = self.slots.get_mut(&moved) {
                for s in owned.iter_mut().filter(|s| **s == last) {
                    *s = slot;
                }
            }
        }

        self.labels.pop();
        self.data.truncate(last as usize * self.dimension);
    }

    /// Give back whole blocks once two of them sit unused.
    fn shrink_if_sparse(&mut self) {
        let free = self.labels.capacity() - self.labels.len();
        if free >= 2 * self.block_size {
            let keep = self.labels.len() + self.block_size;
            self.labels.shrink_to(keep);
            self.data.shrink_to(keep * self.dimension);
        }
    }

    fn scan<'a>(
        &'a self,
        query: &'a [f32],
        filter: Option<&'a LabelFilter<'a>>,
    ) -> impl Iterator<Item = (InternalId, Label, f32)> + 'a {
        self.labels
            .iter()
            .enumerate()
            .filter(move |(_, label)| filter.map(|f| f(**label)).unwrap_or(true))
            .map(move |(slot, &label)| {
                let score = self.metric.score(query, self.vector(slot as u32));
                (InternalId(slot as u32), label, score)
            })
    }
}

impl IndexBackend for FlatIndex {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Flat
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
        self.labels.len()
    }

    fn label_count(&self) -> usize {
        self.slots.len()
    }

    fn count_label(&self, label: Label) -> usize {
        self.slots.get(&label).map(Vec::len).unwrap_or(0)
    }

    fn insert(&mut self, label: Label, vector: &[f32]) -> IndexResult<InternalId> {
        validate_vector(self.dimension, vector)?;

        if !self.multi {
            if let Some(&slot) = self.slots.get(&label).and_then(|s| s.first()) {
                let start = slot as usize * self.dimension;
                self.data[start..start + self.dimension].copy_from_slice(vector);
                return Ok(InternalId(slot));
            }
        }

        self.push(label, vector)
    }

    fn remove(&mut self, label: Label) -> IndexResult<usize> {
        let owned: Vec<InternalId> = self
            .slots
            .get(&label)
            .map(|slots| slots.iter().map(|&s| InternalId(s)).collect())
            .unwrap_or_default();
        let removed = owned.len();
        self.remove_slots(owned);
        Ok(removed)
    }

    fn top_k(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&LabelFilter<'_>>,
    ) -> IndexResult<Vec<SearchHit>> {
        validate_vector(self.dimension, query)?;
        trace!("Scanning flat index, size={}, k={}", self.len(), k);

        let mut hits = rank_best_per_label(self.scan(query, filter));
        hits.truncate(k);
        Ok(hits)
    }

    fn range(
        &self,
        query: &[f32],
        radius: f32,
        filter: Option<&LabelFilter<'_>>,
    ) -> IndexResult<Vec<SearchHit>> {
        validate_vector(self.dimension, query)?;
        validate_radius(radius)?;

        let metric = self.metric;
        Ok(rank_best_per_label(
            self.scan(query, filter)
                .filter(|&(_, _, score)| metric.score_to_distance(score) <= radius),
        ))
    }

    fn memory_usage(&self) -> usize {
        size_of::<Self>()
            + self.data.capacity() * size_of::<f32>()
            + self.labels.capacity() * size_of::<Label>()
            + self.slots.capacity() * size_of::<(Label, Vec<u32>)>()
            + self
                .slots
                .values()
                .map(|s| s.capacity() * size_of::<u32>())
                .sum::<usize>()
    }

    fn info(&self) -> IndexInfo {
        let mut details = BTreeMap::new();
        details.insert("blockSize".to_string(), self.block_size.into());
        details.insert("capacity".to_string(), self.labels.capacity().into());

        IndexInfo {
            algorithm: Algorithm::Flat,
            dimension: self.dimension,
            metric: self.metric,
            multi: self.multi,
            size: self.len(),
            label_count: self.label_count(),
            memory_bytes: self.memory_usage(),
            details,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
