//! Inverted-file index with unquantized lists.
//!
//! Vectors are scanned linearly until `trainingSize` of them have arrived.
//! Training then runs k-means++ seeded Lloyd iterations over every stored
//! vector and files each one under its nearest centroid. Queries scan the
//! `nProbes` lists whose centroids score best.

use super::super::config::IvfParams;
use super::super::distance::{validate_radius, validate_vector};
use super::super::traits::{
    Algorithm, IndexBackend, IndexInfo, InternalId, Label, LabelFilter, SearchHit, VectorMetric,
};
use super::rank_best_per_label;
use crate::error::{IndexError, IndexResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::mem::size_of;
use tracing::debug;

const UNASSIGNED: u32 = u32::MAX;

/// Inverted-file index.
#[derive(Debug)]
pub struct IvfFlatIndex {
    dimension: usize,
    metric: VectorMetric,
    multi: bool,
    block_size: usize,

    n_lists: usize,
    n_probes: usize,
    training_size: usize,
    kmeans_iterations: usize,
    seed: u64,

    data: Vec<f32>,
    /// Owner of each slot; `None` marks a free slot.
    owners: Vec<Option<Label>>,
    /// List of each slot, or [`UNASSIGNED`].
    list_of: Vec<u32>,
    free: Vec<u32>,
    slots: HashMap<Label, Vec<u32>>,

    centroids: Vec<Vec<f32>>,
    lists: Vec<Vec<u32>>,
    /// Slots stored before training.
    unassigned: Vec<u32>,
    live: usize,
}

impl IvfFlatIndex {
    /// Create an empty, untrained index.
    pub fn new(params: &IvfParams) -> Self {
        let common = &params.common;
        Self {
            dimension: common.dimension,
            metric: common.metric,
            multi: common.multi,
            block_size: common.block_size,
            n_lists: params.n_lists,
            n_probes: params.n_probes,
            training_size: params.effective_training_size(),
            kmeans_iterations: params.kmeans_iterations,
            seed: params.seed.unwrap_or_else(rand::random),
            data: Vec::with_capacity(common.block_size * common.dimension),
            owners: Vec::with_capacity(common.block_size),
            list_of: Vec::with_capacity(common.block_size),
            free: Vec::new(),
            slots: HashMap::new(),
            centroids: Vec::new(),
            lists: Vec::new(),
            unassigned: Vec::new(),
            live: 0,
        }
    }

    /// Bytes allocated by a fresh index, plus its eventual centroid table.
    pub fn estimate_initial_size(params: &IvfParams) -> usize {
        let common = &params.common;
        size_of::<Self>()
            + common.block_size * Self::slot_overhead(common.dimension)
            + params.n_lists * (common.dimension * size_of::<f32>() + 2 * size_of::<Vec<u32>>())
    }

    /// Bytes added per stored vector.
    pub fn estimate_element_size(params: &IvfParams) -> usize {
        Self::slot_overhead(params.common.dimension)
            + size_of::<u32>()
            + size_of::<(Label, Vec<u32>)>()
            + size_of::<u32>()
    }

    fn slot_overhead(dimension: usize) -> usize {
        dimension * size_of::<f32>() + size_of::<Option<Label>>() + size_of::<u32>()
    }

    /// Whether centroids have been trained.
    pub fn is_trained(&self) -> bool {
        !self.centroids.is_empty()
    }

    fn vector(&self, slot: u32) -> &[f32] {
        let start = slot as usize * self.dimension;
        &self.data[start..start + self.dimension]
    }

    fn allocate(&mut self, label: Label, vector: &[f32]) -> IndexResult<u32> {
        if let Some(slot) = self.free.pop() {
            let start = slot as usize * self.dimension;
            self.data[start..start + self.dimension].copy_from_slice(vector);
            self.owners[slot as usize] = Some(label);
            return Ok(slot);
        }

        if self.owners.len() >= UNASSIGNED as usize {
            return Err(IndexError::capacity("ivf slot space exhausted"));
        }
        if self.owners.len() == self.owners.capacity() {
            self.owners.reserve_exact(self.block_size);
            self.list_of.reserve_exact(self.block_size);
            self.data.reserve_exact(self.block_size * self.dimension);
        }

        let slot = self.owners.len() as u32;
        self.data.extend_from_slice(vector);
        self.owners.push(Some(label));
        self.list_of.push(UNASSIGNED);
        Ok(slot)
    }

    fn file(&mut self, slot: u32) {
        if self.is_trained() {
            let list = nearest_centroid(self.metric, &self.centroids, self.vector(slot));
            self.lists[list].push(slot);
            self.list_of[slot as usize] = list as u32;
        } else {
            self.unassigned.push(slot);
            self.list_of[slot as usize] = UNASSIGNED;
        }
    }

    fn unfile(&mut self, slot: u32) {
        let bucket = match self.list_of[slot as usize] {
            UNASSIGNED => &mut self.unassigned,
            list => &mut self.lists[list as usize],
        };
        if let Some(pos) = bucket.iter().position(|&s| s == slot) {
            bucket.swap_remove(pos);
        }
    }

    /// Train centroids over every stored vector and file them.
    fn train(&mut self) {
        let live: Vec<u32> = std::mem::take(&mut self.unassigned);
        let sample: Vec<&[f32]> = live.iter().map(|&s| self.vector(s)).collect();

        let centroids = train_centroids(
            self.metric,
            &sample,
            self.n_lists,
            self.kmeans_iterations,
            self.seed,
        );
        let assignments: Vec<usize> = sample
            .par_iter()
            .map(|v| nearest_centroid(self.metric, &centroids, v))
            .collect();

        debug!(
            "Trained ivf index: {} vectors into {} lists",
            live.len(),
            centroids.len()
        );

        self.lists = vec![Vec::new(); centroids.len()];
        self.centroids = centroids;
        for (slot, list) in live.into_iter().zip(assignments) {
            self.lists[list].push(slot);
            self.list_of[slot as usize] = list as u32;
        }
    }

    /// Slots worth scoring for `query`.
    fn candidates(&self, query: &[f32]) -> Vec<u32> {
        if !self.is_trained() {
            return self.unassigned.clone();
        }

        let mut ranked: Vec<(usize, f32)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(i, c)| (i, self.metric.score(query, c)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        ranked
            .into_iter()
            .take(self.n_probes)
            .flat_map(|(i, _)| self.lists[i].iter().copied())
            .collect()
    }

    fn scored<'a>(
        &'a self,
        query: &'a [f32],
        filter: Option<&'a LabelFilter<'a>>,
    ) -> impl Iterator<Item = (InternalId, Label, f32)> + 'a {
        self.candidates(query).into_iter().filter_map(move |slot| {
            let label = self.owners[slot as usize]?;
            if filter.is_some_and(|f| !f(label)) {
                return None;
            }
            Some((InternalId(slot), label, self.metric.score(query, self.vector(slot))))
        })
    }
}

impl IndexBackend for IvfFlatIndex {
    fn algorithm(&self) -> Algorithm {
        Algorithm::IvfFlat
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

        let slot = self.allocate(label, vector)?;
        self.file(slot);
        self.slots.entry(label).or_default().push(slot);
        self.live += 1;

        if !self.is_trained() && self.live >= self.training_size {
            self.train();
        }
        Ok(InternalId(slot))
    }

    fn remove(&mut self, label: Label) -> IndexResult<usize> {
        let Some(owned) = self.slots.remove(&label) else {
            return Ok(0);
        };

        for &slot in &owned {
            self.unfile(slot);
            self.owners[slot as usize] = None;
            self.list_of[slot as usize] = UNASSIGNED;
            self.free.push(slot);
            self.live -= 1;
        }
        Ok(owned.len())
    }

    fn top_k(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&LabelFilter<'_>>,
    ) -> IndexResult<Vec<SearchHit>> {
        validate_vector(self.dimension, query)?;
        let mut hits = rank_best_per_label(self.scored(query, filter));
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
            self.scored(query, filter)
                .filter(|&(_, _, score)| metric.score_to_distance(score) <= radius),
        ))
    }

    fn memory_usage(&self) -> usize {
        size_of::<Self>()
            + self.data.capacity() * size_of::<f32>()
            + self.owners.capacity() * size_of::<Option<Label>>()
            + self.list_of.capacity() * size_of::<u32>()
            + self.free.capacity() * size_of::<u32>()
            + self.unassigned.capacity() * size_of::<u32>()
            + self
                .centroids
                .iter()
                .map(|c| size_of::<Vec<f32>>() + c.capacity() * size_of::<f32>())
                .sum::<usize>()
            + self
                .lists
                .iter()
                .map(|l| size_of::<Vec<u32>>() + l.capacity() * size_of::<u32>())
                .sum::<usize>()
            + self.slots.capacity() * size_of::<(Label, Vec<u32>)>()
            + self
                .slots
                .values()
                .map(|s| s.capacity() * size_of::<u32>())
                .sum::<usize>()
    }

    fn info(&self) -> IndexInfo {
        let mut details = BTreeMap::new();
        details.insert("nLists".to_string(), self.n_lists.into());
        details.insert("nProbes".to_string(), self.n_probes.into());
        details.insert("trainingSize".to_string(), self.training_size.into());
        details.insert("trained".to_string(), self.is_trained().into());
        details.insert("unassigned".to_string(), self.unassigned.len().into());

        IndexInfo {
            algorithm: Algorithm::IvfFlat,
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
// k-means
// ============================================================================

pub(super) fn nearest_centroid(
    metric: VectorMetric,
    centroids: &[Vec<f32>],
    vector: &[f32],
) -> usize {
    let mut best = 0;
    let mut best_score = f32::MIN;
    for (i, centroid) in centroids.iter().enumerate() {
        let score = metric.score(centroid, vector);
        if score > best_score {
            best_score = score;
            best = i;
        }
    }
    best
}

pub(super) fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// k-means++ seeding followed by Lloyd iterations.
///
/// Returns fewer than `k` centroids when the sample has fewer distinct points.
pub(super) fn train_centroids(
    metric: VectorMetric,
    sample: &[&[f32]],
    k: usize,
    iterations: usize,
    seed: u64,
) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let Some(first) = sample.choose(&mut rng) else {
        return Vec::new();
    };

    let k = k.min(sample.len());
    let mut centroids: Vec<Vec<f32>> = vec![first.to_vec()];
    while centroids.len() < k {
        let weights: Vec<f32> = sample
            .par_iter()
            .map(|v| {
                centroids
                    .iter()
                    .map(|c| squared_l2(c, v))
                    .fold(f32::MAX, f32::min)
            })
            .collect();
        let total: f32 = weights.iter().sum();
        if total <= f32::EPSILON {
            break;
        }

        let mut target = rng.gen::<f32>() * total;
        let mut chosen = weights.len() - 1;
        for (i, w) in weights.iter().enumerate() {
            target -= w;
            if target <= 0.0 {
                chosen = i;
                break;
            }
        }
        centroids.push(sample[chosen].to_vec());
    }

    for _ in 0..iterations {
        let assignments: Vec<usize> = sample
            .par_iter()
            .map(|v| nearest_centroid(metric, &centroids, v))
            .collect();

        let dim = centroids[0].len();
        let mut sums = vec![vec![0.0f32; dim]; centroids.len()];
        let mut counts = vec![0usize; centroids.len()];
        for (v, &list) in sample.iter().zip(&assignments) {
            counts[list] += 1;
            for (dst, src) in sums[list].iter_mut().zip(v.iter()) {
                *dst += src;
            }
        }

        // Empty lists keep their previous centroid
        for ((centroid, sum), count) in centroids.iter_mut().zip(sums).zip(counts) {
            if count > 0 {
                let inv = 1.0 / count as f32;
                *centroid = sum.into_iter().map(|x| x * inv).collect();
            }
        }
    }

    centroids
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::backend::flat::FlatIndex;
    use crate::vector::config::CommonParams;

    fn params(lists: usize, probes: usize, training: usize) -> IvfParams {
        IvfParams::new(CommonParams::new(2).with_metric(VectorMetric::L2).with_block_size(8))
            .with_lists(lists)
            .with_probes(probes)
            .with_training_size(training)
            .with_seed(11)
    }

    /// Four well separated clusters of `per` points each.
    fn clustered(per: usize) -> Vec<Vec<f32>> {
        let centers = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)];
        let mut rng = StdRng::seed_from_u64(3);
        centers
            .iter()
            .flat_map(|&(x, y)| {
                (0..per)
                    .map(|_| vec![x + rng.gen_range(-0.5..0.5), y + rng.gen_range(-0.5..0.5)])
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    #[test]
    fn test_untrained_search_is_exact() {
        let mut ivf = IvfFlatIndex::new(&params(4, 1, 100));
        ivf.insert(Label(1), &[0.0, 0.0]).unwrap();
        ivf.insert(Label(2), &[3.0, 4.0]).unwrap();

        assert!(!ivf.is_trained());
        let hits = ivf.top_k(&[3.0, 4.0], 2, None).unwrap();
        assert_eq!(hits[0].label, Label(2));
        assert_eq!(hits[1].label, Label(1));
    }

    #[test]
    fn test_training_triggers_at_threshold() {
        let mut ivf = IvfFlatIndex::new(&params(4, 1, 40));
        for (i, v) in clustered(10).iter().enumerate() {
            ivf.insert(Label(i as u64), v).unwrap();
        }

        assert!(ivf.is_trained());
        assert_eq!(ivf.centroids.len(), 4);
        assert!(ivf.unassigned.is_empty());
        assert_eq!(ivf.lists.iter().map(Vec::len).sum::<usize>(), 40);

        // One probe lands in the query's own cluster
        let hits = ivf.top_k(&[10.0, 10.0], 5, None).unwrap();
        assert_eq!(hits.len(), 5);
        assert!(hits.iter().all(|h| h.label.value() >= 30));
    }

    #[test]
    fn test_probing_every_list_matches_flat() {
        let p = params(4, 4, 20);
        let mut ivf = IvfFlatIndex::new(&p);
        let mut flat = FlatIndex::from_common(&p.common);
        for (i, v) in clustered(10).iter().enumerate() {
            ivf.insert(Label(i as u64), v).unwrap();
            flat.insert(Label(i as u64), v).unwrap();
        }

        let query = [5.0, 5.0];
        assert_eq!(
            ivf.top_k(&query, 8, None).unwrap(),
            flat.top_k(&query, 8, None).unwrap()
        );
    }

    #[test]
    fn test_remove_and_reuse() {
        let mut ivf = IvfFlatIndex::new(&params(2, 2, 4));
        for i in 0..6u64 {
            ivf.insert(Label(i), &[i as f32, 0.0]).unwrap();
        }
        assert_eq!(ivf.remove(Label(2)).unwrap(), 1);
        assert_eq!(ivf.remove(Label(2)).unwrap(), 0);
        assert_eq!(ivf.len(), 5);

        let hits = ivf.top_k(&[2.0, 0.0], 6, None).unwrap();
        assert!(hits.iter().all(|h| h.label != Label(2)));

        ivf.insert(Label(9), &[2.0, 0.0]).unwrap();
        assert_eq!(ivf.owners.len(), 6);
        assert_eq!(ivf.top_k(&[2.0, 0.0], 1, None).unwrap()[0].label, Label(9));
    }

    #[test]
    fn test_filter_and_range() {
        let mut ivf = IvfFlatIndex::new(&params(2, 2, 100));
        ivf.insert(Label(1), &[0.0, 0.0]).unwrap();
        ivf.insert(Label(2), &[0.5, 0.0]).unwrap();
        ivf.insert(Label(3), &[4.0, 0.0]).unwrap();

        let not_one = |label: Label| label != Label(1);
        let hits = ivf.top_k(&[0.0, 0.0], 1, Some(&not_one)).unwrap();
        assert_eq!(hits[0].label, Label(2));

        let hits = ivf.range(&[0.0, 0.0], 1.0, None).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_training_is_deterministic() {
        let data = clustered(10);
        let sample: Vec<&[f32]> = data.iter().map(Vec::as_slice).collect();
        let a = train_centroids(VectorMetric::L2, &sample, 4, 5, 42);
        let b = train_centroids(VectorMetric::L2, &sample, 4, 5, 42);
        assert_eq!(a, b);
    }
}
