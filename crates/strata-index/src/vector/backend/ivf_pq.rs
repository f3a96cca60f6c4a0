//! Inverted-file index with product-quantized lists.
//!
//! Until `trainingSize` vectors have arrived they are kept verbatim and
//! scanned exactly. Training then learns the coarse centroids and, for each
//! of the `pqSubspaces` slices of the residual `vector - centroid`, a
//! codebook of up to 256 entries. Every vector is replaced by its list and
//! one code byte per subspace, and the raw vectors are released.
//!
//! Queries score codes through per-list lookup tables (asymmetric distance),
//! so results and range distances are approximations of the exact ones.
//! Cosine vectors are normalized on the way in and scored by dot product.

use super::super::config::IvfPqParams;
use super::super::distance::{dot_product, validate_radius, validate_vector};
use super::super::traits::{
    Algorithm, IndexBackend, IndexInfo, InternalId, Label, LabelFilter, SearchHit, VectorMetric,
};
use super::ivf::{nearest_centroid, squared_l2, train_centroids};
use super::rank_best_per_label;
use crate::error::{IndexError, IndexResult};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::mem::size_of;
use tracing::debug;

const UNASSIGNED: u32 = u32::MAX;

/// Product-quantized inverted-file index.
#[derive(Debug)]
pub struct IvfPqIndex {
    dimension: usize,
    metric: VectorMetric,
    multi: bool,
    block_size: usize,

    n_lists: usize,
    n_probes: usize,
    subspaces: usize,
    sub_dimension: usize,
    pq_centroids: usize,
    training_size: usize,
    kmeans_iterations: usize,
    seed: u64,

    /// Raw vectors, held only until training.
    data: Vec<f32>,
    /// `subspaces` code bytes per slot, filled once trained.
    codes: Vec<u8>,
    /// Owner of each slot; `None` marks a free slot.
    owners: Vec<Option<Label>>,
    /// List of each slot, or [`UNASSIGNED`].
    list_of: Vec<u32>,
    free: Vec<u32>,
    slots: HashMap<Label, Vec<u32>>,

    centroids: Vec<Vec<f32>>,
    /// Per subspace, entries of `sub_dimension` components.
    codebooks: Vec<Vec<Vec<f32>>>,
    lists: Vec<Vec<u32>>,
    /// Slots stored before training.
    unassigned: Vec<u32>,
    live: usize,
}

impl IvfPqIndex {
    /// Create an empty, untrained index.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimension does not split into the subspaces.
    pub fn new(params: &IvfPqParams) -> IndexResult<Self> {
        let common = &params.common;
        if params.pq_subspaces == 0
            || common.dimension % params.pq_subspaces != 0
            || params.subspace_dimension() == 0
        {
            return Err(IndexError::invalid_params(format!(
                "ivf_pq dimension ({}) must be a multiple of pqSubspaces ({})",
                common.dimension, params.pq_subspaces
            )));
        }

        Ok(Self {
            dimension: common.dimension,
            metric: common.metric,
            multi: common.multi,
            block_size: common.block_size,
            n_lists: params.n_lists,
            n_probes: params.n_probes,
            subspaces: params.pq_subspaces,
            sub_dimension: params.subspace_dimension(),
            pq_centroids: params.pq_centroids.clamp(1, 256),
            training_size: params.effective_training_size(),
            kmeans_iterations: params.kmeans_iterations,
            seed: params.seed.unwrap_or_else(rand::random),
            data: Vec::with_capacity(common.block_size * common.dimension),
            codes: Vec::new(),
            owners: Vec::with_capacity(common.block_size),
            list_of: Vec::with_capacity(common.block_size),
            free: Vec::new(),
            slots: HashMap::new(),
            centroids: Vec::new(),
            codebooks: Vec::new(),
            lists: Vec::new(),
            unassigned: Vec::new(),
            live: 0,
        })
    }

    /// Bytes allocated by a fresh index, plus its eventual centroid and
    /// codebook tables.
    pub fn estimate_initial_size(params: &IvfPqParams) -> usize {
        let common = &params.common;
        let vector_bytes = common.dimension * size_of::<f32>();
        size_of::<Self>()
            + common.block_size * (vector_bytes + size_of::<Option<Label>>() + size_of::<u32>())
            + params.n_lists * (vector_bytes + 2 * size_of::<Vec<u32>>())
            + params.pq_centroids.min(256) * vector_bytes
    }

    /// Bytes added per stored vector once trained.
    pub fn estimate_element_size(params: &IvfPqParams) -> usize {
        params.pq_subspaces
            + size_of::<Option<Label>>()
            + size_of::<u32>()
            + size_of::<u32>()
            + size_of::<(Label, Vec<u32>)>()
            + size_of::<u32>()
    }

    /// Whether centroids and codebooks have been trained.
    pub fn is_trained(&self) -> bool {
        !self.centroids.is_empty()
    }

    /// Bytes of code stored per vector.
    pub fn code_size(&self) -> usize {
        self.subspaces
    }

    fn prepare(&self, vector: &[f32]) -> Vec<f32> {
        let mut prepared = vector.to_vec();
        if self.metric == VectorMetric::Cosine {
            let norm = prepared.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                prepared.iter_mut().for_each(|x| *x /= norm);
            }
        }
        prepared
    }

    fn raw(&self, slot: u32) -> &[f32] {
        let start = slot as usize * self.dimension;
        &self.data[start..start + self.dimension]
    }

    fn code(&self, slot: u32) -> &[u8] {
        let start = slot as usize * self.subspaces;
        &self.codes[start..start + self.subspaces]
    }

    fn allocate(&mut self, label: Label) -> IndexResult<u32> {
        if let Some(slot) = self.free.pop() {
            self.owners[slot as usize] = Some(label);
            return Ok(slot);
        }

        if self.owners.len() >= UNASSIGNED as usize {
            return Err(IndexError::capacity("ivf_pq slot space exhausted"));
        }
        if self.owners.len() == self.owners.capacity() {
            self.owners.reserve_exact(self.block_size);
            self.list_of.reserve_exact(self.block_size);
            if self.is_trained() {
                self.codes.reserve_exact(self.block_size * self.subspaces);
            } else {
                self.data.reserve_exact(self.block_size * self.dimension);
            }
        }

        let slot = self.owners.len() as u32;
        self.owners.push(Some(label));
        self.list_of.push(UNASSIGNED);
        if self.is_trained() {
            self.codes.resize(self.owners.len() * self.subspaces, 0);
        } else {
            self.data.resize(self.owners.len() * self.dimension, 0.0);
        }
        Ok(slot)
    }

    /// Store `vector` in `slot` and file it.
    fn store(&mut self, slot: u32, vector: &[f32]) {
        if self.is_trained() {
            let list = nearest_centroid(self.metric, &self.centroids, vector);
            let residual = residual(vector, &self.centroids[list]);
            let start = slot as usize * self.subspaces;
            encode(
                &self.codebooks,
                self.sub_dimension,
                &residual,
                &mut self.codes[start..start + self.subspaces],
            );
            self.lists[list].push(slot);
            self.list_of[slot as usize] = list as u32;
        } else {
            let start = slot as usize * self.dimension;
            self.data[start..start + self.dimension].copy_from_slice(vector);
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

    /// Learn centroids and codebooks from every stored vector, encode them
    /// and drop the raw copies.
    fn train(&mut self) {
        let live: Vec<u32> = std::mem::take(&mut self.unassigned);
        let sample: Vec<&[f32]> = live.iter().map(|&s| self.raw(s)).collect();

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
        let residuals: Vec<Vec<f32>> = sample
            .par_iter()
            .zip(assignments.par_iter())
            .map(|(v, &list)| residual(v, &centroids[list]))
            .collect();

        let sub = self.sub_dimension;
        let codebooks: Vec<Vec<Vec<f32>>> = (0..self.subspaces)
            .map(|s| {
                let slices: Vec<&[f32]> =
                    residuals.iter().map(|r| &r[s * sub..(s + 1) * sub]).collect();
                train_centroids(
                    VectorMetric::L2,
                    &slices,
                    self.pq_centroids,
                    self.kmeans_iterations,
                    self.seed.wrapping_add(s as u64 + 1),
                )
            })
            .collect();

        let mut codes = vec![0u8; self.owners.len() * self.subspaces];
        let encoded: Vec<Vec<u8>> = residuals
            .par_iter()
            .map(|r| {
                let mut code = vec![0u8; self.subspaces];
                encode(&codebooks, sub, r, &mut code);
                code
            })
            .collect();

        debug!(
            "Trained ivf_pq index: {} vectors into {} lists, {} subspaces of {} codes",
            live.len(),
            centroids.len(),
            self.subspaces,
            codebooks.first().map(Vec::len).unwrap_or(0)
        );

        self.lists = vec![Vec::new(); centroids.len()];
        for ((slot, list), code) in live.into_iter().zip(assignments).zip(encoded) {
            let start = slot as usize * self.subspaces;
            codes[start..start + self.subspaces].copy_from_slice(&code);
            self.lists[list].push(slot);
            self.list_of[slot as usize] = list as u32;
        }

        self.centroids = centroids;
        self.codebooks = codebooks;
        self.codes = codes;
        self.data = Vec::new();
    }

    /// Lookup table of one list: `table[s * pq_centroids + j]` is the
    /// contribution of code `j` in subspace `s`.
    fn lookup_table(&self, query: &[f32], list: usize) -> (f32, Vec<f32>) {
        let sub = self.sub_dimension;
        let mut table = vec![0.0f32; self.subspaces * self.pq_centroids];

        match self.metric {
            VectorMetric::L2 => {
                let shifted = residual(query, &self.centroids[list]);
                for (s, book) in self.codebooks.iter().enumerate() {
                    let part = &shifted[s * sub..(s + 1) * sub];
                    for (j, entry) in book.iter().enumerate() {
                        table[s * self.pq_centroids + j] = squared_l2(part, entry);
                    }
                }
                (0.0, table)
            }
            VectorMetric::Cosine | VectorMetric::Dot => {
                for (s, book) in self.codebooks.iter().enumerate() {
                    let part = &query[s * sub..(s + 1) * sub];
                    for (j, entry) in book.iter().enumerate() {
                        table[s * self.pq_centroids + j] = dot_product(part, entry);
                    }
                }
                (dot_product(query, &self.centroids[list]), table)
            }
        }
    }

    fn approximate_score(&self, base: f32, table: &[f32], code: &[u8]) -> f32 {
        let sum: f32 = code
            .iter()
            .enumerate()
            .map(|(s, &j)| table[s * self.pq_centroids + j as usize])
            .sum();
        match self.metric {
            VectorMetric::L2 => -sum.sqrt(),
            VectorMetric::Cosine | VectorMetric::Dot => base + sum,
        }
    }

    fn scored(
        &self,
        query: &[f32],
        filter: Option<&LabelFilter<'_>>,
    ) -> Vec<(InternalId, Label, f32)> {
        let query = self.prepare(query);
        let keep = |slot: u32| -> Option<Label> {
            let label = self.owners[slot as usize]?;
            if filter.is_some_and(|f| !f(label)) {
                return None;
            }
            Some(label)
        };

        if !self.is_trained() {
            return self
                .unassigned
                .iter()
                .filter_map(|&slot| {
                    let label = keep(slot)?;
                    let score = self.metric.score(&query, self.raw(slot));
                    Some((InternalId(slot), label, score))
                })
                .collect();
        }

        let mut ranked: Vec<(usize, f32)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(i, c)| (i, self.metric.score(&query, c)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut scored = Vec::new();
        for (list, _) in ranked.into_iter().take(self.n_probes) {
            if self.lists[list].is_empty() {
                continue;
            }
            let (base, table) = self.lookup_table(&query, list);
            for &slot in &self.lists[list] {
                if let Some(label) = keep(slot) {
                    let score = self.approximate_score(base, &table, self.code(slot));
                    scored.push((InternalId(slot), label, score));
                }
            }
        }
        scored
    }
}

impl IndexBackend for IvfPqIndex {
    fn algorithm(&self) -> Algorithm {
        Algorithm::IvfPq
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

        let prepared = self.prepare(vector);
        let slot = self.allocate(label)?;
        self.store(slot, &prepared);
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
                .into_iter()
                .filter(|&(_, _, score)| metric.score_to_distance(score) <= radius),
        ))
    }

    fn memory_usage(&self) -> usize {
        let vectors = |v: &Vec<Vec<f32>>| {
            v.iter()
                .map(|c| size_of::<Vec<f32>>() + c.capacity() * size_of::<f32>())
                .sum::<usize>()
        };
        size_of::<Self>()
            + self.data.capacity() * size_of::<f32>()
            + self.codes.capacity()
            + self.owners.capacity() * size_of::<Option<Label>>()
            + self.list_of.capacity() * size_of::<u32>()
            + self.free.capacity() * size_of::<u32>()
            + self.unassigned.capacity() * size_of::<u32>()
            + vectors(&self.centroids)
            + self
                .codebooks
                .iter()
                .map(|book| size_of::<Vec<Vec<f32>>>() + vectors(book))
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
        details.insert("pqSubspaces".to_string(), self.subspaces.into());
        details.insert("pqCentroids".to_string(), self.pq_centroids.into());
        details.insert("trainingSize".to_string(), self.training_size.into());
        details.insert("trained".to_string(), self.is_trained().into());
        details.insert("unassigned".to_string(), self.unassigned.len().into());

        IndexInfo {
            algorithm: Algorithm::IvfPq,
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

fn residual(vector: &[f32], centroid: &[f32]) -> Vec<f32> {
    vector.iter().zip(centroid).map(|(v, c)| v - c).collect()
}

/// Write the nearest codebook entry of each subspace of `residual` to `out`.
fn encode(codebooks: &[Vec<Vec<f32>>], sub_dimension: usize, residual: &[f32], out: &mut [u8]) {
    for ((book, part), code) in codebooks
        .iter()
        .zip(residual.chunks_exact(sub_dimension))
        .zip(out.iter_mut())
    {
        let mut best = 0;
        let mut best_distance = f32::MAX;
        for (j, entry) in book.iter().enumerate() {
            let distance = squared_l2(part, entry);
            if distance < best_distance {
                best_distance = distance;
                best = j;
            }
        }
        *code = best as u8;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::backend::ivf::IvfFlatIndex;
    use crate::vector::config::{CommonParams, IvfParams};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn params(metric: VectorMetric, dimension: usize, training: usize) -> IvfPqParams {
        IvfPqParams::new(
            CommonParams::new(dimension)
                .with_metric(metric)
                .with_block_size(8),
        )
        .with_lists(4)
        .with_probes(1)
        .with_subspaces(2)
        .with_centroids(16)
        .with_training_size(training)
        .with_seed(5)
    }

    /// Four separated clusters in 4-D, `per` points each, labelled by cluster.
    fn clustered(per: usize) -> Vec<Vec<f32>> {
        let centers = [
            [0.0, 0.0, 0.0, 0.0],
            [10.0, 0.0, 10.0, 0.0],
            [0.0, 10.0, 0.0, 10.0],
            [10.0, 10.0, 10.0, 10.0],
        ];
        let mut rng = StdRng::seed_from_u64(9);
        centers
            .iter()
            .flat_map(|center| {
                (0..per)
                    .map(|_| center.iter().map(|c| c + rng.gen_range(-0.5..0.5)).collect())
                    .collect::<Vec<Vec<f32>>>()
            })
            .collect()
    }

    #[test]
    fn test_rejects_uneven_subspaces() {
        let bad = params(VectorMetric::L2, 5, 10);
        assert!(matches!(
            IvfPqIndex::new(&bad),
            Err(IndexError::InvalidParams { .. })
        ));
    }

    #[test]
    fn test_untrained_search_is_exact() {
        let mut pq = IvfPqIndex::new(&params(VectorMetric::L2, 4, 100)).unwrap();
        pq.insert(Label(1), &[0.0, 0.0, 0.0, 0.0]).unwrap();
        pq.insert(Label(2), &[3.0, 4.0, 0.0, 0.0]).unwrap();

        assert!(!pq.is_trained());
        let hits = pq.top_k(&[3.0, 4.0, 0.0, 0.0], 2, None).unwrap();
        assert_eq!(hits[0], SearchHit::new(2u64, -0.0));
        assert_eq!(hits[1].label, Label(1));
        assert_eq!(hits[1].score, -5.0);
    }

    #[test]
    fn test_training_encodes_and_drops_raw_vectors() {
        let mut pq = IvfPqIndex::new(&params(VectorMetric::L2, 4, 40)).unwrap();
        for (i, v) in clustered(10).iter().enumerate() {
            pq.insert(Label(i as u64), v).unwrap();
        }

        assert!(pq.is_trained());
        assert!(pq.data.is_empty());
        assert_eq!(pq.code_size(), 2);
        assert_eq!(pq.codes.len(), 40 * 2);
        assert_eq!(pq.codebooks.len(), 2);
        assert!(pq.codebooks.iter().all(|book| book.len() <= 16));
        assert_eq!(pq.lists.iter().map(Vec::len).sum::<usize>(), 40);

        // One probe lands in the query's own cluster
        let hits = pq.top_k(&[10.0, 10.0, 10.0, 10.0], 5, None).unwrap();
        assert_eq!(hits.len(), 5);
        assert!(hits.iter().all(|h| h.label.value() >= 30));

        // Inserts after training are encoded directly
        pq.insert(Label(100), &[0.0, 10.0, 0.0, 10.0]).unwrap();
        assert_eq!(pq.codes.len(), 41 * 2);
        let hits = pq.top_k(&[0.0, 10.0, 0.0, 10.0], 11, None).unwrap();
        assert!(hits.iter().any(|h| h.label == Label(100)));
        assert!(hits
            .iter()
            .all(|h| (20..30).contains(&h.label.value()) || h.label == Label(100)));
    }

    #[test]
    fn test_codes_take_less_memory_than_flat_lists() {
        let dimension = 32;
        let mut rng = StdRng::seed_from_u64(1);
        let vectors: Vec<Vec<f32>> = (0..256)
            .map(|_| (0..dimension).map(|_| rng.gen_range(-1.0..1.0)).collect())
            .collect();

        let common = CommonParams::new(dimension)
            .with_metric(VectorMetric::L2)
            .with_block_size(64);
        let mut pq = IvfPqIndex::new(
            &IvfPqParams::new(common.clone())
                .with_lists(4)
                .with_subspaces(8)
                .with_centroids(16)
                .with_training_size(128)
                .with_seed(2),
        )
        .unwrap();
        let mut flat = IvfFlatIndex::new(
            &IvfParams::new(common)
                .with_lists(4)
                .with_training_size(128)
                .with_seed(2),
        );
        for (i, v) in vectors.iter().enumerate() {
            pq.insert(Label(i as u64), v).unwrap();
            flat.insert(Label(i as u64), v).unwrap();
        }

        assert!(pq.is_trained());
        assert!(pq.memory_usage() < flat.memory_usage());
        assert_eq!(pq.info().details["trained"], true);
    }

    #[test]
    fn test_cosine_scores_follow_direction() {
        let mut pq = IvfPqIndex::new(
            &params(VectorMetric::Cosine, 4, 20)
                .with_lists(2)
                .with_probes(2),
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        for i in 0..20u64 {
            let scale = rng.gen_range(1.0..5.0);
            let jitter = rng.gen_range(-0.05..0.05);
            let vector = if i < 10 {
                [scale, jitter, 0.0, 0.0]
            } else {
                [0.0, 0.0, scale, jitter]
            };
            pq.insert(Label(i), &vector).unwrap();
        }

        assert!(pq.is_trained());
        let hits = pq.top_k(&[0.0, 0.0, 100.0, 0.0], 10, None).unwrap();
        assert!(hits.iter().all(|h| h.label.value() >= 10));
        assert!(hits[0].score > 0.9);
    }

    #[test]
    fn test_remove_replace_and_reuse() {
        let mut pq = IvfPqIndex::new(&params(VectorMetric::L2, 4, 8)).unwrap();
        for (i, v) in clustered(2).iter().enumerate() {
            pq.insert(Label(i as u64), v).unwrap();
        }
        assert!(pq.is_trained());

        // Single-value insert replaces the old copy
        pq.insert(Label(0), &[10.0, 10.0, 10.0, 10.0]).unwrap();
        assert_eq!(pq.count_label(Label(0)), 1);
        assert_eq!(pq.len(), 8);

        assert_eq!(pq.remove(Label(3)).unwrap(), 1);
        assert_eq!(pq.remove(Label(3)).unwrap(), 0);
        assert_eq!(pq.len(), 7);
        let hits = pq.top_k(&[10.0, 0.0, 10.0, 0.0], 8, None).unwrap();
        assert!(hits.iter().all(|h| h.label != Label(3)));

        pq.insert(Label(9), &[10.0, 0.0, 10.0, 0.0]).unwrap();
        assert_eq!(pq.owners.len(), 8);
        assert_eq!(pq.label_count(), 8);
    }

    #[test]
    fn test_multi_value_filter_and_range() {
        let mut multi = params(VectorMetric::L2, 4, 100);
        multi.common.multi = true;
        let mut pq = IvfPqIndex::new(&multi).unwrap();
        pq.insert(Label(1), &[0.0, 0.0, 0.0, 0.0]).unwrap();
        pq.insert(Label(1), &[0.5, 0.0, 0.0, 0.0]).unwrap();
        pq.insert(Label(2), &[0.2, 0.0, 0.0, 0.0]).unwrap();
        pq.insert(Label(3), &[6.0, 0.0, 0.0, 0.0]).unwrap();

        assert_eq!(pq.count_label(Label(1)), 2);
        let hits = pq.top_k(&[0.0, 0.0, 0.0, 0.0], 5, None).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].label, Label(1));

        let not_one = |label: Label| label != Label(1);
        let hits = pq.top_k(&[0.0, 0.0, 0.0, 0.0], 1, Some(&not_one)).unwrap();
        assert_eq!(hits[0].label, Label(2));

        let hits = pq.range(&[0.0, 0.0, 0.0, 0.0], 1.0, None).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(pq.remove(Label(1)).unwrap(), 2);
    }
}
