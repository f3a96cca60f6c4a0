//! Thread-safe wrapper for a standalone backend.

use super::super::distance::validate_vector;
use super::super::traits::{IndexBackend, IndexInfo, Label, SearchHit, VectorIndex, VectorMetric};
use crate::error::IndexResult;
use parking_lot::RwLock;
use tracing::trace;

/// A single backend behind a reader-writer lock.
///
/// Searches share the lock; writes take it exclusively and apply immediately.
pub struct LockedIndex {
    dimension: usize,
    metric: VectorMetric,
    backend: RwLock<Box<dyn IndexBackend>>,
}

impl LockedIndex {
    /// Wrap a backend.
    pub fn new(backend: Box<dyn IndexBackend>) -> Self {
        Self {
            dimension: backend.dimension(),
            metric: backend.metric(),
            backend: RwLock::new(backend),
        }
    }
}

impl VectorIndex for LockedIndex {
    fn add_vector(&self, label: Label, vector: &[f32]) -> IndexResult<usize> {
        validate_vector(self.dimension, vector)?;

        let mut backend = self.backend.write();
        let replaced = !backend.is_multi() && backend.count_label(label) > 0;
        backend.insert(label, vector)?;
        Ok(if replaced { 0 } else { 1 })
    }

    fn delete_vector(&self, label: Label) -> IndexResult<usize> {
        self.backend.write().remove(label)
    }

    fn top_k(&self, query: &[f32], k: usize) -> IndexResult<Vec<SearchHit>> {
        trace!("Standalone top-k search, k={}", k);
        self.backend.read().top_k(query, k, None)
    }

    fn range(&self, query: &[f32], radius: f32) -> IndexResult<Vec<SearchHit>> {
        self.backend.read().range(query, radius, None)
    }

    fn info(&self) -> IndexInfo {
        self.backend.read().info()
    }

    fn len(&self) -> usize {
        self.backend.read().len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> VectorMetric {
        self.metric
    }
}
