//! Vector index traits and core types.
//!
//! This module defines the two seams of the library:
//!
//! - [`IndexBackend`]: the capability set every algorithm implements
//!   (insert, remove, search, memory accounting). Backends are plain
//!   single-owner structures; callers provide the locking.
//! - [`VectorIndex`]: the unified, thread-safe index contract exposed to users.
//!   Standalone indexes and the tiered coordinator both implement it, so they
//!   are interchangeable.

use std::collections::BTreeMap;

use crate::error::IndexResult;
use serde::{Deserialize, Serialize};

// ============================================================================
// Label
// ============================================================================

/// User-visible identifier of a vector.
///
/// Labels are the only identifiers that cross index boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(pub u64);

impl Label {
    /// Create a new label.
    pub fn new(id: u64) -> Self {
        Label(id)
    }

    /// Get the underlying label value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Label {
    fn from(id: u64) -> Self {
        Label(id)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// InternalId
// ============================================================================

/// Dense slot identifier, meaningful only inside the index that assigned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InternalId(pub(crate) u32);

impl InternalId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

// ============================================================================
// VectorMetric
// ============================================================================

/// Distance metric for vector similarity search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorMetric {
    /// Cosine similarity (default).
    #[default]
    Cosine,
    /// Dot product.
    Dot,
    /// Euclidean (L2) distance.
    L2,
}

impl VectorMetric {
    /// Get the metric name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorMetric::Cosine => "cosine",
            VectorMetric::Dot => "dot",
            VectorMetric::L2 => "l2",
        }
    }
}

impl std::fmt::Display for VectorMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VectorMetric {
    type Err = crate::error::IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "dot" | "ip" | "inner_product" => Ok(Self::Dot),
            "l2" | "euclidean" => Ok(Self::L2),
            other => Err(crate::error::IndexError::invalid_params(format!(
                "unknown metric '{}' (expected cosine, dot or l2)",
                other
            ))),
        }
    }
}

// ============================================================================
// Algorithm
// ============================================================================

/// Index algorithm identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Brute-force exact search.
    Flat,
    /// Hierarchical navigable small world graph.
    Hnsw,
    /// Inverted-file index with flat (unquantized) lists.
    IvfFlat,
    /// Inverted-file index with product-quantized lists.
    IvfPq,
    /// Flat write buffer in front of another algorithm.
    Tiered,
}

impl Algorithm {
    /// Get the algorithm name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Flat => "flat",
            Algorithm::Hnsw => "hnsw",
            Algorithm::IvfFlat => "ivf_flat",
            Algorithm::IvfPq => "ivf_pq",
            Algorithm::Tiered => "tiered",
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// VectorRecord
// ============================================================================

/// A labelled vector handed to a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Owner label.
    pub label: Label,

    /// The vector components.
    pub vector: Vec<f32>,
}

impl VectorRecord {
    /// Create a new record.
    pub fn new(label: impl Into<Label>, vector: Vec<f32>) -> Self {
        Self {
            label: label.into(),
            vector,
        }
    }
}

// ============================================================================
// SearchHit
// ============================================================================

/// A single result from a similarity search.
///
/// Scores are similarities: higher is better for every metric
/// (L2 distances are negated).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Label of the matched vector.
    pub label: Label,

    /// Similarity score.
    pub score: f32,
}

impl SearchHit {
    /// Create a new search hit.
    pub fn new(label: impl Into<Label>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Label predicate applied inside backend searches.
///
/// Labels rejected by the filter are still used for graph navigation but never
/// returned.
pub type LabelFilter<'a> = dyn Fn(Label) -> bool + Sync + 'a;

// ============================================================================
// BatchInsert
// ============================================================================

/// Result of a bulk insert. Records are inserted in order; on failure,
/// `inserted` counts the prefix that made it in.
#[derive(Debug)]
pub struct BatchInsert {
    /// Number of records inserted (a prefix of the batch).
    pub inserted: usize,

    /// Error that stopped the batch, if any.
    pub error: Option<crate::error::IndexError>,
}

impl BatchInsert {
    /// Whether every record was inserted.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

// ============================================================================
// IndexInfo
// ============================================================================

/// Snapshot of an index's shape and statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    /// Algorithm of this index.
    pub algorithm: Algorithm,

    /// Vector dimension.
    pub dimension: usize,

    /// Distance metric.
    pub metric: VectorMetric,

    /// Whether labels may hold several vectors.
    pub multi: bool,

    /// Number of live vectors.
    pub size: usize,

    /// Number of distinct labels.
    pub label_count: usize,

    /// Approximate bytes held by the index.
    pub memory_bytes: usize,

    /// Algorithm-specific statistics.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, serde_json::Value>,
}

// ============================================================================
// IndexBackend Trait
// ============================================================================

/// Capability set every index algorithm implements.
///
/// ## Implementation Notes
///
/// - Mutations take `&mut self`; the owner decides how to lock.
/// - Searches return hits sorted by score (best first); ties keep ascending
///   internal id order so results are deterministic.
/// - In single-value mode, inserting an existing label replaces its vector.
/// - `remove` performs whatever structural repair the algorithm needs.
pub trait IndexBackend: Send + Sync {
    /// Algorithm implemented by this backend.
    fn algorithm(&self) -> Algorithm;

    /// Dimension of vectors in this index.
    fn dimension(&self) -> usize;

    /// Distance metric used by this index.
    fn metric(&self) -> VectorMetric;

    /// Whether labels may hold several vectors.
    fn is_multi(&self) -> bool;

    /// Number of live vectors.
    fn len(&self) -> usize;

    /// Check if the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct labels.
    fn label_count(&self) -> usize;

    /// Number of vectors stored under `label`.
    fn count_label(&self, label: Label) -> usize;

    /// Insert one vector, returning the slot it was assigned.
    fn insert(&mut self, label: Label, vector: &[f32]) -> IndexResult<InternalId>;

    /// Insert many vectors under one mutation.
    fn insert_batch(&mut self, records: &[VectorRecord]) -> BatchInsert {
        for (done, record) in records.iter().enumerate() {
            if let Err(e) = self.insert(record.label, &record.vector) {
                return BatchInsert {
                    inserted: done,
                    error: Some(e),
                };
            }
        }
        BatchInsert {
            inserted: records.len(),
            error: None,
        }
    }

    /// Remove every vector stored under `label`, returning how many were removed.
    fn remove(&mut self, label: Label) -> IndexResult<usize>;

    /// Return up to `k` best hits, at most one per label.
    fn top_k(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&LabelFilter<'_>>,
    ) -> IndexResult<Vec<SearchHit>>;

    /// Return every label with a vector within `radius` of the query,
    /// measured with [`VectorMetric::distance`].
    fn range(
        &self,
        query: &[f32],
        radius: f32,
        filter: Option<&LabelFilter<'_>>,
    ) -> IndexResult<Vec<SearchHit>>;

    /// Approximate bytes held by this index.
    fn memory_usage(&self) -> usize;

    /// Shape and statistics snapshot.
    fn info(&self) -> IndexInfo;
}

// ============================================================================
// VectorIndex Trait
// ============================================================================

/// Thread-safe index contract shared by standalone and tiered indexes.
pub trait VectorIndex: Send + Sync {
    /// Add a vector under `label`.
    ///
    /// Returns the net number of vectors added: `1` for a new vector, `0` when
    /// a single-value label was overwritten.
    fn add_vector(&self, label: Label, vector: &[f32]) -> IndexResult<usize>;

    /// Delete every vector under `label`, returning how many were removed.
    fn delete_vector(&self, label: Label) -> IndexResult<usize>;

    /// Return the `k` best labels for `query`, best first.
    fn top_k(&self, query: &[f32], k: usize) -> IndexResult<Vec<SearchHit>>;

    /// Return every label within `radius` of `query`, best first.
    fn range(&self, query: &[f32], radius: f32) -> IndexResult<Vec<SearchHit>>;

    /// Shape and statistics snapshot.
    fn info(&self) -> IndexInfo;

    /// Number of live vectors.
    fn len(&self) -> usize;

    /// Check if the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension of vectors in this index.
    fn dimension(&self) -> usize;

    /// Distance metric used by this index.
    fn metric(&self) -> VectorMetric;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label() {
        let label = Label::new(123);
        assert_eq!(label.value(), 123);
        assert_eq!(label.to_string(), "123");

        let from_u64: Label = 456u64.into();
        assert_eq!(from_u64.value(), 456);
    }

    #[test]
    fn test_vector_metric() {
        assert_eq!(VectorMetric::Cosine.as_str(), "cosine");
        assert_eq!(VectorMetric::Dot.as_str(), "dot");
        assert_eq!(VectorMetric::L2.as_str(), "l2");
        assert_eq!(VectorMetric::default(), VectorMetric::Cosine);

        assert_eq!("Euclidean".parse::<VectorMetric>().unwrap(), VectorMetric::L2);
        assert_eq!("ip".parse::<VectorMetric>().unwrap(), VectorMetric::Dot);
        assert!("hamming".parse::<VectorMetric>().is_err());
    }

    #[test]
    fn test_algorithm_serialization() {
        let json = serde_json::to_string(&Algorithm::IvfFlat).unwrap();
        assert_eq!(json, "\"ivf_flat\"");
        assert_eq!(Algorithm::Tiered.to_string(), "tiered");
    }

    #[test]
    fn test_info_skips_empty_details() {
        let info = IndexInfo {
            algorithm: Algorithm::Flat,
            dimension: 3,
            metric: VectorMetric::L2,
            multi: false,
            size: 0,
            label_count: 0,
            memory_bytes: 64,
            details: BTreeMap::new(),
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"labelCount\":0"));
        assert!(!json.contains("details"));
    }
}
