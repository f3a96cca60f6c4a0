//! Vector index algorithms for strata-index.
//!
//! ## Available Algorithms
//!
//! - `flat`: exact brute-force scan, also the tiered write buffer
//! - `hnsw`: hierarchical navigable small world graph
//! - `ivf_flat` (feature `ivf`): k-means inverted lists
//! - `ivf_pq` (feature `ivf`): inverted lists of product-quantized codes
//!
//! ## Usage
//!
//! ```
//! use strata_index::vector::{new_index, CommonParams, HnswParams, Label, VectorIndex, VectorMetric};
//!
//! let params = HnswParams::new(CommonParams::new(3).with_metric(VectorMetric::L2)).into();
//! let index = new_index(&params, None)?;
//!
//! index.add_vector(Label(1), &[0.0, 0.0, 1.0])?;
//! let hits = index.top_k(&[0.0, 0.0, 0.9], 1)?;
//! assert_eq!(hits[0].label, Label(1));
//! # Ok::<(), strata_index::IndexError>(())
//! ```

mod backend;
mod config;
mod distance;
mod traits;

// Re-export main types
pub use config::{
    CommonParams, FlatParams, HnswParams, IndexParams, IvfParams, IvfPqParams, TieredParams,
    DEFAULT_BLOCK_SIZE, DEFAULT_HNSW_EF_CONSTRUCTION, DEFAULT_HNSW_EF_RUNTIME,
    DEFAULT_HNSW_EPSILON, DEFAULT_HNSW_M, DEFAULT_IVF_LISTS, DEFAULT_IVF_PROBES,
    DEFAULT_KMEANS_ITERATIONS, DEFAULT_PQ_CENTROIDS, DEFAULT_PQ_SUBSPACES, DEFAULT_SWAP_THRESHOLD,
};
pub use distance::{
    cosine_similarity, dot_product, euclidean_distance, validate_radius, validate_vector,
};
pub use traits::{
    Algorithm, BatchInsert, IndexBackend, IndexInfo, InternalId, Label, LabelFilter, SearchHit,
    VectorIndex, VectorMetric, VectorRecord,
};

// Re-export factory functions
pub use backend::{
    available_algorithms, estimate_element_size, estimate_initial_size, new_backend, new_index,
    new_tiered_index,
};

// Re-export backends
pub use backend::{FlatIndex, HnswIndex, LockedIndex};

#[cfg(feature = "ivf")]
pub use backend::{IvfFlatIndex, IvfPqIndex};

pub(crate) use backend::frontend_params;
