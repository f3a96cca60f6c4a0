//! Index algorithm implementations and the construction factory.
//!
//! ## Available Algorithms
//!
//! - `flat`: exact brute-force scan
//! - `hnsw`: hierarchical navigable small world graph
//! - `ivf_flat` (feature `ivf`): k-means inverted lists
//! - `ivf_pq` (feature `ivf`): inverted lists of product-quantized codes
//! - `tiered`: a flat buffer in front of any of the above

mod flat;
mod hnsw;
#[cfg(feature = "ivf")]
mod ivf;
#[cfg(feature = "ivf")]
mod ivf_pq;
mod locked;

pub use flat::FlatIndex;
pub use hnsw::HnswIndex;
#[cfg(feature = "ivf")]
pub use ivf::IvfFlatIndex;
#[cfg(feature = "ivf")]
pub use ivf_pq::IvfPqIndex;
pub use locked::LockedIndex;

use super::config::{CommonParams, IndexParams, IvfParams, IvfPqParams, TieredParams};
use super::traits::{Algorithm, IndexBackend, InternalId, Label, SearchHit, VectorIndex};
use crate::error::{IndexError, IndexResult};
use crate::tiered::{JobQueue, TieredIndex};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::mem::size_of;
use std::sync::Arc;
use tracing::{debug, warn};

/// Build an index from parameters.
///
/// Standalone algorithms are wrapped in a [`LockedIndex`]. A tiered index
/// needs a `job_queue` to submit its migration jobs to.
///
/// # Errors
///
/// Returns an error if:
/// - The parameters fail validation
/// - The algorithm is not compiled into this build
/// - A tiered index is requested without a job queue, or nested in another tiered index
pub fn new_index(
    params: &IndexParams,
    job_queue: Option<Arc<dyn JobQueue>>,
) -> IndexResult<Arc<dyn VectorIndex>> {
    debug!(
        "Creating {} index (dimension={})",
        params.algorithm(),
        params.dimension()
    );

    for warning in params.validate()? {
        warn!("{}", warning);
    }

    match params {
        IndexParams::Tiered(tiered) => {
            let queue = job_queue.ok_or_else(|| {
                IndexError::invalid_params("a tiered index requires a job queue")
            })?;
            let index: Arc<dyn VectorIndex> = new_tiered_index(tiered, queue)?;
            Ok(index)
        }
        _ => Ok(Arc::new(LockedIndex::new(new_backend(params)?))),
    }
}

/// Build a tiered index from parameters.
pub fn new_tiered_index(
    params: &TieredParams,
    job_queue: Arc<dyn JobQueue>,
) -> IndexResult<Arc<TieredIndex>> {
    for warning in params.primary.validate()? {
        warn!("{}", warning);
    }

    let backend = new_backend(&params.primary)?;
    Ok(TieredIndex::build(
        backend,
        frontend_params(params.primary.common(), params.swap_threshold),
        params.swap_threshold,
        job_queue,
    ))
}

/// Build a bare backend for a standalone algorithm.
pub fn new_backend(params: &IndexParams) -> IndexResult<Box<dyn IndexBackend>> {
    match params {
        IndexParams::Flat(p) => Ok(Box::new(FlatIndex::new(p))),
        IndexParams::Hnsw(p) => Ok(Box::new(HnswIndex::new(p))),
        IndexParams::IvfFlat(p) => ivf_backend(p),
        IndexParams::IvfPq(p) => ivf_pq_backend(p),
        IndexParams::Tiered(_) => Err(IndexError::unsupported(
            Algorithm::Tiered.as_str(),
            "a tiered index cannot be used as a backend",
        )),
    }
}

#[cfg(feature = "ivf")]
fn ivf_backend(params: &IvfParams) -> IndexResult<Box<dyn IndexBackend>> {
    Ok(Box::new(IvfFlatIndex::new(params)))
}

#[cfg(not(feature = "ivf"))]
fn ivf_backend(_params: &IvfParams) -> IndexResult<Box<dyn IndexBackend>> {
    Err(ivf_unavailable(Algorithm::IvfFlat))
}

#[cfg(feature = "ivf")]
fn ivf_pq_backend(params: &IvfPqParams) -> IndexResult<Box<dyn IndexBackend>> {
    Ok(Box::new(IvfPqIndex::new(params)?))
}

#[cfg(not(feature = "ivf"))]
fn ivf_pq_backend(_params: &IvfPqParams) -> IndexResult<Box<dyn IndexBackend>> {
    Err(ivf_unavailable(Algorithm::IvfPq))
}

#[cfg(not(feature = "ivf"))]
fn ivf_unavailable(algorithm: Algorithm) -> IndexError {
    IndexError::unsupported(
        algorithm.as_str(),
        "this build was compiled without the `ivf` feature",
    )
}

/// Frontend buffer shape for a tiered index.
///
/// The buffer rarely holds more than `swap_threshold` vectors, so it grows
/// in blocks of that size.
pub(crate) fn frontend_params(primary: &CommonParams, swap_threshold: usize) -> CommonParams {
    let block = if swap_threshold > 0 {
        swap_threshold.min(primary.block_size)
    } else {
        primary.block_size
    };
    primary.clone().with_block_size(block)
}

/// Bytes a freshly built index will allocate, without building it.
///
/// For a tiered index this is the backend, the frontend buffer and the
/// coordinator itself. Queue contents are not included.
pub fn estimate_initial_size(params: &IndexParams) -> IndexResult<usize> {
    match params {
        IndexParams::Tiered(tiered) => {
            if let IndexParams::Tiered(_) = *tiered.primary {
                return Err(IndexError::unsupported(
                    Algorithm::Tiered.as_str(),
                    "a tiered index cannot use another tiered index as its primary",
                ));
            }
            let backend = backend_initial_size(&tiered.primary)?;
            let frontend = FlatIndex::estimate_initial_size(&frontend_params(
                tiered.primary.common(),
                tiered.swap_threshold,
            ));
            Ok(backend + frontend + size_of::<TieredIndex>())
        }
        _ => Ok(backend_initial_size(params)? + size_of::<LockedIndex>()),
    }
}

/// Bytes each stored vector adds once it reaches its final index.
pub fn estimate_element_size(params: &IndexParams) -> IndexResult<usize> {
    match params {
        IndexParams::Flat(p) => Ok(FlatIndex::estimate_element_size(&p.common)),
        IndexParams::Hnsw(p) => Ok(HnswIndex::estimate_element_size(p)),
        IndexParams::IvfFlat(p) => ivf_element_size(p),
        IndexParams::IvfPq(p) => ivf_pq_element_size(p),
        IndexParams::Tiered(tiered) => match *tiered.primary {
            IndexParams::Tiered(_) => Err(IndexError::unsupported(
                Algorithm::Tiered.as_str(),
                "a tiered index cannot use another tiered index as its primary",
            )),
            ref primary => estimate_element_size(primary),
        },
    }
}

fn backend_initial_size(params: &IndexParams) -> IndexResult<usize> {
    match params {
        IndexParams::Flat(p) => Ok(FlatIndex::estimate_initial_size(&p.common)),
        IndexParams::Hnsw(p) => Ok(HnswIndex::estimate_initial_size(p)),
        IndexParams::IvfFlat(p) => ivf_initial_size(p),
        IndexParams::IvfPq(p) => ivf_pq_initial_size(p),
        IndexParams::Tiered(_) => Err(IndexError::unsupported(
            Algorithm::Tiered.as_str(),
            "a tiered index cannot be used as a backend",
        )),
    }
}

#[cfg(feature = "ivf")]
fn ivf_initial_size(params: &IvfParams) -> IndexResult<usize> {
    Ok(IvfFlatIndex::estimate_initial_size(params))
}

#[cfg(not(feature = "ivf"))]
fn ivf_initial_size(_params: &IvfParams) -> IndexResult<usize> {
    Err(ivf_unavailable(Algorithm::IvfFlat))
}

#[cfg(feature = "ivf")]
fn ivf_element_size(params: &IvfParams) -> IndexResult<usize> {
    Ok(IvfFlatIndex::estimate_element_size(params))
}

#[cfg(not(feature = "ivf"))]
fn ivf_element_size(_params: &IvfParams) -> IndexResult<usize> {
    Err(ivf_unavailable(Algorithm::IvfFlat))
}

#[cfg(feature = "ivf")]
fn ivf_pq_initial_size(params: &IvfPqParams) -> IndexResult<usize> {
    Ok(IvfPqIndex::estimate_initial_size(params))
}

#[cfg(not(feature = "ivf"))]
fn ivf_pq_initial_size(_params: &IvfPqParams) -> IndexResult<usize> {
    Err(ivf_unavailable(Algorithm::IvfPq))
}

#[cfg(feature = "ivf")]
fn ivf_pq_element_size(params: &IvfPqParams) -> IndexResult<usize> {
    Ok(IvfPqIndex::estimate_element_size(params))
}

#[cfg(not(feature = "ivf"))]
fn ivf_pq_element_size(_params: &IvfPqParams) -> IndexResult<usize> {
    Err(ivf_unavailable(Algorithm::IvfPq))
}

/// Algorithms compiled into this build.
#[allow(clippy::vec_init_then_push)]
pub fn available_algorithms() -> Vec<Algorithm> {
    let mut algorithms = vec![Algorithm::Flat, Algorithm::Hnsw];

    #[cfg(feature = "ivf")]
    algorithms.extend([Algorithm::IvfFlat, Algorithm::IvfPq]);

    algorithms.push(Algorithm::Tiered);
    algorithms
}

/// Keep the best-scoring slot per label and rank the survivors.
///
/// Order is score descending, then ascending internal id.
pub(crate) fn rank_best_per_label(
    scored: impl IntoIterator<Item = (InternalId, Label, f32)>,
) -> Vec<SearchHit> {
    let mut best: HashMap<Label, (f32, InternalId)> = HashMap::new();
    for (id, label, score) in scored {
        match best.entry(label) {
            Entry::Occupied(mut entry) => {
                let (kept_score, kept_id) = *entry.get();
                if score > kept_score || (score == kept_score && id < kept_id) {
                    entry.insert((score, id));
                }
            }
            Entry::Vacant(entry) => {
                entry.insert((score, id));
            }
        }
    }

    let mut ranked: Vec<(f32, InternalId, Label)> = best
        .into_iter()
        .map(|(label, (score, id))| (score, id, label))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

    ranked
        .into_iter()
        .map(|(score, _, label)| SearchHit { label, score })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
