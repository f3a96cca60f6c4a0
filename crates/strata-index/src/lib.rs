//! # strata-index
//!
//! In-memory vector similarity indexes with a tiered write path.
//!
//! Every index answers top-k and range queries over fixed-dimension `f32`
//! vectors identified by [`Label`]s, under cosine, dot-product or L2 metrics.
//!
//! ## Modules
//!
//! - `vector`: the index contract, the algorithms (flat, HNSW, IVF) and the
//!   construction factory
//! - `tiered`: a flat write buffer in front of a slower index, kept in sync by
//!   background jobs that a caller-owned worker pool executes
//! - `error`: the shared error type
//!
//! ## Architecture
//!
//! ```text
//! caller ──add/delete/search──▶ TieredIndex ──▶ frontend (FlatIndex)
//!                                    │      └──▶ backend (HNSW / IVF / flat)
//!                                    └─submit──▶ JobQueue ◀──pop── workers
//! ```
//!
//! Standalone indexes skip the buffer and are wrapped in a [`LockedIndex`].
//!
//! ## Features
//!
//! - `ivf` (default): inverted-file backends (flat and product-quantized lists)
//!   with k-means training
//!
//! ## Usage
//!
//! ```
//! use strata_index::vector::{new_index, CommonParams, FlatParams, VectorIndex};
//! use strata_index::Label;
//!
//! let index = new_index(&FlatParams::new(CommonParams::new(2)).into(), None)?;
//! index.add_vector(Label(7), &[0.6, 0.8])?;
//!
//! let hits = index.range(&[0.6, 0.8], 0.1)?;
//! assert_eq!(hits[0].label, Label(7));
//! # Ok::<(), strata_index::IndexError>(())
//! ```
//!
//! [`Label`]: vector::Label
//! [`LockedIndex`]: vector::LockedIndex

pub mod error;
pub mod tiered;
pub mod vector;

pub use error::{IndexError, IndexResult};
pub use tiered::{FifoJobQueue, Job, JobQueue, TieredIndex};
pub use vector::{IndexParams, Label, SearchHit, VectorIndex, VectorMetric};
