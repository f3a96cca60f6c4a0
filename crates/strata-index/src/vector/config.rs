//! Index construction parameters.
//!
//! Parameters form a tree tagged by `algorithm`. A tiered index wraps the
//! parameters of its primary (backend) index:
//!
//! ```yaml
//! algorithm: tiered
//! swapThreshold: 1024
//! primary:
//!   algorithm: hnsw
//!   dimension: 128
//!   metric: l2
//!   m: 16
//! ```

use super::traits::{Algorithm, VectorMetric};
use crate::error::{IndexError, IndexResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

// ============================================================================
// Constants
// ============================================================================

/// Default number of vectors reserved per allocation block.
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Default pending count that triggers a batch swap job.
pub const DEFAULT_SWAP_THRESHOLD: usize = 1024;

/// Default HNSW out-degree.
pub const DEFAULT_HNSW_M: usize = 16;

/// Default HNSW construction beam width.
pub const DEFAULT_HNSW_EF_CONSTRUCTION: usize = 200;

/// Default HNSW query beam width.
pub const DEFAULT_HNSW_EF_RUNTIME: usize = 10;

/// Default relative widening of the HNSW range-search boundary.
pub const DEFAULT_HNSW_EPSILON: f32 = 0.01;

/// Default number of IVF lists.
pub const DEFAULT_IVF_LISTS: usize = 64;

/// Default number of IVF lists probed per query.
pub const DEFAULT_IVF_PROBES: usize = 8;

/// Default k-means iterations during IVF training.
pub const DEFAULT_KMEANS_ITERATIONS: usize = 10;

/// Default number of product-quantization subspaces.
pub const DEFAULT_PQ_SUBSPACES: usize = 8;

/// Default codebook size per subspace. Codes are one byte, so this is also the maximum.
pub const DEFAULT_PQ_CENTROIDS: usize = 256;

// ============================================================================
// CommonParams
// ============================================================================

/// Fields shared by every algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonParams {
    /// Dimension of vectors in the index.
    pub dimension: usize,

    /// Distance metric for similarity search.
    #[serde(default)]
    pub metric: VectorMetric,

    /// Whether a label may hold several vectors.
    #[serde(default)]
    pub multi: bool,

    /// Number of vectors reserved per allocation block.
    #[serde(default = "default_block_size")]
    pub block_size: usize,
}

fn default_block_size() -> usize {
    DEFAULT_BLOCK_SIZE
}

impl CommonParams {
    /// Create common params with required fields.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            metric: VectorMetric::Cosine,
            multi: false,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    /// Set the distance metric.
    pub fn with_metric(mut self, metric: VectorMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Allow several vectors per label.
    pub fn with_multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }

    /// Set the allocation block size.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    fn validate(&self) -> IndexResult<Vec<String>> {
        if self.dimension == 0 {
            return Err(IndexError::invalid_params("dimension must be at least 1"));
        }
        if self.block_size == 0 {
            return Err(IndexError::invalid_params("blockSize must be at least 1"));
        }
        Ok(Vec::new())
    }
}

// ============================================================================
// Algorithm params
// ============================================================================

/// Parameters for a brute-force index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatParams {
    #[serde(flatten)]
    pub common: CommonParams,
}

impl FlatParams {
    /// Create flat params.
    pub fn new(common: CommonParams) -> Self {
        Self { common }
    }
}

/// Parameters for an HNSW graph index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HnswParams {
    #[serde(flatten)]
    pub common: CommonParams,

    /// Out-degree on upper layers; layer 0 allows `2 * m`.
    #[serde(default = "default_hnsw_m")]
    pub m: usize,

    /// Beam width while inserting.
    #[serde(default = "default_hnsw_ef_construction")]
    pub ef_construction: usize,

    /// Beam width while searching.
    #[serde(default = "default_hnsw_ef_runtime")]
    pub ef_runtime: usize,

    /// Relative widening of the range-search boundary.
    #[serde(default = "default_hnsw_epsilon")]
    pub epsilon: f32,

    /// Seed for level sampling. Random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_hnsw_m() -> usize {
    DEFAULT_HNSW_M
}

fn default_hnsw_ef_construction() -> usize {
    DEFAULT_HNSW_EF_CONSTRUCTION
}

fn default_hnsw_ef_runtime() -> usize {
    DEFAULT_HNSW_EF_RUNTIME
}

fn default_hnsw_epsilon() -> f32 {
    DEFAULT_HNSW_EPSILON
}

impl HnswParams {
    /// Create HNSW params with default graph settings.
    pub fn new(common: CommonParams) -> Self {
        Self {
            common,
            m: DEFAULT_HNSW_M,
            ef_construction: DEFAULT_HNSW_EF_CONSTRUCTION,
            ef_runtime: DEFAULT_HNSW_EF_RUNTIME,
            epsilon: DEFAULT_HNSW_EPSILON,
            seed: None,
        }
    }

    /// Set the out-degree.
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    /// Set the construction beam width.
    pub fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    /// Set the query beam width.
    pub fn with_ef_runtime(mut self, ef: usize) -> Self {
        self.ef_runtime = ef;
        self
    }

    /// Set the range-search widening factor.
    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Fix the level-sampling seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn validate(&self) -> IndexResult<Vec<String>> {
        let mut warnings = self.common.validate()?;
        if self.m < 2 {
            return Err(IndexError::invalid_params("hnsw m must be at least 2"));
        }
        if self.ef_runtime == 0 {
            return Err(IndexError::invalid_params("hnsw efRuntime must be at least 1"));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(IndexError::invalid_params(
                "hnsw epsilon must be a finite non-negative number",
            ));
        }
        if self.ef_construction < self.m {
            warnings.push(format!(
                "hnsw efConstruction ({}) is below m ({}); graph quality will suffer",
                self.ef_construction, self.m
            ));
        }
        Ok(warnings)
    }
}

/// Parameters for an inverted-file index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IvfParams {
    #[serde(flatten)]
    pub common: CommonParams,

    /// Number of k-means lists.
    #[serde(default = "default_ivf_lists")]
    pub n_lists: usize,

    /// Number of lists scanned per query.
    #[serde(default = "default_ivf_probes")]
    pub n_probes: usize,

    /// Vectors required before training. Defaults to `8 * nLists`.
    #[serde(default)]
    pub training_size: Option<usize>,

    /// Lloyd iterations during training.
    #[serde(default = "default_kmeans_iterations")]
    pub kmeans_iterations: usize,

    /// Seed for centroid initialisation.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_ivf_lists() -> usize {
    DEFAULT_IVF_LISTS
}

fn default_ivf_probes() -> usize {
    DEFAULT_IVF_PROBES
}

fn default_kmeans_iterations() -> usize {
    DEFAULT_KMEANS_ITERATIONS
}

impl IvfParams {
    /// Create IVF params with default list settings.
    pub fn new(common: CommonParams) -> Self {
        Self {
            common,
            n_lists: DEFAULT_IVF_LISTS,
            n_probes: DEFAULT_IVF_PROBES,
            training_size: None,
            kmeans_iterations: DEFAULT_KMEANS_ITERATIONS,
            seed: None,
        }
    }

    /// Set the number of lists.
    pub fn with_lists(mut self, n_lists: usize) -> Self {
        self.n_lists = n_lists;
        self
    }

    /// Set the number of probed lists.
    pub fn with_probes(mut self, n_probes: usize) -> Self {
        self.n_probes = n_probes;
        self
    }

    /// Set the training threshold.
    pub fn with_training_size(mut self, training_size: usize) -> Self {
        self.training_size = Some(training_size);
        self
    }

    /// Fix the centroid seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Vectors required before training.
    pub fn effective_training_size(&self) -> usize {
        self.training_size.unwrap_or(self.n_lists * 8)
    }

    fn validate(&self) -> IndexResult<Vec<String>> {
        let mut warnings = self.common.validate()?;
        if self.n_lists == 0 {
            return Err(IndexError::invalid_params("ivf nLists must be at least 1"));
        }
        if self.n_probes == 0 {
            return Err(IndexError::invalid_params("ivf nProbes must be at least 1"));
        }
        if self.effective_training_size() < self.n_lists {
            return Err(IndexError::invalid_params(format!(
                "ivf trainingSize ({}) must be at least nLists ({})",
                self.effective_training_size(),
                self.n_lists
            )));
        }
        if self.n_probes > self.n_lists {
            warnings.push(format!(
                "ivf nProbes ({}) exceeds nLists ({}); every query scans all lists",
                self.n_probes, self.n_lists
            ));
        }
        if self.kmeans_iterations == 0 {
            warnings.push("ivf kmeansIterations is 0; centroids stay at their seeds".to_string());
        }
        Ok(warnings)
    }
}

/// Parameters for an inverted-file index with product-quantized lists.
///
/// Each vector is stored as its list plus one byte per subspace, so the
/// dimension must split evenly into `pqSubspaces`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IvfPqParams {
    #[serde(flatten)]
    pub common: CommonParams,

    /// Number of k-means lists.
    #[serde(default = "default_ivf_lists")]
    pub n_lists: usize,

    /// Number of lists scanned per query.
    #[serde(default = "default_ivf_probes")]
    pub n_probes: usize,

    /// Subspaces each vector is split into.
    #[serde(default = "default_pq_subspaces")]
    pub pq_subspaces: usize,

    /// Codebook entries per subspace, at most 256.
    #[serde(default = "default_pq_centroids")]
    pub pq_centroids: usize,

    /// Vectors required before training. Defaults to the larger of
    /// `8 * nLists` and `pqCentroids`.
    #[serde(default)]
    pub training_size: Option<usize>,

    /// Lloyd iterations for the coarse centroids and every codebook.
    #[serde(default = "default_kmeans_iterations")]
    pub kmeans_iterations: usize,

    /// Seed for centroid initialisation.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_pq_subspaces() -> usize {
    DEFAULT_PQ_SUBSPACES
}

fn default_pq_centroids() -> usize {
    DEFAULT_PQ_CENTROIDS
}

impl IvfPqParams {
    /// Create IVF-PQ params with default list and codebook settings.
    pub fn new(common: CommonParams) -> Self {
        Self {
            common,
            n_lists: DEFAULT_IVF_LISTS,
            n_probes: DEFAULT_IVF_PROBES,
            pq_subspaces: DEFAULT_PQ_SUBSPACES,
            pq_centroids: DEFAULT_PQ_CENTROIDS,
            training_size: None,
            kmeans_iterations: DEFAULT_KMEANS_ITERATIONS,
            seed: None,
        }
    }

    pub fn with_lists(mut self, n_lists: usize) -> Self {
        self.n_lists = n_lists;
        self
    }

    pub fn with_probes(mut self, n_probes: usize) -> Self {
        self.n_probes = n_probes;
        self
    }

    pub fn with_subspaces(mut self, pq_subspaces: usize) -> Self {
        self.pq_subspaces = pq_subspaces;
        self
    }

    pub fn with_centroids(mut self, pq_centroids: usize) -> Self {
        self.pq_centroids = pq_centroids;
        self
    }

    pub fn with_training_size(mut self, training_size: usize) -> Self {
        self.training_size = Some(training_size);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Vectors required before training.
    pub fn effective_training_size(&self) -> usize {
        self.training_size
            .unwrap_or_else(|| (self.n_lists * 8).max(self.pq_centroids))
    }

    /// Components per subspace.
    pub fn subspace_dimension(&self) -> usize {
        self.common.dimension / self.pq_subspaces.max(1)
    }

    fn validate(&self) -> IndexResult<Vec<String>> {
        let mut warnings = self.common.validate()?;
        if self.n_lists == 0 {
            return Err(IndexError::invalid_params("ivf_pq nLists must be at least 1"));
        }
        if self.n_probes == 0 {
            return Err(IndexError::invalid_params("ivf_pq nProbes must be at least 1"));
        }
        if self.pq_subspaces == 0 || self.common.dimension % self.pq_subspaces != 0 {
            return Err(IndexError::invalid_params(format!(
                "ivf_pq dimension ({}) must be a multiple of pqSubspaces ({})",
                self.common.dimension, self.pq_subspaces
            )));
        }
        if self.pq_centroids == 0 || self.pq_centroids > DEFAULT_PQ_CENTROIDS {
            return Err(IndexError::invalid_params(format!(
                "ivf_pq pqCentroids must be between 1 and {}, got {}",
                DEFAULT_PQ_CENTROIDS, self.pq_centroids
            )));
        }
        if self.effective_training_size() < self.n_lists {
            return Err(IndexError::invalid_params(format!(
                "ivf_pq trainingSize ({}) must be at least nLists ({})",
                self.effective_training_size(),
                self.n_lists
            )));
        }
        if self.effective_training_size() < self.pq_centroids {
            warnings.push(format!(
                "ivf_pq trainingSize ({}) is below pqCentroids ({}); codebooks will be smaller",
                self.effective_training_size(),
                self.pq_centroids
            ));
        }
        if self.n_probes > self.n_lists {
            warnings.push(format!(
                "ivf_pq nProbes ({}) exceeds nLists ({}); every query scans all lists",
                self.n_probes, self.n_lists
            ));
        }
        if self.kmeans_iterations == 0 {
            warnings
                .push("ivf_pq kmeansIterations is 0; centroids stay at their seeds".to_string());
        }
        Ok(warnings)
    }
}

/// Parameters for a tiered index: a flat write buffer in front of `primary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TieredParams {
    /// Parameters of the backend index.
    pub primary: Box<IndexParams>,

    /// Pending count that triggers one batch swap job. `0` disables batching.
    #[serde(default = "default_swap_threshold")]
    pub swap_threshold: usize,
}

fn default_swap_threshold() -> usize {
    DEFAULT_SWAP_THRESHOLD
}

impl TieredParams {
    /// Create tiered params around a primary index.
    pub fn new(primary: IndexParams) -> Self {
        Self {
            primary: Box::new(primary),
            swap_threshold: DEFAULT_SWAP_THRESHOLD,
        }
    }

    /// Set the swap threshold.
    pub fn with_swap_threshold(mut self, swap_threshold: usize) -> Self {
        self.swap_threshold = swap_threshold;
        self
    }

    fn validate(&self) -> IndexResult<Vec<String>> {
        if let IndexParams::Tiered(_) = *self.primary {
            return Err(IndexError::unsupported(
                Algorithm::Tiered.as_str(),
                "a tiered index cannot use another tiered index as its primary",
            ));
        }
        let mut warnings = self.primary.validate()?;
        if self.swap_threshold == 0 {
            warnings.push(
                "tiered swapThreshold is 0; every write schedules its own insert job".to_string(),
            );
        }
        Ok(warnings)
    }
}

// ============================================================================
// IndexParams
// ============================================================================

/// Construction parameters for any index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum IndexParams {
    /// Brute-force index.
    Flat(FlatParams),
    /// HNSW graph index.
    Hnsw(HnswParams),
    /// Inverted-file index.
    IvfFlat(IvfParams),
    /// Inverted-file index with product-quantized lists.
    IvfPq(IvfPqParams),
    /// Flat buffer plus primary index.
    Tiered(TieredParams),
}

impl IndexParams {
    /// Algorithm selected by these params.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            IndexParams::Flat(_) => Algorithm::Flat,
            IndexParams::Hnsw(_) => Algorithm::Hnsw,
            IndexParams::IvfFlat(_) => Algorithm::IvfFlat,
            IndexParams::IvfPq(_) => Algorithm::IvfPq,
            IndexParams::Tiered(_) => Algorithm::Tiered,
        }
    }

    /// Common fields. A tiered index inherits them from its primary.
    pub fn common(&self) -> &CommonParams {
        match self {
            IndexParams::Flat(p) => &p.common,
            IndexParams::Hnsw(p) => &p.common,
            IndexParams::IvfFlat(p) => &p.common,
            IndexParams::IvfPq(p) => &p.common,
            IndexParams::Tiered(p) => p.primary.common(),
        }
    }

    /// Vector dimension.
    pub fn dimension(&self) -> usize {
        self.common().dimension
    }

    /// Validate the parameter tree.
    ///
    /// Returns the first critical problem as an error. Non-fatal issues are
    /// returned as warnings; callers should log them and proceed.
    pub fn validate(&self) -> IndexResult<Vec<String>> {
        match self {
            IndexParams::Flat(p) => p.common.validate(),
            IndexParams::Hnsw(p) => p.validate(),
            IndexParams::IvfFlat(p) => p.validate(),
            IndexParams::IvfPq(p) => p.validate(),
            IndexParams::Tiered(p) => p.validate(),
        }
    }

    /// Parse params from YAML (JSON is valid YAML).
    pub fn from_yaml_str(content: &str) -> IndexResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load params from a `.yaml`, `.yml` or `.json` file.
    pub fn from_path(path: &Path) -> IndexResult<Self> {
        debug!("Loading index parameters from {:?}", path);

        let content = fs::read_to_string(path).map_err(|e| IndexError::ParamsIo {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            Self::from_yaml_str(&content)
        }
    }
}

impl From<FlatParams> for IndexParams {
    fn from(params: FlatParams) -> Self {
        IndexParams::Flat(params)
    }
}

impl From<HnswParams> for IndexParams {
    fn from(params: HnswParams) -> Self {
        IndexParams::Hnsw(params)
    }
}

impl From<IvfParams> for IndexParams {
    fn from(params: IvfParams) -> Self {
        IndexParams::IvfFlat(params)
    }
}

impl From<IvfPqParams> for IndexParams {
    fn from(params: IvfPqParams) -> Self {
        IndexParams::IvfPq(params)
    }
}

impl From<TieredParams> for IndexParams {
    fn from(params: TieredParams) -> Self {
        IndexParams::Tiered(params)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_builder() {
        let common = CommonParams::new(128)
            .with_metric(VectorMetric::L2)
            .with_multi(true)
            .with_block_size(64);

        assert_eq!(common.dimension, 128);
        assert_eq!(common.metric, VectorMetric::L2);
        assert!(common.multi);
        assert_eq!(common.block_size, 64);
    }

    #[test]
    fn test_tiered_yaml() {
        let yaml = r#"
algorithm: tiered
swapThreshold: 32
primary:
  algorithm: hnsw
  dimension: 8
  metric: l2
  m: 12
  efRuntime: 50
"#;
        let params = IndexParams::from_yaml_str(yaml).unwrap();
        assert_eq!(params.algorithm(), Algorithm::Tiered);
        assert_eq!(params.dimension(), 8);

        let IndexParams::Tiered(tiered) = &params else {
            panic!("expected tiered params");
        };
        assert_eq!(tiered.swap_threshold, 32);
        let IndexParams::Hnsw(hnsw) = tiered.primary.as_ref() else {
            panic!("expected hnsw primary");
        };
        assert_eq!(hnsw.m, 12);
        assert_eq!(hnsw.ef_runtime, 50);
        assert_eq!(hnsw.ef_construction, DEFAULT_HNSW_EF_CONSTRUCTION);
        assert_eq!(hnsw.common.metric, VectorMetric::L2);
        assert_eq!(hnsw.common.block_size, DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn test_json_roundtrip_keeps_tag() {
        let params: IndexParams = IvfParams::new(CommonParams::new(4)).with_lists(4).into();
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"algorithm\":\"ivf_flat\""));
        assert!(json.contains("\"nLists\":4"));

        let parsed: IndexParams = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, params);
    }

    #[test]
    fn test_validation_errors() {
        let params: IndexParams = FlatParams::new(CommonParams::new(0)).into();
        assert!(matches!(
            params.validate(),
            Err(IndexError::InvalidParams { .. })
        ));

        let params: IndexParams = HnswParams::new(CommonParams::new(4)).with_m(1).into();
        assert!(params.validate().is_err());

        let inner = TieredParams::new(FlatParams::new(CommonParams::new(4)).into());
        let nested = TieredParams::new(inner.into());
        assert!(matches!(
            IndexParams::from(nested).validate(),
            Err(IndexError::UnsupportedAlgorithm { .. })
        ));
    }

    #[test]
    fn test_validation_warnings() {
        let params: IndexParams = IvfParams::new(CommonParams::new(4))
            .with_lists(4)
            .with_probes(8)
            .into();
        let warnings = params.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("nProbes"));

        let params: IndexParams = TieredParams::new(FlatParams::new(CommonParams::new(4)).into())
            .with_swap_threshold(0)
            .into();
        assert_eq!(params.validate().unwrap().len(), 1);
    }

    #[test]
    fn test_ivf_pq_yaml_and_validation() {
        let yaml = r#"
algorithm: ivf_pq
dimension: 12
nLists: 4
pqSubspaces: 3
pqCentroids: 16
"#;
        let params = IndexParams::from_yaml_str(yaml).unwrap();
        assert_eq!(params.algorithm(), Algorithm::IvfPq);
        let IndexParams::IvfPq(pq) = &params else {
            panic!("expected ivf_pq params");
        };
        assert_eq!(pq.subspace_dimension(), 4);
        assert_eq!(pq.n_probes, DEFAULT_IVF_PROBES);
        assert_eq!(pq.effective_training_size(), 32);
        // nProbes above nLists
        assert_eq!(params.validate().unwrap().len(), 1);

        let uneven: IndexParams = IvfPqParams::new(CommonParams::new(10)).with_subspaces(4).into();
        assert!(matches!(
            uneven.validate(),
            Err(IndexError::InvalidParams { .. })
        ));

        let wide: IndexParams = IvfPqParams::new(CommonParams::new(8)).with_centroids(300).into();
        assert!(wide.validate().is_err());
    }

    #[test]
    fn test_from_path_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(
            &path,
            r#"{"algorithm":"flat","dimension":3,"metric":"dot"}"#,
        )
        .unwrap();

        let params = IndexParams::from_path(&path).unwrap();
        assert_eq!(params.algorithm(), Algorithm::Flat);
        assert_eq!(params.common().metric, VectorMetric::Dot);

        let missing = IndexParams::from_path(&dir.path().join("missing.yaml"));
        assert!(matches!(missing, Err(IndexError::ParamsIo { .. })));
    }
}
