//! Error types for strata-index.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for strata-index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors that can occur in strata-index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    // ========================================================================
    // Input errors (synchronous, no state change)
    // ========================================================================
    /// Vector dimension mismatch.
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector contains NaN or infinite components.
    #[error("Invalid vector: {message}")]
    InvalidVector { message: String },

    /// Search arguments are out of range (e.g. negative radius).
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    // ========================================================================
    // Construction errors
    // ========================================================================
    /// Index parameters failed validation.
    #[error("Invalid index parameters: {message}")]
    InvalidParams { message: String },

    /// The requested algorithm is not available in this build or this position.
    #[error("Unsupported algorithm '{algorithm}': {reason}")]
    UnsupportedAlgorithm { algorithm: String, reason: String },

    /// Failed to read a parameter file.
    #[error("Failed to load index parameters from {path}: {message}")]
    ParamsIo { path: PathBuf, message: String },

    // ========================================================================
    // Resource errors (raised inside job execution)
    // ========================================================================
    /// Backend mutation failed.
    #[error("Backend error: {message}")]
    Backend { message: String },

    /// The index is at capacity and cannot allocate another slot.
    #[error("Index capacity exhausted: {message}")]
    Capacity { message: String },

    // ========================================================================
    // General errors
    // ========================================================================
    /// JSON error wrapper.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error wrapper.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl IndexError {
    /// Create an invalid vector error.
    pub fn invalid_vector(message: impl Into<String>) -> Self {
        Self::InvalidVector {
            message: message.into(),
        }
    }

    /// Create an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Create an invalid parameters error.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    /// Create an unsupported algorithm error.
    pub fn unsupported(algorithm: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
            reason: reason.into(),
        }
    }

    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create a capacity error.
    pub fn capacity(message: impl Into<String>) -> Self {
        Self::Capacity {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error was caused by caller input rather than index state.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::DimensionMismatch { .. } | Self::InvalidVector { .. } | Self::InvalidQuery { .. }
        )
    }
}
