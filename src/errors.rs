//! Unified error types for the crate.

use thiserror::Error;

/// Top-level error for ingestion, collection management and search.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O or filesystem errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading errors (file-level; malformed rows are skipped, not fatal).
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing / serialization errors.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Caller supplied an out-of-range parameter. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The embedding model could not be loaded or fetched.
    /// Fatal for the whole run: every subsequent record would fail the same way.
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// Collection exists with an incompatible dimension or distance metric.
    #[error("schema conflict on collection '{collection}': got {got}, want {want}")]
    SchemaConflict {
        collection: String,
        got: String,
        want: String,
    },

    /// Collection absent on describe/delete/query.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transient vector-store connectivity fault. Retried with backoff.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Definitive vector-store error (bad request, auth). Not retried.
    #[error("store error: {0}")]
    Store(String),

    /// Mismatch in vector dimensionality.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// Generic error from anyhow chain.
    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl Error {
    /// Whether a bounded retry with backoff is worth attempting.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_))
    }
}
