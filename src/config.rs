//! Runtime and collection configuration.

use crate::errors::Error;
use crate::retry::RetryPolicy;

/// Distance function used for the vector space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceKind {
    /// Cosine distance (the default; embeddings are unit-normalized).
    Cosine,
    /// Dot product over already-normalized vectors.
    Dot,
    /// Euclidean distance (L2).
    Euclid,
}

impl std::fmt::Display for DistanceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceKind::Cosine => write!(f, "cosine"),
            DistanceKind::Dot => write!(f, "dot"),
            DistanceKind::Euclid => write!(f, "euclid"),
        }
    }
}

/// Configuration for ingestion and search.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Qdrant gRPC endpoint, e.g. `http://localhost:6334`.
    pub qdrant_url: String,
    /// Optional API key for Qdrant Cloud.
    pub qdrant_api_key: Option<String>,
    /// Default collection name.
    pub collection: String,
    /// Distance function (Cosine by default).
    pub distance: DistanceKind,
    /// Ingestion batch size; bounds peak memory of a run.
    pub batch_size: usize,
    /// Embedding model identifier, e.g. `Qdrant/all-MiniLM-L6-v2-onnx`.
    /// Published aliases like `sentence-transformers/all-MiniLM-L6-v2`
    /// resolve to the matching ONNX port.
    pub embedding_model: String,
    /// Retry policy for transient store faults.
    pub retry: RetryPolicy,
}

impl AppConfig {
    /// Creates a sane default config for a given collection name and Qdrant endpoint.
    pub fn new_default(url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            qdrant_url: url.into(),
            qdrant_api_key: None,
            collection: collection.into(),
            distance: DistanceKind::Cosine,
            batch_size: 100,
            embedding_model: "Qdrant/all-MiniLM-L6-v2-onnx".to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Builds a config from environment variables, with defaults for anything unset.
    ///
    /// Recognized: `QDRANT_URL`, `QDRANT_API_KEY`, `COLLECTION_NAME`,
    /// `EMBEDDING_MODEL`, `BATCH_SIZE`.
    pub fn from_env() -> Self {
        let mut cfg = Self::new_default(
            std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://localhost:6334".to_string()),
            std::env::var("COLLECTION_NAME").unwrap_or_else(|_| "products".to_string()),
        );
        cfg.qdrant_api_key = std::env::var("QDRANT_API_KEY").ok().filter(|k| !k.is_empty());
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            cfg.embedding_model = model;
        }
        if let Some(n) = std::env::var("BATCH_SIZE")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            cfg.batch_size = n;
        }
        cfg
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), Error> {
        if self.qdrant_url.trim().is_empty() {
            return Err(Error::Config("qdrant_url is empty".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(Error::Config("collection is empty".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be > 0".into()));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(Error::Config("embedding_model is empty".into()));
        }
        Ok(())
    }
}
