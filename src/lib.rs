//! Semantic product search over a vector store.
//!
//! This crate covers the ingestion-and-search pipeline:
//! - Validate raw CSV rows into typed [`Product`]s
//! - Embed product names into unit vectors
//! - Batch-upsert points into a collection, tolerating per-record failures
//! - Serve filtered, paginated similarity queries
//!
//! The design is flat and splits responsibilities into focused modules;
//! [`ProductStore`] is the single entry point recommended for application
//! code.

mod config;
mod embed;
mod errors;
mod filters;
mod ingest;
mod io_csv;
mod memory;
mod product;
mod qdrant_store;
mod retry;
mod search;
mod store;
mod validate;

pub use config::{AppConfig, DistanceKind};
pub use embed::{EmbeddingsProvider, fastembed::FastembedProvider, l2_normalize, stub::StubEmbedder};
pub use errors::Error;
pub use ingest::{IngestOptions, IngestReport, RejectedRow, ingest_csv};
pub use memory::MemoryStore;
pub use product::{Product, RawRecord, ScoredProduct};
pub use qdrant_store::QdrantStore;
pub use retry::RetryPolicy;
pub use search::{SearchPage, SearchRequest, search};
pub use store::{
    CollectionDescription, CollectionSchema, ProductFilter, ProductPoint, QueryRequest,
    UpsertOutcome, VectorStore,
};
pub use validate::{RejectReason, validate_record};

use std::path::Path;
use std::sync::Arc;
use tracing::trace;

/// High-level facade wiring configuration and a vector-store backend.
pub struct ProductStore {
    cfg: AppConfig,
    store: Arc<dyn VectorStore>,
}

impl ProductStore {
    /// Connects to the Qdrant endpoint from `cfg`.
    ///
    /// # Errors
    /// Returns `Error::Config` when the configuration is invalid or the
    /// client cannot be initialized.
    pub fn connect(cfg: AppConfig) -> Result<Self, Error> {
        trace!("ProductStore::connect url={}", cfg.qdrant_url);
        let store = Arc::new(QdrantStore::connect(&cfg)?);
        Ok(Self { cfg, store })
    }

    /// Wires an explicit backend, e.g. [`MemoryStore`] for tests and
    /// local development.
    pub fn with_backend(cfg: AppConfig, store: Arc<dyn VectorStore>) -> Self {
        Self { cfg, store }
    }

    pub fn config(&self) -> &AppConfig {
        &self.cfg
    }

    /// Creates `name` for vectors of the given dimension. No-op when the
    /// collection already exists with a matching schema.
    pub async fn create_collection(&self, name: &str, dimension: usize) -> Result<(), Error> {
        self.store
            .create_collection(
                name,
                CollectionSchema {
                    dimension,
                    distance: self.cfg.distance,
                },
            )
            .await
    }

    /// Deletes `name` and all its data. Returns `false` when it did not exist.
    pub async fn delete_collection(&self, name: &str) -> Result<bool, Error> {
        self.store.delete_collection(name).await
    }

    /// Returns schema and point count for `name`.
    pub async fn describe(&self, name: &str) -> Result<CollectionDescription, Error> {
        self.store.describe_collection(name).await
    }

    /// Runs the batch ingestion pipeline over a CSV file.
    pub async fn ingest_csv(
        &self,
        provider: &dyn EmbeddingsProvider,
        path: impl AsRef<Path>,
        collection: &str,
        opts: &IngestOptions,
    ) -> Result<IngestReport, Error> {
        ingest::ingest_csv(&self.cfg, self.store.as_ref(), provider, path, collection, opts).await
    }

    /// Runs a filtered, paginated similarity search.
    pub async fn search(
        &self,
        provider: &dyn EmbeddingsProvider,
        request: &SearchRequest,
    ) -> Result<SearchPage, Error> {
        search::search(self.store.as_ref(), provider, request).await
    }
}
