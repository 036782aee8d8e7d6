//! Vector-store contract: collection lifecycle, upsert, similarity query.
//!
//! Backends: [`crate::qdrant_store::QdrantStore`] (the production store)
//! and [`crate::memory::MemoryStore`] (in-process, for tests and local
//! development). Callers depend on the trait only.

use crate::config::DistanceKind;
use crate::errors::Error;
use crate::product::{Product, ScoredProduct};
use async_trait::async_trait;

/// Fixed schema of a collection: vector dimension and distance metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollectionSchema {
    pub dimension: usize,
    pub distance: DistanceKind,
}

impl std::fmt::Display for CollectionSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dim={} distance={}", self.dimension, self.distance)
    }
}

/// Schema plus point count, as returned by `describe`.
#[derive(Clone, Debug)]
pub struct CollectionDescription {
    pub name: String,
    pub schema: CollectionSchema,
    pub points: u64,
}

/// One (id, vector, payload) triple to persist. The id is the product id.
#[derive(Clone, Debug)]
pub struct ProductPoint {
    pub product: Product,
    pub vector: Vec<f32>,
}

/// Per-item outcome of a bulk upsert. A partially failed call reports the
/// offending ids instead of one opaque failure, so the pipeline can keep
/// going and tally exact counts.
#[derive(Clone, Debug, Default)]
pub struct UpsertOutcome {
    pub upserted: Vec<u64>,
    pub failed: Vec<(u64, String)>,
}

impl UpsertOutcome {
    pub fn all_ok(ids: Vec<u64>) -> Self {
        Self {
            upserted: ids,
            failed: Vec::new(),
        }
    }
}

/// Equality filter over payload category fields. Conjunctive: every
/// supplied field must match exactly; absent fields impose no restriction.
#[derive(Clone, Debug, Default)]
pub struct ProductFilter {
    pub main_category: Option<String>,
    pub sub_category: Option<String>,
}

impl ProductFilter {
    pub fn is_empty(&self) -> bool {
        self.main_category.is_none() && self.sub_category.is_none()
    }

    /// Exact conjunctive match, shared by the in-memory backend and tests.
    pub fn matches(&self, product: &Product) -> bool {
        let eq = |want: &Option<String>, have: &Option<String>| match want {
            None => true,
            Some(w) => have.as_deref() == Some(w.as_str()),
        };
        eq(&self.main_category, &product.main_category)
            && eq(&self.sub_category, &product.sub_category)
    }
}

/// A similarity query: ranked descending by score, ties broken by
/// ascending id, then `offset`/`limit` slicing applied after ranking.
#[derive(Clone, Debug)]
pub struct QueryRequest {
    pub vector: Vec<f32>,
    pub filter: ProductFilter,
    pub limit: usize,
    pub offset: usize,
}

/// Storage backend for product vectors and payloads.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates `name` with the given schema. No-op when it already exists
    /// with a matching schema; [`Error::SchemaConflict`] otherwise.
    async fn create_collection(&self, name: &str, schema: CollectionSchema) -> Result<(), Error>;

    /// Deletes `name` and all its points. Returns `false` (not an error)
    /// when the collection did not exist.
    async fn delete_collection(&self, name: &str) -> Result<bool, Error>;

    /// Returns schema and point count; [`Error::NotFound`] when absent.
    async fn describe_collection(&self, name: &str) -> Result<CollectionDescription, Error>;

    /// Writes or overwrites each point by id (whole-point overwrite, not a
    /// partial patch). Per-item failures are reported in the outcome.
    async fn upsert(&self, name: &str, points: Vec<ProductPoint>) -> Result<UpsertOutcome, Error>;

    /// Ranked similarity query. [`Error::NotFound`] when the collection is
    /// absent; an existing-but-empty collection yields an empty list.
    ///
    /// Ties are broken by ascending id. The in-memory backend applies this
    /// globally; the Qdrant backend can only re-sort the page it fetched,
    /// so equal-score points may still straddle a page boundary there.
    async fn query(&self, name: &str, request: QueryRequest) -> Result<Vec<ScoredProduct>, Error>;
}
