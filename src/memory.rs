//! In-process vector store: exact cosine scan over a `BTreeMap`.
//!
//! Used by the test suite and for local development without a Qdrant
//! server. Implements the same ranking contract as the production backend:
//! score descending, ties broken by ascending id, offset applied after
//! ranking.

use crate::config::DistanceKind;
use crate::embed::dot;
use crate::errors::Error;
use crate::product::{Product, ScoredProduct};
use crate::store::{
    CollectionDescription, CollectionSchema, ProductPoint, QueryRequest, UpsertOutcome,
    VectorStore,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tracing::debug;

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, MemoryCollection>>,
}

struct MemoryCollection {
    schema: CollectionSchema,
    points: BTreeMap<u64, (Product, Vec<f32>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn score(distance: DistanceKind, a: &[f32], b: &[f32]) -> f32 {
    match distance {
        // Vectors are unit-normalized, so cosine is the plain dot product.
        DistanceKind::Cosine | DistanceKind::Dot => dot(a, b),
        DistanceKind::Euclid => {
            let d2: f32 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
            -d2.sqrt()
        }
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn create_collection(&self, name: &str, schema: CollectionSchema) -> Result<(), Error> {
        let mut cols = self.collections.lock().expect("memory store poisoned");
        if let Some(existing) = cols.get(name) {
            if existing.schema == schema {
                debug!("collection '{name}' already exists with matching schema");
                return Ok(());
            }
            return Err(Error::SchemaConflict {
                collection: name.to_string(),
                got: existing.schema.to_string(),
                want: schema.to_string(),
            });
        }
        cols.insert(
            name.to_string(),
            MemoryCollection {
                schema,
                points: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<bool, Error> {
        let mut cols = self.collections.lock().expect("memory store poisoned");
        Ok(cols.remove(name).is_some())
    }

    async fn describe_collection(&self, name: &str) -> Result<CollectionDescription, Error> {
        let cols = self.collections.lock().expect("memory store poisoned");
        let col = cols
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("collection '{name}'")))?;
        Ok(CollectionDescription {
            name: name.to_string(),
            schema: col.schema,
            points: col.points.len() as u64,
        })
    }

    async fn upsert(&self, name: &str, points: Vec<ProductPoint>) -> Result<UpsertOutcome, Error> {
        let mut cols = self.collections.lock().expect("memory store poisoned");
        let col = cols
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(format!("collection '{name}'")))?;

        let mut outcome = UpsertOutcome::default();
        for point in points {
            let id = point.product.id;
            if point.vector.len() != col.schema.dimension {
                outcome.failed.push((
                    id,
                    format!(
                        "vector size mismatch: got {}, want {}",
                        point.vector.len(),
                        col.schema.dimension
                    ),
                ));
                continue;
            }
            col.points.insert(id, (point.product, point.vector));
            outcome.upserted.push(id);
        }
        Ok(outcome)
    }

    async fn query(&self, name: &str, request: QueryRequest) -> Result<Vec<ScoredProduct>, Error> {
        let cols = self.collections.lock().expect("memory store poisoned");
        let col = cols
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("collection '{name}'")))?;

        if request.vector.len() != col.schema.dimension {
            return Err(Error::VectorSizeMismatch {
                got: request.vector.len(),
                want: col.schema.dimension,
            });
        }

        let mut hits: Vec<(u64, ScoredProduct)> = col
            .points
            .values()
            .filter(|(product, _)| request.filter.matches(product))
            .map(|(product, vector)| {
                (
                    product.id,
                    ScoredProduct {
                        product: product.clone(),
                        score: score(col.schema.distance, &request.vector, vector),
                    },
                )
            })
            .collect();

        hits.sort_by(|(id_a, a), (id_b, b)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(id_a.cmp(id_b))
        });

        Ok(hits
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .map(|(_, hit)| hit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::sample_product;
    use crate::store::ProductFilter;

    const SCHEMA: CollectionSchema = CollectionSchema {
        dimension: 2,
        distance: DistanceKind::Cosine,
    };

    fn point(id: u64, name: &str, vector: Vec<f32>) -> ProductPoint {
        ProductPoint {
            product: sample_product(id, name),
            vector,
        }
    }

    fn query(vector: Vec<f32>, limit: usize, offset: usize) -> QueryRequest {
        QueryRequest {
            vector,
            filter: ProductFilter::default(),
            limit,
            offset,
        }
    }

    #[tokio::test]
    async fn create_is_idempotent_but_schema_conflict_fails() {
        let store = MemoryStore::new();
        store.create_collection("c", SCHEMA).await.unwrap();
        store.create_collection("c", SCHEMA).await.unwrap();
        let other = CollectionSchema {
            dimension: 3,
            distance: DistanceKind::Cosine,
        };
        assert!(matches!(
            store.create_collection("c", other).await,
            Err(Error::SchemaConflict { .. })
        ));
    }

    #[tokio::test]
    async fn upsert_is_idempotent_by_id() {
        let store = MemoryStore::new();
        store.create_collection("c", SCHEMA).await.unwrap();
        let p = point(1, "Mouse", vec![1.0, 0.0]);
        store.upsert("c", vec![p.clone()]).await.unwrap();
        store.upsert("c", vec![p]).await.unwrap();
        assert_eq!(store.describe_collection("c").await.unwrap().points, 1);
    }

    #[tokio::test]
    async fn upsert_overwrites_whole_point() {
        let store = MemoryStore::new();
        store.create_collection("c", SCHEMA).await.unwrap();
        store
            .upsert("c", vec![point(1, "Old Name", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert("c", vec![point(1, "New Name", vec![0.0, 1.0])])
            .await
            .unwrap();
        let hits = store.query("c", query(vec![0.0, 1.0], 10, 0)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].product.name, "New Name");
    }

    #[tokio::test]
    async fn wrong_dimension_is_a_per_item_failure() {
        let store = MemoryStore::new();
        store.create_collection("c", SCHEMA).await.unwrap();
        let outcome = store
            .upsert(
                "c",
                vec![
                    point(1, "Ok", vec![1.0, 0.0]),
                    point(2, "Bad", vec![1.0, 0.0, 0.0]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(outcome.upserted, vec![1]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, 2);
    }

    #[tokio::test]
    async fn ranking_is_descending_with_id_tiebreak() {
        let store = MemoryStore::new();
        store.create_collection("c", SCHEMA).await.unwrap();
        store
            .upsert(
                "c",
                vec![
                    point(3, "tie-b", vec![1.0, 0.0]),
                    point(1, "tie-a", vec![1.0, 0.0]),
                    point(2, "far", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();
        let hits = store.query("c", query(vec![1.0, 0.0], 10, 0)).await.unwrap();
        let ids: Vec<u64> = hits.iter().map(|h| h.product.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[tokio::test]
    async fn offset_is_applied_after_ranking() {
        let store = MemoryStore::new();
        store.create_collection("c", SCHEMA).await.unwrap();
        store
            .upsert(
                "c",
                vec![
                    point(1, "a", vec![1.0, 0.0]),
                    point(2, "b", vec![0.9, 0.1]),
                    point(3, "c", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();
        let page = store.query("c", query(vec![1.0, 0.0], 1, 1)).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].product.id, 2);
    }

    #[tokio::test]
    async fn missing_collection_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.query("nope", query(vec![1.0, 0.0], 10, 0)).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.describe_collection("nope").await,
            Err(Error::NotFound(_))
        ));
        assert!(!store.delete_collection("nope").await.unwrap());
    }
}
