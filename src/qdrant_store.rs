//! Qdrant backend: thin adapter around `qdrant-client`.
//!
//! Concentrates all Qdrant interactions behind [`VectorStore`], hiding the
//! verbose builder pattern from the rest of the crate. Transient
//! connectivity faults are retried with bounded backoff; schema and
//! argument errors are not.

use crate::config::{AppConfig, DistanceKind};
use crate::errors::Error;
use crate::filters::to_qdrant_filter;
use crate::product::{Product, ScoredProduct};
use crate::retry::{RetryPolicy, with_retry};
use crate::store::{
    CollectionDescription, CollectionSchema, ProductPoint, QueryRequest, UpsertOutcome,
    VectorStore,
};

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::QdrantError;
use qdrant_client::qdrant::{
    CollectionInfo, CreateCollectionBuilder, Distance, ListValue, PointStruct,
    SearchPointsBuilder, Struct, UpsertPointsBuilder, Value as QValue, VectorParamsBuilder,
    value, vectors_config,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub struct QdrantStore {
    client: Qdrant,
    retry: RetryPolicy,
}

impl QdrantStore {
    /// Connects to the Qdrant endpoint from the given configuration.
    pub fn connect(cfg: &AppConfig) -> Result<Self, Error> {
        cfg.validate()?;

        let mut builder = Qdrant::from_url(&cfg.qdrant_url);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder.build().map_err(map_qdrant_err)?;

        Ok(Self {
            client,
            retry: cfg.retry,
        })
    }

    async fn collection_schema(
        &self,
        name: &str,
    ) -> Result<(CollectionSchema, u64), Error> {
        let name_owned = name.to_string();
        let client = &self.client;
        let info = with_retry(&self.retry, move || {
            let name = name_owned.clone();
            async move { client.collection_info(name).await.map_err(map_qdrant_err) }
        })
        .await?;

        let result = info
            .result
            .ok_or_else(|| Error::Store(format!("empty collection info for '{name}'")))?;
        let points = result.points_count.unwrap_or(0);
        let schema = schema_of(&result)
            .ok_or_else(|| Error::Store(format!("unreadable vector config for '{name}'")))?;
        Ok((schema, points))
    }

    async fn upsert_batch(&self, name: &str, points: Vec<PointStruct>) -> Result<(), Error> {
        let client = &self.client;
        let name_owned = name.to_string();
        with_retry(&self.retry, move || {
            let name = name_owned.clone();
            let points = points.clone();
            async move {
                client
                    .upsert_points(UpsertPointsBuilder::new(name, points))
                    .await
                    .map_err(map_qdrant_err)
                    .map(|_| ())
            }
        })
        .await
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn create_collection(&self, name: &str, schema: CollectionSchema) -> Result<(), Error> {
        info!("Ensuring collection '{name}' with {schema}");

        match self.collection_schema(name).await {
            Ok((existing, _)) => {
                if existing == schema {
                    debug!("collection '{name}' already exists with matching schema");
                    return Ok(());
                }
                return Err(Error::SchemaConflict {
                    collection: name.to_string(),
                    got: existing.to_string(),
                    want: schema.to_string(),
                });
            }
            Err(Error::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let client = &self.client;
        let name_owned = name.to_string();
        with_retry(&self.retry, move || {
            let name = name_owned.clone();
            async move {
                client
                    .create_collection(CreateCollectionBuilder::new(name).vectors_config(
                        VectorParamsBuilder::new(
                            schema.dimension as u64,
                            to_qdrant_distance(schema.distance),
                        ),
                    ))
                    .await
                    .map_err(map_qdrant_err)
                    .map(|_| ())
            }
        })
        .await?;

        info!("Collection '{name}' created");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<bool, Error> {
        let client = &self.client;
        let name_owned = name.to_string();
        let res = with_retry(&self.retry, move || {
            let name = name_owned.clone();
            async move { client.delete_collection(name).await.map_err(map_qdrant_err) }
        })
        .await;
        match res {
            Ok(resp) => Ok(resp.result),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn describe_collection(&self, name: &str) -> Result<CollectionDescription, Error> {
        let (schema, points) = self.collection_schema(name).await?;
        Ok(CollectionDescription {
            name: name.to_string(),
            schema,
            points,
        })
    }

    async fn upsert(&self, name: &str, points: Vec<ProductPoint>) -> Result<UpsertOutcome, Error> {
        if points.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        let ids: Vec<u64> = points.iter().map(|p| p.product.id).collect();
        let structs: Vec<PointStruct> = points
            .iter()
            .map(point_to_struct)
            .collect::<Result<_, _>>()?;

        debug!("Upserting {} points into '{name}'", structs.len());
        match self.upsert_batch(name, structs).await {
            Ok(()) => Ok(UpsertOutcome::all_ok(ids)),
            // Store down: fatal for the run, nothing to isolate.
            Err(e) if e.is_transient() => Err(e),
            Err(batch_err) => {
                // A definitive batch failure may be caused by individual
                // points; retry one by one so the pipeline learns exactly
                // which ids failed.
                warn!("batch upsert into '{name}' failed ({batch_err}), isolating per point");
                let mut outcome = UpsertOutcome::default();
                for point in &points {
                    let id = point.product.id;
                    match self.upsert_batch(name, vec![point_to_struct(point)?]).await {
                        Ok(()) => outcome.upserted.push(id),
                        Err(e) if e.is_transient() => return Err(e),
                        Err(e) => outcome.failed.push((id, e.to_string())),
                    }
                }
                Ok(outcome)
            }
        }
    }

    async fn query(&self, name: &str, request: QueryRequest) -> Result<Vec<ScoredProduct>, Error> {
        let client = &self.client;
        let name_owned = name.to_string();
        let filter = to_qdrant_filter(&request.filter);
        let vector = request.vector.clone();
        let limit = request.limit as u64;
        let offset = request.offset as u64;

        let res = with_retry(&self.retry, move || {
            let name = name_owned.clone();
            let vector = vector.clone();
            let filter = filter.clone();
            async move {
                let mut builder =
                    SearchPointsBuilder::new(name, vector, limit).with_payload(true);
                if let Some(f) = filter {
                    builder = builder.filter(f);
                }
                if offset > 0 {
                    builder = builder.offset(offset);
                }
                client
                    .search_points(builder)
                    .await
                    .map_err(map_qdrant_err)
            }
        })
        .await?;

        let mut hits: Vec<ScoredProduct> = Vec::with_capacity(res.result.len());
        for point in res.result {
            let payload = qpayload_to_json(point.payload);
            match serde_json::from_value::<Product>(payload) {
                Ok(product) => hits.push(ScoredProduct {
                    product,
                    score: point.score,
                }),
                Err(e) => warn!("skipping hit with malformed payload: {e}"),
            }
        }

        // Qdrant does not define tie order; pin it to ascending id within
        // the fetched page. Equal-score points can still straddle a page
        // boundary server-side, see `VectorStore::query`.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.product.id.cmp(&b.product.id))
        });

        debug!("query on '{name}' returned {} hits", hits.len());
        Ok(hits)
    }
}

/// Maps client errors onto the crate's error kinds. Message-based
/// classification keeps this decoupled from tonic version details.
fn map_qdrant_err(e: QdrantError) -> Error {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("not found")
        || lower.contains("doesn't exist")
        || lower.contains("does not exist")
    {
        Error::NotFound(msg)
    } else if lower.contains("unavailable")
        || lower.contains("connection")
        || lower.contains("transport")
        || lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("deadline")
        || lower.contains("broken pipe")
    {
        Error::StoreUnavailable(msg)
    } else {
        Error::Store(msg)
    }
}

fn to_qdrant_distance(d: DistanceKind) -> Distance {
    match d {
        DistanceKind::Cosine => Distance::Cosine,
        DistanceKind::Dot => Distance::Dot,
        DistanceKind::Euclid => Distance::Euclid,
    }
}

fn from_qdrant_distance(d: Distance) -> Option<DistanceKind> {
    match d {
        Distance::Cosine => Some(DistanceKind::Cosine),
        Distance::Dot => Some(DistanceKind::Dot),
        Distance::Euclid => Some(DistanceKind::Euclid),
        _ => None,
    }
}

fn schema_of(info: &CollectionInfo) -> Option<CollectionSchema> {
    let params = info.config.as_ref()?.params.as_ref()?;
    match params.vectors_config.as_ref()?.config.as_ref()? {
        vectors_config::Config::Params(p) => Some(CollectionSchema {
            dimension: p.size as usize,
            distance: from_qdrant_distance(p.distance())?,
        }),
        _ => None,
    }
}

/// Builds a Qdrant point: product id, vector, full product payload.
fn point_to_struct(point: &ProductPoint) -> Result<PointStruct, Error> {
    let payload_json = serde_json::to_value(&point.product)?;
    let serde_json::Value::Object(map) = payload_json else {
        return Err(Error::Internal(anyhow::anyhow!(
            "product payload serialized to a non-object"
        )));
    };
    let payload: HashMap<String, QValue> = map
        .into_iter()
        .map(|(k, v)| (k, json_to_qvalue(v)))
        .collect();
    Ok(PointStruct::new(
        point.product.id,
        point.vector.clone(),
        payload,
    ))
}

/// Converts `serde_json::Value` into a Qdrant `Value`.
fn json_to_qvalue(v: serde_json::Value) -> QValue {
    use value::Kind as K;
    match v {
        serde_json::Value::String(s) => QValue {
            kind: Some(K::StringValue(s)),
        },
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                QValue {
                    kind: Some(K::IntegerValue(i)),
                }
            } else if let Some(f) = n.as_f64() {
                QValue {
                    kind: Some(K::DoubleValue(f)),
                }
            } else {
                QValue {
                    kind: Some(K::StringValue(n.to_string())),
                }
            }
        }
        serde_json::Value::Bool(b) => QValue {
            kind: Some(K::BoolValue(b)),
        },
        serde_json::Value::Array(arr) => QValue {
            kind: Some(K::ListValue(ListValue {
                values: arr.into_iter().map(json_to_qvalue).collect(),
            })),
        },
        serde_json::Value::Object(map) => QValue {
            kind: Some(K::StructValue(Struct {
                fields: map
                    .into_iter()
                    .map(|(k, v)| (k, json_to_qvalue(v)))
                    .collect(),
            })),
        },
        serde_json::Value::Null => QValue { kind: None },
    }
}

/// Converts a Qdrant payload back into JSON.
fn qpayload_to_json(payload: HashMap<String, QValue>) -> serde_json::Value {
    let mut m = serde_json::Map::new();
    for (k, v) in payload {
        m.insert(k, qvalue_to_json(v));
    }
    serde_json::Value::Object(m)
}

fn qvalue_to_json(v: QValue) -> serde_json::Value {
    use value::Kind as K;
    match v.kind {
        Some(K::StringValue(s)) => serde_json::Value::String(s),
        Some(K::IntegerValue(i)) => serde_json::Value::Number(i.into()),
        Some(K::DoubleValue(f)) => serde_json::json!(f),
        Some(K::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(K::ListValue(list)) => {
            serde_json::Value::Array(list.values.into_iter().map(qvalue_to_json).collect())
        }
        Some(K::StructValue(s)) => serde_json::Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, qvalue_to_json(v)))
                .collect(),
        ),
        Some(K::NullValue(_)) | None => serde_json::Value::Null,
    }
}
