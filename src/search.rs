//! Search service: embed the query, filter, delegate ranking to the store.
//!
//! No re-ranking happens here; similarity order, tie-breaking and
//! offset/limit slicing are the store's contract. Absence of data is not
//! a fault: a missing or empty collection yields an empty page.

use crate::embed::EmbeddingsProvider;
use crate::errors::Error;
use crate::product::ScoredProduct;
use crate::store::{ProductFilter, QueryRequest, VectorStore};
use serde::Serialize;
use tracing::{debug, info};

/// Parameters of one search call.
#[derive(Clone, Debug)]
pub struct SearchRequest {
    pub query: String,
    pub collection: String,
    pub main_category: Option<String>,
    pub sub_category: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            collection: collection.into(),
            main_category: None,
            sub_category: None,
            limit: 10,
            offset: 0,
        }
    }
}

/// One result page, with pagination parameters echoed back.
#[derive(Clone, Debug, Serialize)]
pub struct SearchPage {
    pub results: Vec<ScoredProduct>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Embeds `request.query` with the same provider and normalization as
/// ingestion and runs a ranked, filtered similarity query.
///
/// # Errors
/// - [`Error::InvalidArgument`] for a zero limit or an empty query.
/// - Store errors other than `NotFound` (a fresh system has no data yet,
///   so a missing collection is an empty page, not a fault).
pub async fn search(
    store: &dyn VectorStore,
    provider: &dyn EmbeddingsProvider,
    request: &SearchRequest,
) -> Result<SearchPage, Error> {
    if request.limit == 0 {
        return Err(Error::InvalidArgument("limit must be positive".into()));
    }
    if request.query.trim().is_empty() {
        return Err(Error::InvalidArgument("query must be non-empty".into()));
    }

    info!(
        "Searching '{}' in '{}' (limit={}, offset={})",
        request.query, request.collection, request.limit, request.offset
    );

    let vector = provider.embed(&request.query).await?;
    let filter = ProductFilter {
        main_category: request.main_category.clone(),
        sub_category: request.sub_category.clone(),
    };

    let results = match store
        .query(
            &request.collection,
            QueryRequest {
                vector,
                filter,
                limit: request.limit,
                offset: request.offset,
            },
        )
        .await
    {
        Ok(hits) => hits,
        Err(Error::NotFound(what)) => {
            debug!("search against missing collection ({what}), returning empty page");
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    Ok(SearchPage {
        total: results.len(),
        results,
        limit: request.limit,
        offset: request.offset,
    })
}
