//! Core data models: catalog products and search hits.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One raw tabular row: column name → untyped cell text.
pub type RawRecord = BTreeMap<String, String>;

/// A single catalog item, as persisted in the vector store payload.
///
/// `id` doubles as the vector-store point identifier; re-upserting the same
/// id overwrites the whole point (no partial patch).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    /// Primary field embedded for semantic search. Never empty.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Star rating in `[0, 5]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratings: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_of_ratings: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_price: Option<f64>,
}

impl Product {
    /// The text fed to the embedding model. Kept identical on the query
    /// side so document and query vectors stay comparable.
    pub fn embedding_text(&self) -> &str {
        &self.name
    }
}

/// A search hit: product plus cosine similarity score in `[-1, 1]`.
#[derive(Clone, Debug, Serialize)]
pub struct ScoredProduct {
    pub product: Product,
    pub score: f32,
}

#[cfg(test)]
pub(crate) fn sample_product(id: u64, name: &str) -> Product {
    Product {
        id,
        name: name.to_string(),
        main_category: None,
        sub_category: None,
        image: None,
        link: None,
        ratings: None,
        no_of_ratings: None,
        discount_price: None,
        actual_price: None,
    }
}
