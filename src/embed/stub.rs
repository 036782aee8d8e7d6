//! Deterministic offline embedder for tests and local development.
//!
//! Hashes lowercased alphanumeric tokens into fixed buckets and normalizes.
//! Texts sharing tokens get similar vectors, identical token sets get
//! identical vectors, and no model download is required.

use crate::embed::{EmbeddingsProvider, l2_normalize};
use crate::errors::Error;
use async_trait::async_trait;
use std::hash::{Hash, Hasher};

#[derive(Clone, Debug)]
pub struct StubEmbedder {
    dim: usize,
}

impl StubEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        let mut any = false;
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            v[bucket(token, self.dim)] += 1.0;
            any = true;
        }
        // Punctuation-only input still gets a stable non-zero direction.
        if !any && !text.is_empty() {
            v[bucket(text, self.dim)] = 1.0;
        }
        l2_normalize(&mut v);
        v
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

fn bucket(token: &str, dim: usize) -> usize {
    let mut h = std::collections::hash_map::DefaultHasher::new();
    token.hash(&mut h);
    (h.finish() % dim as u64) as usize
}

#[async_trait]
impl EmbeddingsProvider for StubEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
