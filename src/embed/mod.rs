//! Embedding generation: text → fixed-length unit vector.
//!
//! Backends implement [`EmbeddingsProvider`]; the rest of the crate only
//! sees the trait. Vectors are L2-normalized so cosine similarity reduces
//! to a dot product, on both the document and the query side.

use crate::errors::Error;
use async_trait::async_trait;

pub mod fastembed;
pub mod stub;

/// Provider interface for embedding generation.
///
/// A provider is constructed once per run and shared by reference; it is
/// not safe for unsynchronized concurrent mutation, which is why the
/// interface is `&self` over an internally immutable model handle.
#[async_trait]
pub trait EmbeddingsProvider: Send + Sync {
    /// Output vector length. Fixed for the lifetime of the provider.
    fn dim(&self) -> usize;

    /// Embeds a batch of texts, preserving input order and length.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error>;

    /// Embeds a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Error> {
        let owned = [text.to_string()];
        let mut out = self.embed_many(&owned).await?;
        out.pop()
            .ok_or_else(|| Error::Internal(anyhow::anyhow!("provider returned no vector")))
    }
}

/// Scales `v` to unit L2 norm in place. A near-zero norm is clamped to
/// epsilon instead of dividing by zero.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    let scale = 1.0 / norm.max(f32::EPSILON);
    for x in v.iter_mut() {
        *x *= scale;
    }
}

/// Dot product of two equal-length vectors; cosine similarity when both
/// are unit-normalized.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_yields_unit_norm() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        let norm = dot(&v, &v).sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((v[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn normalize_handles_near_zero_without_nan() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert!(v.iter().all(|x| x.is_finite()));
    }
}
