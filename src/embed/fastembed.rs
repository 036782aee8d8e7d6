//! Local ONNX embedding backend via `fastembed`.
//!
//! The model is resolved by its published identifier (e.g.
//! `sentence-transformers/all-MiniLM-L6-v2`, 384 dims) and downloaded on
//! first use. A failed load or fetch is [`Error::ModelUnavailable`], which
//! aborts the whole run rather than failing per record.

use crate::embed::{EmbeddingsProvider, l2_normalize};
use crate::errors::Error;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use ::fastembed::{EmbeddingModel, InitOptions, ModelInfo, TextEmbedding};

pub struct FastembedProvider {
    model: Arc<TextEmbedding>,
    dim: usize,
}

/// Resolves a model identifier against the supported-model list.
///
/// Exact `model_code` matches win; otherwise the identifier is matched by
/// base name so published aliases like
/// `sentence-transformers/all-MiniLM-L6-v2` resolve to the ONNX port
/// (`Qdrant/all-MiniLM-L6-v2-onnx`).
fn resolve_model(model_id: &str) -> Result<ModelInfo<EmbeddingModel>, Error> {
    let mut models = TextEmbedding::list_supported_models();
    if let Some(pos) = models.iter().position(|m| m.model_code == model_id) {
        return Ok(models.swap_remove(pos));
    }
    let want = base_name(model_id);
    if let Some(pos) = models.iter().position(|m| base_name(&m.model_code) == want) {
        return Ok(models.swap_remove(pos));
    }
    Err(Error::Config(format!(
        "unknown embedding model '{model_id}'"
    )))
}

/// Model name without the org prefix and ONNX-port suffixes, lowercased.
fn base_name(id: &str) -> String {
    id.rsplit('/')
        .next()
        .unwrap_or(id)
        .to_ascii_lowercase()
        .trim_end_matches("-quantized")
        .trim_end_matches("-onnx")
        .to_string()
}

impl FastembedProvider {
    /// Loads the model named by `model_id`, fetching it on first use.
    ///
    /// # Errors
    /// - [`Error::Config`] when the identifier is not a supported model.
    /// - [`Error::ModelUnavailable`] when the model cannot be loaded or
    ///   downloaded.
    pub fn load(model_id: &str) -> Result<Self, Error> {
        let info = resolve_model(model_id)?;

        info!("Loading embedding model '{}' (dim={})", model_id, info.dim);

        let model = TextEmbedding::try_new(InitOptions {
            model_name: info.model,
            show_download_progress: true,
            ..Default::default()
        })
        .map_err(|e| Error::ModelUnavailable(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
            dim: info.dim,
        })
    }
}

#[async_trait]
impl EmbeddingsProvider for FastembedProvider {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Inference is CPU-bound and blocking; keep it off the async runtime.
        let model = Arc::clone(&self.model);
        let owned = texts.to_vec();
        let mut vectors = tokio::task::spawn_blocking(move || model.embed(owned, None))
            .await
            .map_err(|e| Error::Internal(anyhow::anyhow!("embedding task failed: {e}")))?
            .map_err(|e| Error::ModelUnavailable(e.to_string()))?;

        if vectors.len() != texts.len() {
            return Err(Error::Internal(anyhow::anyhow!(
                "model returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        for v in &mut vectors {
            if v.len() != self.dim {
                return Err(Error::VectorSizeMismatch {
                    got: v.len(),
                    want: self.dim,
                });
            }
            l2_normalize(v);
        }
        Ok(vectors)
    }
}
