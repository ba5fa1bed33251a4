//! Local ONNX embedding provider via fastembed
//!
//! Models are downloaded on first use and cached locally. Inference is
//! CPU-bound and does not suspend.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::{l2_normalize, EmbeddingProvider};

pub struct FastEmbedProvider {
    model: TextEmbedding,
    name: String,
    dimension: usize,
}

impl FastEmbedProvider {
    /// Create a provider for a model name; `None` selects all-MiniLM-L6-v2.
    pub fn new(model_name: Option<&str>) -> Result<Self> {
        let (model, dimension, canonical) = Self::resolve_model(model_name)?;

        let text_embedding =
            TextEmbedding::try_new(InitOptions::new(model).with_show_download_progress(false))
                .map_err(|e| anyhow!("failed to initialize fastembed model {canonical}: {e}"))?;

        Ok(Self {
            model: text_embedding,
            name: format!("fastembed:{canonical}"),
            dimension,
        })
    }

    fn resolve_model(model_name: Option<&str>) -> Result<(EmbeddingModel, usize, &'static str)> {
        match model_name.unwrap_or("all-minilm-l6-v2").to_lowercase().as_str() {
            "all-minilm-l6-v2" | "all-minilm" | "minilm" => {
                Ok((EmbeddingModel::AllMiniLML6V2, 384, "all-minilm-l6-v2"))
            }
            "bge-small-en-v1.5" | "bge-small" => {
                Ok((EmbeddingModel::BGESmallENV15, 384, "bge-small-en-v1.5"))
            }
            "multilingual-e5-small" | "e5-small" => {
                Ok((EmbeddingModel::MultilingualE5Small, 384, "multilingual-e5-small"))
            }
            other => Err(anyhow!(
                "Unknown fastembed model: {other}. Supported: all-minilm-l6-v2, bge-small-en-v1.5, multilingual-e5-small"
            )),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self
            .model
            .embed(vec![text.to_string()], None)
            .map_err(|e| anyhow!("fastembed embedding failed: {e}"))?;
        let mut vector = vectors
            .pop()
            .ok_or_else(|| anyhow!("fastembed returned no embedding"))?;
        l2_normalize(&mut vector);
        Ok(vector)
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut vectors = self
            .model
            .embed(texts, None)
            .map_err(|e| anyhow!("fastembed embedding failed: {e}"))?;
        for vector in &mut vectors {
            l2_normalize(vector);
        }
        Ok(vectors)
    }
}
