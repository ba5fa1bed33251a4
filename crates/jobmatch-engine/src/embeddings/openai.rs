//! OpenAI embeddings API provider
//!
//! Reads `OPENAI_API_KEY` from the environment via the client's default
//! configuration. The configured dimension must match the model's output.

use anyhow::{anyhow, Context, Result};
use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;

use super::{l2_normalize, EmbeddingProvider};

const DEFAULT_MODEL: &str = "text-embedding-3-small";

#[derive(Debug)]
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    model: String,
    name: String,
    dimension: usize,
}

impl OpenAiProvider {
    /// Create a provider; `dimension` is requested from the API so any model
    /// that supports dimension reduction matches the configured D.
    pub fn new(model_name: Option<&str>, dimension: usize) -> Result<Self> {
        let model = model_name.unwrap_or(DEFAULT_MODEL).to_string();
        Ok(Self {
            client: Client::new(),
            name: format!("openai:{model}"),
            model,
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(text)
            .dimensions(self.dimension as u32)
            .build()
            .context("failed to build embedding request")?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .context("OpenAI embeddings request failed")?;

        let mut vector = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| anyhow!("OpenAI returned no embedding"))?;

        l2_normalize(&mut vector);
        Ok(vector)
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(texts)
            .dimensions(self.dimension as u32)
            .build()
            .context("failed to build embedding request")?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .context("OpenAI embeddings request failed")?;

        let mut vectors: Vec<Vec<f32>> =
            response.data.into_iter().map(|d| d.embedding).collect();
        for vector in &mut vectors {
            l2_normalize(vector);
        }
        Ok(vectors)
    }
}
