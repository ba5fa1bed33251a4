//! Embedding provider abstraction
//!
//! A provider is the small capability set `{name, dimensions, embed,
//! embed_batch}`. Implementations:
//!
//! - `localhash` — deterministic blake2b token hashing (reference, default)
//! - `fastembed` — local ONNX models (behind the `fastembed` feature)
//! - `openai` — embeddings API (behind the `openai` feature)
//!
//! Every produced vector is L2-normalized so the vector store's cosine
//! distance is equivalent to a dot product. The provider is acquired once
//! per process via [`global_provider`] with eager dimension validation.

mod documents;
mod factory;
mod hashing;

#[cfg(feature = "fastembed")]
mod fastembed;

#[cfg(feature = "openai")]
mod openai;

pub use documents::{build_profile_document, build_vacancy_document, MAX_DOCUMENT_CHARS};
pub use factory::{create_provider, global_provider};
pub use hashing::HashingProvider;

#[cfg(feature = "fastembed")]
pub use fastembed::FastEmbedProvider;

#[cfg(feature = "openai")]
pub use openai::OpenAiProvider;

use anyhow::Result;
use async_trait::async_trait;

/// Trait for embedding generation providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Provider identity, persisted as `model_name` with every embedding row.
    fn name(&self) -> &str;

    /// Dimension of every produced vector.
    fn dimensions(&self) -> usize;

    /// Embed a single text into a unit-norm vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed multiple texts, one vector per input, in order.
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(&text).await?);
        }
        Ok(results)
    }
}

/// L2-normalize a vector in place. A zero vector is left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = l2_norm(vector);
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Euclidean norm of a vector.
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedProvider;

    #[async_trait]
    impl EmbeddingProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn dimensions(&self) -> usize {
            3
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0])
        }
    }

    #[tokio::test]
    async fn test_embed_batch_default_preserves_order() {
        let provider = FixedProvider;
        let vectors = provider
            .embed_batch(vec!["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_l2_normalize() {
        let mut vector = vec![3.0, 4.0];
        l2_normalize(&mut vector);
        assert!((l2_norm(&vector) - 1.0).abs() < 1e-6);
        assert!((vector[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let mut vector = vec![0.0, 0.0];
        l2_normalize(&mut vector);
        assert_eq!(vector, vec![0.0, 0.0]);
    }
}
