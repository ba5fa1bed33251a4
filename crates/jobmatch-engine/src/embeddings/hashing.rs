//! Reference hashing embedder
//!
//! Deterministic, dependency-free (no model download): every token is hashed
//! with blake2b, the first eight digest bytes pick a bucket in `[0, D)`, the
//! ninth byte picks the sign, and the accumulated vector is L2-normalized.
//! Useless for semantics, invaluable for tests and air-gapped deployments.

use anyhow::Result;
use async_trait::async_trait;
use blake2::{Blake2b512, Digest};

use super::{l2_norm, l2_normalize, EmbeddingProvider};
use crate::text::tokenize;

#[derive(Debug)]
pub struct HashingProvider {
    dimension: usize,
    name: String,
}

impl HashingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            name: format!("localhash:blake2b-{dimension}"),
        }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        let mut tokens = tokenize(text);
        if tokens.is_empty() {
            // Empty documents still get a unit vector.
            tokens.push(String::new());
        }

        for token in &tokens {
            let digest = Blake2b512::digest(token.as_bytes());
            let bucket_bytes: [u8; 8] = digest[0..8].try_into().unwrap();
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        l2_normalize(&mut vector);
        if l2_norm(&vector) == 0.0 {
            // Signed contributions cancelled out exactly; fall back to a basis vector.
            vector[0] = 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_sync(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deterministic() {
        let provider = HashingProvider::new(384);
        let a = provider.embed("Опыт работы с Python и Docker").await.unwrap();
        let b = provider.embed("Опыт работы с Python и Docker").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_unit_norm() {
        let provider = HashingProvider::new(384);
        for text in ["python developer", "", "k8s"] {
            let vector = provider.embed(text).await.unwrap();
            let norm = l2_norm(&vector);
            assert!((0.99..=1.01).contains(&norm), "norm for {text:?} = {norm}");
        }
    }

    #[tokio::test]
    async fn test_dimension_respected() {
        let provider = HashingProvider::new(64);
        let vector = provider.embed("rust").await.unwrap();
        assert_eq!(vector.len(), 64);
        assert_eq!(provider.dimensions(), 64);
    }

    #[tokio::test]
    async fn test_different_texts_differ() {
        let provider = HashingProvider::new(384);
        let a = provider.embed("python backend developer").await.unwrap();
        let b = provider.embed("frontend react engineer").await.unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_name_carries_dimension() {
        assert_eq!(HashingProvider::new(384).name(), "localhash:blake2b-384");
    }
}
