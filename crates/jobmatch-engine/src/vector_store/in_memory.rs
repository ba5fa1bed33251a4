//! In-memory vector store for tests and ephemeral runs

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use super::{rank_by_similarity, SearchHit, VectorStore};

pub struct InMemoryVectorStore {
    vectors: RwLock<HashMap<i64, Vec<f32>>>,
    dimensions: usize,
}

impl InMemoryVectorStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            vectors: RwLock::new(HashMap::new()),
            dimensions,
        }
    }

    fn validate(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            anyhow::bail!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimensions,
                vector.len()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, id: i64, vector: &[f32], _model_name: &str) -> Result<()> {
        self.validate(vector)?;
        self.vectors.write().unwrap().insert(id, vector.to_vec());
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Option<Vec<f32>>> {
        Ok(self.vectors.read().unwrap().get(&id).cloned())
    }

    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        self.validate(query)?;
        let entries: Vec<(i64, Vec<f32>)> = self
            .vectors
            .read()
            .unwrap()
            .iter()
            .map(|(id, vector)| (*id, vector.clone()))
            .collect();
        Ok(rank_by_similarity(query, entries.into_iter(), top_k))
    }

    async fn delete(&self, ids: &[i64]) -> Result<u64> {
        let mut vectors = self.vectors.write().unwrap();
        let mut deleted = 0;
        for id in ids {
            if vectors.remove(id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.vectors.read().unwrap().len() as i64)
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
