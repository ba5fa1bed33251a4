//! Vector store abstraction
//!
//! UPSERT plus cosine k-NN keyed by entity id. Two backends: the
//! SQLite-backed store over the embedding tables (production) and an
//! in-memory store (tests). Vectors are unit-norm by construction, so
//! cosine distance is `1 - dot`.

mod in_memory;
mod sqlite;

pub use in_memory::InMemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use anyhow::Result;
use async_trait::async_trait;

/// One nearest-neighbor hit, most similar first.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Entity id the vector is keyed by.
    pub id: i64,
    /// Cosine similarity to the query, in [-1, 1].
    pub similarity: f32,
}

/// Trait for vector storage backends keyed by entity id.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or update the vector for an entity.
    async fn upsert(&self, id: i64, vector: &[f32], model_name: &str) -> Result<()>;

    /// Fetch the stored vector for an entity, if any.
    async fn get(&self, id: i64) -> Result<Option<Vec<f32>>>;

    /// Nearest neighbors by cosine similarity, descending; entities without
    /// a stored vector are absent from the result.
    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>>;

    /// Delete vectors by entity id, returning how many existed.
    async fn delete(&self, ids: &[i64]) -> Result<u64>;

    /// Number of stored vectors.
    async fn count(&self) -> Result<i64>;

    /// Backend name, for logging.
    fn backend_name(&self) -> &'static str;

    /// Expected vector dimension.
    fn dimensions(&self) -> usize;
}

/// Cosine similarity of two vectors; 0.0 on length mismatch or zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Rank `(id, vector)` pairs against a query, descending similarity with
/// ascending id as the tie-breaker.
pub(crate) fn rank_by_similarity(
    query: &[f32],
    entries: impl Iterator<Item = (i64, Vec<f32>)>,
    top_k: usize,
) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = entries
        .map(|(id, vector)| SearchHit {
            id,
            similarity: cosine_similarity(query, &vector),
        })
        .collect();

    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
    hits.truncate(top_k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_ordering_and_ties() {
        let entries = vec![
            (3_i64, vec![1.0, 0.0]),
            (1_i64, vec![1.0, 0.0]),
            (2_i64, vec![0.0, 1.0]),
        ];
        let hits = rank_by_similarity(&[1.0, 0.0], entries.into_iter(), 10);
        // Equal similarity resolves by ascending id.
        assert_eq!(hits[0].id, 1);
        assert_eq!(hits[1].id, 3);
        assert_eq!(hits[2].id, 2);
    }

    #[test]
    fn test_rank_truncates() {
        let entries = (0..10_i64).map(|id| (id, vec![1.0, 0.0]));
        let hits = rank_by_similarity(&[1.0, 0.0], entries, 3);
        assert_eq!(hits.len(), 3);
    }
}
