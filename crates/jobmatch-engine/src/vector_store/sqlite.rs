//! SQLite-backed vector store over the embedding tables
//!
//! One instance serves one table (`vacancy_embeddings` or
//! `profile_embeddings`). Search loads every row and ranks in memory; the
//! corpus is bounded by one job board, which keeps brute force well inside
//! interactive latency.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;

use super::{rank_by_similarity, SearchHit, VectorStore};
use crate::store::{blob_to_vec, vec_to_blob, Database};

/// Which embedding table an instance serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTable {
    Vacancies,
    Profiles,
}

impl EmbeddingTable {
    fn table(&self) -> &'static str {
        match self {
            Self::Vacancies => "vacancy_embeddings",
            Self::Profiles => "profile_embeddings",
        }
    }

    fn key_column(&self) -> &'static str {
        match self {
            Self::Vacancies => "vacancy_id",
            Self::Profiles => "profile_id",
        }
    }
}

pub struct SqliteVectorStore {
    db: Database,
    target: EmbeddingTable,
    dimensions: usize,
}

impl SqliteVectorStore {
    pub fn new(db: Database, target: EmbeddingTable, dimensions: usize) -> Self {
        Self {
            db,
            target,
            dimensions,
        }
    }

    /// Store over `vacancy_embeddings`.
    pub fn for_vacancies(db: Database, dimensions: usize) -> Self {
        Self::new(db, EmbeddingTable::Vacancies, dimensions)
    }

    /// Store over `profile_embeddings`.
    pub fn for_profiles(db: Database, dimensions: usize) -> Self {
        Self::new(db, EmbeddingTable::Profiles, dimensions)
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

    /// Entity ids that have no stored vector, ordered ascending. The
    /// recommendation driver appends these after ranked hits.
    pub async fn ids_without_embedding(&self) -> Result<Vec<i64>> {
        let sql = match self.target {
            EmbeddingTable::Vacancies => {
                "SELECT v.id FROM vacancies v \
                 LEFT JOIN vacancy_embeddings e ON e.vacancy_id = v.id \
                 WHERE e.vacancy_id IS NULL ORDER BY v.id ASC"
            }
            EmbeddingTable::Profiles => {
                "SELECT p.id FROM profiles p \
                 LEFT JOIN profile_embeddings e ON e.profile_id = p.id \
                 WHERE e.profile_id IS NULL ORDER BY p.id ASC"
            }
        };
        let rows: Vec<(i64,)> = sqlx::query_as(sql)
            .fetch_all(self.db.pool())
            .await
            .context("Failed to list entities without embeddings")?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(&self, id: i64, vector: &[f32], model_name: &str) -> Result<()> {
        self.validate(vector)?;
        let sql = format!(
            "INSERT INTO {table} ({key}, embedding, model_name, updated_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT({key}) DO UPDATE SET \
                 embedding = excluded.embedding, \
                 model_name = excluded.model_name, \
                 updated_at = excluded.updated_at",
            table = self.target.table(),
            key = self.target.key_column(),
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(vec_to_blob(vector))
            .bind(model_name)
            .bind(Utc::now())
            .execute(self.db.pool())
            .await
            .context("Failed to upsert embedding")?;
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Option<Vec<f32>>> {
        let sql = format!(
            "SELECT embedding FROM {} WHERE {} = ?",
            self.target.table(),
            self.target.key_column(),
        );
        let row: Option<(Vec<u8>,)> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await
            .context("Failed to read embedding")?;
        Ok(row.map(|(blob,)| blob_to_vec(&blob)))
    }

    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        self.validate(query)?;
        let sql = format!(
            "SELECT {}, embedding FROM {}",
            self.target.key_column(),
            self.target.table(),
        );
        let rows: Vec<(i64, Vec<u8>)> = sqlx::query_as(&sql)
            .fetch_all(self.db.pool())
            .await
            .context("Failed to scan embeddings")?;

        Ok(rank_by_similarity(
            query,
            rows.into_iter().map(|(id, blob)| (id, blob_to_vec(&blob))),
            top_k,
        ))
    }

    async fn delete(&self, ids: &[i64]) -> Result<u64> {
        let mut deleted = 0;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            self.target.table(),
            self.target.key_column(),
        );
        for id in ids {
            let result = sqlx::query(&sql)
                .bind(id)
                .execute(self.db.pool())
                .await
                .context("Failed to delete embedding")?;
            deleted += result.rows_affected();
        }
        Ok(deleted)
    }

    async fn count(&self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.target.table());
        let (count,): (i64,) = sqlx::query_as(&sql)
            .fetch_one(self.db.pool())
            .await
            .context("Failed to count embeddings")?;
        Ok(count)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
