//! Score and evidence persistence
//!
//! A score UPSERT and the wholesale replacement of its evidence rows happen
//! in one transaction: readers either see the previous scoring in full or
//! the new one, never a mix.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use super::models::{ResumeEvidenceRow, Vacancy, VacancyScoreRow};
use super::Database;
use crate::errors::Result;
use crate::matching::Explanation;

/// Computed score values to persist.
#[derive(Debug, Clone)]
pub struct ScoreInput {
    pub layer1_score: f64,
    pub layer2_score: f64,
    pub final_score: f64,
    pub verdict: String,
    pub explanation: Explanation,
}

/// One evidence row to persist with a scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceInput {
    pub requirement_id: Option<i64>,
    pub evidence_text: String,
    pub evidence_type: String,
    pub confidence: f64,
}

impl Database {
    /// UPSERT the score for a (profile, vacancy) pair and replace its
    /// evidence rows, atomically.
    pub async fn persist_score(
        &self,
        profile_id: i64,
        vacancy_id: i64,
        score: &ScoreInput,
        evidence: &[EvidenceInput],
    ) -> Result<VacancyScoreRow> {
        let mut tx = self.pool().begin().await?;
        let now = Utc::now();

        sqlx::query("DELETE FROM resume_evidence WHERE profile_id = ? AND vacancy_id = ?")
            .bind(profile_id)
            .bind(vacancy_id)
            .execute(&mut *tx)
            .await?;

        for item in evidence {
            sqlx::query(
                r#"
                INSERT INTO resume_evidence
                    (profile_id, vacancy_id, requirement_id, evidence_text, evidence_type,
                     confidence, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(profile_id)
            .bind(vacancy_id)
            .bind(item.requirement_id)
            .bind(&item.evidence_text)
            .bind(&item.evidence_type)
            .bind(item.confidence)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let row = sqlx::query_as::<_, VacancyScoreRow>(
            r#"
            INSERT INTO vacancy_scores
                (profile_id, vacancy_id, layer1_score, layer2_score, final_score,
                 verdict, explanation, computed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(profile_id, vacancy_id) DO UPDATE SET
                layer1_score = excluded.layer1_score,
                layer2_score = excluded.layer2_score,
                final_score = excluded.final_score,
                verdict = excluded.verdict,
                explanation = excluded.explanation,
                computed_at = excluded.computed_at
            RETURNING *
            "#,
        )
        .bind(profile_id)
        .bind(vacancy_id)
        .bind(score.layer1_score)
        .bind(score.layer2_score)
        .bind(score.final_score)
        .bind(&score.verdict)
        .bind(Json(&score.explanation))
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    pub async fn get_score(
        &self,
        profile_id: i64,
        vacancy_id: i64,
    ) -> Result<Option<VacancyScoreRow>> {
        let row = sqlx::query_as::<_, VacancyScoreRow>(
            "SELECT * FROM vacancy_scores WHERE profile_id = ? AND vacancy_id = ?",
        )
        .bind(profile_id)
        .bind(vacancy_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    /// Stored top-N scores for a profile, joined with vacancy fields.
    pub async fn list_recommendations(
        &self,
        profile_id: i64,
        limit: i64,
    ) -> Result<Vec<(VacancyScoreRow, Vacancy)>> {
        let score_rows = sqlx::query_as::<_, VacancyScoreRow>(
            r#"
            SELECT s.* FROM vacancy_scores s
            JOIN vacancies v ON v.id = s.vacancy_id
            WHERE s.profile_id = ?
            ORDER BY s.final_score DESC, s.id ASC
            LIMIT ?
            "#,
        )
        .bind(profile_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        let mut result = Vec::with_capacity(score_rows.len());
        for score in score_rows {
            if let Some(vacancy) = self.get_vacancy(score.vacancy_id).await? {
                result.push((score, vacancy));
            }
        }
        Ok(result)
    }

    /// Evidence for a pair, strongest first.
    pub async fn list_evidence(
        &self,
        profile_id: i64,
        vacancy_id: i64,
    ) -> Result<Vec<ResumeEvidenceRow>> {
        let rows = sqlx::query_as::<_, ResumeEvidenceRow>(
            r#"
            SELECT * FROM resume_evidence
            WHERE profile_id = ? AND vacancy_id = ?
            ORDER BY confidence DESC, id ASC
            "#,
        )
        .bind(profile_id)
        .bind(vacancy_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}
