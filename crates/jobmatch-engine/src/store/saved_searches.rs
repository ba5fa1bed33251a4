//! Saved-search queries

use chrono::{DateTime, Utc};
use sqlx::types::Json;

use super::models::{NewSavedSearch, SavedSearch, SavedSearchUpdate};
use super::Database;
use crate::errors::{EngineError, Result};

impl Database {
    pub async fn create_saved_search(&self, new: &NewSavedSearch) -> Result<SavedSearch> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, SavedSearch>(
            r#"
            INSERT INTO saved_searches
                (text, area, schedule, experience, salary_from, salary_to, currency,
                 filters_json, per_page, pages_limit, cursor_page, is_active,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 1, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&new.text)
        .bind(&new.area)
        .bind(&new.schedule)
        .bind(&new.experience)
        .bind(new.salary_from)
        .bind(new.salary_to)
        .bind(&new.currency)
        .bind(Json(&new.filters_json))
        .bind(new.per_page.unwrap_or(20))
        .bind(new.pages_limit.unwrap_or(3))
        .bind(now)
        .bind(now)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn get_saved_search(&self, id: i64) -> Result<Option<SavedSearch>> {
        let row = sqlx::query_as::<_, SavedSearch>("SELECT * FROM saved_searches WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row)
    }

    pub async fn require_saved_search(&self, id: i64) -> Result<SavedSearch> {
        self.get_saved_search(id)
            .await?
            .ok_or(EngineError::not_found("SavedSearch", id))
    }

    pub async fn list_saved_searches(&self) -> Result<Vec<SavedSearch>> {
        let rows =
            sqlx::query_as::<_, SavedSearch>("SELECT * FROM saved_searches ORDER BY id DESC")
                .fetch_all(self.pool())
                .await?;
        Ok(rows)
    }

    /// Active searches, the beat tick's work list.
    pub async fn list_active_saved_search_ids(&self) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT id FROM saved_searches WHERE is_active = 1 ORDER BY id ASC")
                .fetch_all(self.pool())
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn update_saved_search(
        &self,
        id: i64,
        update: &SavedSearchUpdate,
    ) -> Result<SavedSearch> {
        let filters = update.filters_json.as_ref().map(Json);
        let row = sqlx::query_as::<_, SavedSearch>(
            r#"
            UPDATE saved_searches SET
                text = COALESCE(?, text),
                area = COALESCE(?, area),
                schedule = COALESCE(?, schedule),
                experience = COALESCE(?, experience),
                salary_from = COALESCE(?, salary_from),
                salary_to = COALESCE(?, salary_to),
                currency = COALESCE(?, currency),
                filters_json = COALESCE(?, filters_json),
                per_page = COALESCE(?, per_page),
                pages_limit = COALESCE(?, pages_limit),
                cursor_page = COALESCE(?, cursor_page),
                is_active = COALESCE(?, is_active),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&update.text)
        .bind(&update.area)
        .bind(&update.schedule)
        .bind(&update.experience)
        .bind(update.salary_from)
        .bind(update.salary_to)
        .bind(&update.currency)
        .bind(filters)
        .bind(update.per_page)
        .bind(update.pages_limit)
        .bind(update.cursor_page)
        .bind(update.is_active)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.ok_or(EngineError::not_found("SavedSearch", id))
    }

    pub async fn delete_saved_search(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM saved_searches WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Advance sync markers after a completed sync.
    pub async fn update_sync_markers(
        &self,
        id: i64,
        last_sync_at: DateTime<Utc>,
        last_seen_published_at: Option<DateTime<Utc>>,
        cursor_page: i64,
    ) -> Result<SavedSearch> {
        let row = sqlx::query_as::<_, SavedSearch>(
            r#"
            UPDATE saved_searches SET
                last_sync_at = ?,
                last_seen_published_at = COALESCE(?, last_seen_published_at),
                cursor_page = ?,
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(last_sync_at)
        .bind(last_seen_published_at)
        .bind(cursor_page)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.ok_or(EngineError::not_found("SavedSearch", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewSavedSearch {
        NewSavedSearch {
            text: "python backend".to_string(),
            area: Some("1".to_string()),
            schedule: None,
            experience: None,
            salary_from: Some(200_000),
            salary_to: None,
            currency: Some("RUR".to_string()),
            filters_json: serde_json::Map::new(),
            per_page: None,
            pages_limit: None,
        }
    }

    #[tokio::test]
    async fn test_create_defaults() {
        let db = Database::connect_in_memory().await.unwrap();
        let search = db.create_saved_search(&sample()).await.unwrap();
        assert_eq!(search.per_page, 20);
        assert_eq!(search.pages_limit, 3);
        assert_eq!(search.cursor_page, 0);
        assert!(search.is_active);
        assert!(search.last_sync_at.is_none());
    }

    #[tokio::test]
    async fn test_filters_json_round_trip() {
        let db = Database::connect_in_memory().await.unwrap();
        let mut new = sample();
        new.filters_json.insert(
            "professional_role".to_string(),
            serde_json::json!(["96", "104"]),
        );
        new.filters_json
            .insert("only_with_salary".to_string(), serde_json::json!(true));

        let search = db.create_saved_search(&new).await.unwrap();
        let loaded = db.require_saved_search(search.id).await.unwrap();
        assert_eq!(
            loaded.filters_json.0.get("professional_role"),
            Some(&serde_json::json!(["96", "104"]))
        );
    }

    #[tokio::test]
    async fn test_active_listing() {
        let db = Database::connect_in_memory().await.unwrap();
        let first = db.create_saved_search(&sample()).await.unwrap();
        let second = db.create_saved_search(&sample()).await.unwrap();

        db.update_saved_search(
            second.id,
            &SavedSearchUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let active = db.list_active_saved_search_ids().await.unwrap();
        assert_eq!(active, vec![first.id]);
    }

    #[tokio::test]
    async fn test_sync_markers_watermark_fallback() {
        let db = Database::connect_in_memory().await.unwrap();
        let search = db.create_saved_search(&sample()).await.unwrap();

        let watermark = Utc::now();
        let updated = db
            .update_sync_markers(search.id, Utc::now(), Some(watermark), 3)
            .await
            .unwrap();
        assert_eq!(updated.cursor_page, 3);
        assert!(updated.last_seen_published_at.is_some());

        // A sync that ingested nothing keeps the previous watermark.
        let kept = db
            .update_sync_markers(search.id, Utc::now(), None, 0)
            .await
            .unwrap();
        assert_eq!(
            kept.last_seen_published_at.map(|t| t.timestamp()),
            Some(watermark.timestamp())
        );
        assert_eq!(kept.cursor_page, 0);
    }
}
