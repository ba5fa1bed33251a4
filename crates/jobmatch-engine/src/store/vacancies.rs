//! Vacancy, parsed-description and requirement queries

use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqliteConnection;

use super::models::{
    NewVacancy, Vacancy, VacancyParsedRow, VacancyRequirementRow, VacancyUpdate,
};
use super::Database;
use crate::errors::{EngineError, Result};
use crate::parser::ParsedDescription;
use crate::requirements::ExtractedRequirement;

impl Database {
    /// Insert a manually created vacancy.
    pub async fn create_vacancy(&self, new: &NewVacancy) -> Result<Vacancy> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, Vacancy>(
            r#"
            INSERT INTO vacancies
                (source, external_id, title, company_name, location, salary_from,
                 salary_to, currency, description, url, published_at, status,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&new.source)
        .bind(&new.external_id)
        .bind(&new.title)
        .bind(&new.company_name)
        .bind(&new.location)
        .bind(new.salary_from)
        .bind(new.salary_to)
        .bind(&new.currency)
        .bind(&new.description)
        .bind(&new.url)
        .bind(new.published_at)
        .bind(new.status.as_deref().unwrap_or("open"))
        .bind(now)
        .bind(now)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn get_vacancy(&self, id: i64) -> Result<Option<Vacancy>> {
        let row = sqlx::query_as::<_, Vacancy>("SELECT * FROM vacancies WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row)
    }

    /// A vacancy that must exist.
    pub async fn require_vacancy(&self, id: i64) -> Result<Vacancy> {
        self.get_vacancy(id)
            .await?
            .ok_or(EngineError::not_found("Vacancy", id))
    }

    pub async fn list_vacancies(&self) -> Result<Vec<Vacancy>> {
        let rows = sqlx::query_as::<_, Vacancy>("SELECT * FROM vacancies ORDER BY id DESC")
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    pub async fn list_vacancy_ids(&self) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as("SELECT id FROM vacancies ORDER BY id ASC")
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn update_vacancy(&self, id: i64, update: &VacancyUpdate) -> Result<Vacancy> {
        let row = sqlx::query_as::<_, Vacancy>(
            r#"
            UPDATE vacancies SET
                title = COALESCE(?, title),
                company_name = COALESCE(?, company_name),
                location = COALESCE(?, location),
                salary_from = COALESCE(?, salary_from),
                salary_to = COALESCE(?, salary_to),
                currency = COALESCE(?, currency),
                description = COALESCE(?, description),
                url = COALESCE(?, url),
                status = COALESCE(?, status),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&update.title)
        .bind(&update.company_name)
        .bind(&update.location)
        .bind(update.salary_from)
        .bind(update.salary_to)
        .bind(&update.currency)
        .bind(&update.description)
        .bind(&update.url)
        .bind(&update.status)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.ok_or(EngineError::not_found("Vacancy", id))
    }

    pub async fn delete_vacancy(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM vacancies WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// UPSERT a vacancy by `(source, external_id)`.
    ///
    /// All mutable fields overwrite; the natural key never changes. Returns
    /// the surrogate id and whether the row was inserted (vs updated).
    pub async fn upsert_vacancy(&self, new: &NewVacancy) -> Result<(i64, bool)> {
        let mut conn = self.pool().acquire().await?;
        upsert_vacancy(&mut conn, new).await
    }

    pub async fn get_parsed(&self, vacancy_id: i64) -> Result<Option<VacancyParsedRow>> {
        let row = sqlx::query_as::<_, VacancyParsedRow>(
            "SELECT * FROM vacancy_parsed WHERE vacancy_id = ?",
        )
        .bind(vacancy_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn get_parsed_plain_text(&self, vacancy_id: i64) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT plain_text FROM vacancy_parsed WHERE vacancy_id = ?")
                .bind(vacancy_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(row.map(|(text,)| text))
    }

    pub async fn list_requirements(&self, vacancy_id: i64) -> Result<Vec<VacancyRequirementRow>> {
        let rows = sqlx::query_as::<_, VacancyRequirementRow>(
            "SELECT * FROM vacancy_requirements WHERE vacancy_id = ? ORDER BY id ASC",
        )
        .bind(vacancy_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Requirements of `skill` kind, the matcher's input.
    pub async fn list_skill_requirements(
        &self,
        vacancy_id: i64,
    ) -> Result<Vec<VacancyRequirementRow>> {
        let rows = sqlx::query_as::<_, VacancyRequirementRow>(
            "SELECT * FROM vacancy_requirements WHERE vacancy_id = ? AND kind = 'skill' ORDER BY id ASC",
        )
        .bind(vacancy_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn list_skill_raw_texts(&self, vacancy_id: i64) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT raw_text FROM vacancy_requirements WHERE vacancy_id = ? AND kind = 'skill' ORDER BY id ASC",
        )
        .bind(vacancy_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(|(text,)| text).collect())
    }

    /// Vacancy ids from a source whose parse is missing or from an older
    /// parser version (or simply all of them, when `only_missing` is false).
    pub async fn list_vacancy_ids_for_reparse(
        &self,
        source: &str,
        parser_version: &str,
        only_missing: bool,
        limit: Option<i64>,
    ) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> = if only_missing {
            sqlx::query_as(
                r#"
                SELECT v.id FROM vacancies v
                LEFT JOIN vacancy_parsed p ON p.vacancy_id = v.id
                WHERE v.source = ? AND (p.vacancy_id IS NULL OR p.version != ?)
                ORDER BY v.id ASC
                LIMIT ?
                "#,
            )
            .bind(source)
            .bind(parser_version)
            .bind(limit.unwrap_or(i64::MAX))
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query_as("SELECT id FROM vacancies WHERE source = ? ORDER BY id ASC LIMIT ?")
                .bind(source)
                .bind(limit.unwrap_or(i64::MAX))
                .fetch_all(self.pool())
                .await?
        };
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

/// Connection-level UPSERT so ingestion can compose it into a per-item
/// transaction with the parse and requirement writes.
pub(crate) async fn upsert_vacancy(
    conn: &mut SqliteConnection,
    new: &NewVacancy,
) -> Result<(i64, bool)> {
    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM vacancies WHERE source = ? AND external_id = ?")
            .bind(&new.source)
            .bind(&new.external_id)
            .fetch_optional(&mut *conn)
            .await?;
    let inserted = existing.is_none();

    let now = Utc::now();
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO vacancies
            (source, external_id, title, company_name, location, salary_from,
             salary_to, currency, description, url, published_at, status,
             created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(source, external_id) DO UPDATE SET
            title = excluded.title,
            company_name = excluded.company_name,
            location = excluded.location,
            salary_from = excluded.salary_from,
            salary_to = excluded.salary_to,
            currency = excluded.currency,
            description = excluded.description,
            url = excluded.url,
            published_at = excluded.published_at,
            status = excluded.status,
            updated_at = excluded.updated_at
        RETURNING id
        "#,
    )
    .bind(&new.source)
    .bind(&new.external_id)
    .bind(&new.title)
    .bind(&new.company_name)
    .bind(&new.location)
    .bind(new.salary_from)
    .bind(new.salary_to)
    .bind(&new.currency)
    .bind(&new.description)
    .bind(&new.url)
    .bind(new.published_at)
    .bind(new.status.as_deref().unwrap_or("open"))
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok((id, inserted))
}

/// UPSERT the parsed form of a vacancy description.
pub(crate) async fn upsert_parsed(
    conn: &mut SqliteConnection,
    vacancy_id: i64,
    parsed: &ParsedDescription,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO vacancy_parsed
            (vacancy_id, plain_text, sections_json, version, quality_score, extracted_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(vacancy_id) DO UPDATE SET
            plain_text = excluded.plain_text,
            sections_json = excluded.sections_json,
            version = excluded.version,
            quality_score = excluded.quality_score,
            extracted_at = excluded.extracted_at
        "#,
    )
    .bind(vacancy_id)
    .bind(&parsed.plain_text)
    .bind(Json(&parsed.sections))
    .bind(&parsed.version)
    .bind(parsed.quality_score)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Replace all generated requirements (`skill` and `constraint` kinds) of a
/// vacancy with a freshly extracted, deduplicated set.
pub(crate) async fn replace_requirements(
    conn: &mut SqliteConnection,
    vacancy_id: i64,
    requirements: &[ExtractedRequirement],
) -> Result<()> {
    sqlx::query(
        "DELETE FROM vacancy_requirements WHERE vacancy_id = ? AND kind IN ('skill', 'constraint')",
    )
    .bind(vacancy_id)
    .execute(&mut *conn)
    .await?;

    let now = Utc::now();
    for requirement in requirements {
        sqlx::query(
            r#"
            INSERT INTO vacancy_requirements
                (vacancy_id, kind, raw_text, normalized_key, weight, is_hard, source, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(vacancy_id, kind, normalized_key) DO UPDATE SET
                raw_text = excluded.raw_text,
                weight = MAX(vacancy_requirements.weight, excluded.weight),
                is_hard = MAX(vacancy_requirements.is_hard, excluded.is_hard),
                source = excluded.source
            "#,
        )
        .bind(vacancy_id)
        .bind(requirement.kind.as_str())
        .bind(&requirement.raw_text)
        .bind(&requirement.normalized_key)
        .bind(requirement.weight)
        .bind(requirement.is_hard)
        .bind(&requirement.source)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::Database;
    use super::*;
    use crate::parser::parse_description;
    use crate::requirements::extract_from_sections;

    fn sample_vacancy(external_id: &str) -> NewVacancy {
        NewVacancy {
            source: "hh".to_string(),
            external_id: external_id.to_string(),
            title: "Backend разработчик".to_string(),
            company_name: Some("Acme".to_string()),
            location: Some("Москва".to_string()),
            salary_from: Some(200_000),
            salary_to: Some(300_000),
            currency: Some("RUR".to_string()),
            description: Some("<p>Требования:</p><ul><li>Python</li></ul>".to_string()),
            url: Some("https://hh.ru/vacancy/1".to_string()),
            published_at: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let db = Database::connect_in_memory().await.unwrap();

        let (id, inserted) = db.upsert_vacancy(&sample_vacancy("v1")).await.unwrap();
        assert!(inserted);

        let mut changed = sample_vacancy("v1");
        changed.title = "Senior Backend разработчик".to_string();
        let (id_again, inserted_again) = db.upsert_vacancy(&changed).await.unwrap();

        assert_eq!(id, id_again);
        assert!(!inserted_again);

        let vacancy = db.require_vacancy(id).await.unwrap();
        assert_eq!(vacancy.title, "Senior Backend разработчик");
        assert_eq!(vacancy.external_id, "v1");
    }

    #[tokio::test]
    async fn test_natural_key_uniqueness() {
        let db = Database::connect_in_memory().await.unwrap();
        db.upsert_vacancy(&sample_vacancy("v1")).await.unwrap();
        db.upsert_vacancy(&sample_vacancy("v1")).await.unwrap();
        db.upsert_vacancy(&sample_vacancy("v2")).await.unwrap();

        let all = db.list_vacancies().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_parsed_round_trip() {
        let db = Database::connect_in_memory().await.unwrap();
        let (id, _) = db.upsert_vacancy(&sample_vacancy("v1")).await.unwrap();

        let parsed = parse_description("<p>Требования:</p><ul><li>Python 3</li><li>SQL</li></ul>");
        let mut conn = db.pool().acquire().await.unwrap();
        upsert_parsed(&mut conn, id, &parsed).await.unwrap();
        drop(conn);

        let row = db.get_parsed(id).await.unwrap().unwrap();
        assert_eq!(row.version, parsed.version);
        assert_eq!(row.sections_json.0, parsed.sections);
        assert_eq!(row.plain_text, parsed.plain_text);
    }

    #[tokio::test]
    async fn test_replace_requirements_is_wholesale() {
        let db = Database::connect_in_memory().await.unwrap();
        let (id, _) = db.upsert_vacancy(&sample_vacancy("v1")).await.unwrap();

        let first = parse_description("<p>Требования:</p><ul><li>Python</li><li>Kafka</li></ul>");
        let mut conn = db.pool().acquire().await.unwrap();
        replace_requirements(&mut conn, id, &extract_from_sections(&first.sections))
            .await
            .unwrap();

        let second = parse_description("<p>Требования:</p><ul><li>Docker</li></ul>");
        replace_requirements(&mut conn, id, &extract_from_sections(&second.sections))
            .await
            .unwrap();
        drop(conn);

        let requirements = db.list_requirements(id).await.unwrap();
        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements[0].raw_text, "Docker");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = Database::connect_in_memory().await.unwrap();
        let (id, _) = db.upsert_vacancy(&sample_vacancy("v1")).await.unwrap();

        let updated = db
            .update_vacancy(
                id,
                &VacancyUpdate {
                    status: Some("closed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, "closed");
        assert_eq!(updated.title, "Backend разработчик");

        assert!(db.delete_vacancy(id).await.unwrap());
        assert!(db.get_vacancy(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reparse_listing() {
        let db = Database::connect_in_memory().await.unwrap();
        let (id, _) = db.upsert_vacancy(&sample_vacancy("v1")).await.unwrap();

        // No parse yet: listed.
        let ids = db
            .list_vacancy_ids_for_reparse("hh", "hh_sections_v2", true, None)
            .await
            .unwrap();
        assert_eq!(ids, vec![id]);

        let parsed = parse_description("<p>Требования:</p><p>Python</p>");
        let mut conn = db.pool().acquire().await.unwrap();
        upsert_parsed(&mut conn, id, &parsed).await.unwrap();
        drop(conn);

        // Current version: not listed.
        let ids = db
            .list_vacancy_ids_for_reparse("hh", "hh_sections_v2", true, None)
            .await
            .unwrap();
        assert!(ids.is_empty());

        // Version bump: listed again.
        let ids = db
            .list_vacancy_ids_for_reparse("hh", "hh_sections_v3", true, None)
            .await
            .unwrap();
        assert_eq!(ids, vec![id]);
    }
}
