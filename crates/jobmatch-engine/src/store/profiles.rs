//! Profile, sub-entity and document-version queries
//!
//! Sub-entities are owned by a profile with cascade delete; every accessor
//! takes the owning `profile_id` so ownership mismatches surface as "not
//! found" instead of leaking rows across profiles.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::models::{
    CoverLetterVersion, NewProfile, Profile, ProfileAchievement, ProfileCertificate,
    ProfileEducation, ProfileExperience, ProfileLanguage, ProfileLink, ProfileProject,
    ProfileSkill, ProfileUpdate, ResumeVersion,
};
use super::Database;
use crate::errors::{EngineError, Result};

/// Payload for creating an experience entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExperience {
    pub company_name: String,
    pub position_title: String,
    pub location: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_current: bool,
    pub responsibilities_text: String,
    pub achievements_text: String,
    pub tech_stack_text: Option<String>,
    pub employment_type: Option<String>,
}

/// Payload for creating a project entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub role: Option<String>,
    pub description_text: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub tech_stack_text: Option<String>,
    pub url: Option<String>,
}

/// Payload for creating an achievement entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAchievement {
    pub title: String,
    pub description_text: String,
    pub metric: Option<String>,
    pub achieved_at: Option<NaiveDate>,
    pub related_experience_id: Option<i64>,
    pub related_project_id: Option<i64>,
}

/// Payload for creating an education entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEducation {
    pub institution: String,
    pub degree_level: String,
    pub field_of_study: String,
    pub start_year: Option<i64>,
    pub end_year: Option<i64>,
    pub description_text: Option<String>,
    pub gpa: Option<f64>,
}

/// Payload for creating a certificate entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCertificate {
    pub name: String,
    pub issuer: String,
    pub issued_at: Option<NaiveDate>,
    pub expires_at: Option<NaiveDate>,
    pub url: Option<String>,
}

/// Payload for creating a skill entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSkill {
    pub name_raw: String,
    pub normalized_key: Option<String>,
    pub category: String,
    pub level: String,
    pub years: Option<f64>,
    pub last_used_year: Option<i64>,
    #[serde(default)]
    pub is_primary: bool,
    pub evidence_text: Option<String>,
}

/// Payload for creating a language entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLanguage {
    pub language: String,
    pub level: String,
}

/// Payload for creating a link entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLink {
    #[serde(rename = "type")]
    pub link_type: String,
    pub url: String,
    pub label: Option<String>,
}

/// Payload for creating a resume version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewResumeVersion {
    pub vacancy_id: Option<i64>,
    pub title: Option<String>,
    pub content_text: String,
    pub format: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
}

/// Payload for creating a cover-letter version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCoverLetterVersion {
    pub vacancy_id: Option<i64>,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub content_text: String,
    pub source: Option<String>,
    pub status: Option<String>,
}

impl Database {
    pub async fn create_profile(&self, new: &NewProfile) -> Result<Profile> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles
                (title, resume_text, skills_text, location, remote_ok, relocation_ok,
                 salary_min, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&new.title)
        .bind(&new.resume_text)
        .bind(&new.skills_text)
        .bind(&new.location)
        .bind(new.remote_ok.unwrap_or(true))
        .bind(new.relocation_ok.unwrap_or(false))
        .bind(new.salary_min)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn get_profile(&self, id: i64) -> Result<Option<Profile>> {
        let row = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row)
    }

    pub async fn require_profile(&self, id: i64) -> Result<Profile> {
        self.get_profile(id)
            .await?
            .ok_or(EngineError::not_found("Profile", id))
    }

    pub async fn list_profiles(&self) -> Result<Vec<Profile>> {
        let rows = sqlx::query_as::<_, Profile>("SELECT * FROM profiles ORDER BY id DESC")
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    pub async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<Profile> {
        let row = sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles SET
                title = COALESCE(?, title),
                resume_text = COALESCE(?, resume_text),
                skills_text = COALESCE(?, skills_text),
                location = COALESCE(?, location),
                remote_ok = COALESCE(?, remote_ok),
                relocation_ok = COALESCE(?, relocation_ok),
                salary_min = COALESCE(?, salary_min),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&update.title)
        .bind(&update.resume_text)
        .bind(&update.skills_text)
        .bind(&update.location)
        .bind(update.remote_ok)
        .bind(update.relocation_ok)
        .bind(update.salary_min)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.ok_or(EngineError::not_found("Profile", id))
    }

    pub async fn delete_profile(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- experiences -----------------------------------------------------

    pub async fn create_experience(
        &self,
        profile_id: i64,
        new: &NewExperience,
    ) -> Result<ProfileExperience> {
        self.require_profile(profile_id).await?;
        let row = sqlx::query_as::<_, ProfileExperience>(
            r#"
            INSERT INTO profile_experiences
                (profile_id, company_name, position_title, location, start_date, end_date,
                 is_current, responsibilities_text, achievements_text, tech_stack_text,
                 employment_type, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(profile_id)
        .bind(&new.company_name)
        .bind(&new.position_title)
        .bind(&new.location)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.is_current)
        .bind(&new.responsibilities_text)
        .bind(&new.achievements_text)
        .bind(&new.tech_stack_text)
        .bind(&new.employment_type)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn list_experiences(&self, profile_id: i64) -> Result<Vec<ProfileExperience>> {
        let rows = sqlx::query_as::<_, ProfileExperience>(
            "SELECT * FROM profile_experiences WHERE profile_id = ? ORDER BY start_date DESC, id DESC",
        )
        .bind(profile_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn delete_experience(&self, profile_id: i64, id: i64) -> Result<bool> {
        self.delete_owned(profile_id, id, "profile_experiences").await
    }

    // --- projects --------------------------------------------------------

    pub async fn create_project(
        &self,
        profile_id: i64,
        new: &NewProject,
    ) -> Result<ProfileProject> {
        self.require_profile(profile_id).await?;
        let row = sqlx::query_as::<_, ProfileProject>(
            r#"
            INSERT INTO profile_projects
                (profile_id, name, role, description_text, start_date, end_date,
                 tech_stack_text, url, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(profile_id)
        .bind(&new.name)
        .bind(&new.role)
        .bind(&new.description_text)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(&new.tech_stack_text)
        .bind(&new.url)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn list_projects(&self, profile_id: i64) -> Result<Vec<ProfileProject>> {
        let rows = sqlx::query_as::<_, ProfileProject>(
            "SELECT * FROM profile_projects WHERE profile_id = ? ORDER BY id DESC",
        )
        .bind(profile_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn delete_project(&self, profile_id: i64, id: i64) -> Result<bool> {
        self.delete_owned(profile_id, id, "profile_projects").await
    }

    // --- achievements ----------------------------------------------------

    pub async fn create_achievement(
        &self,
        profile_id: i64,
        new: &NewAchievement,
    ) -> Result<ProfileAchievement> {
        self.require_profile(profile_id).await?;
        let row = sqlx::query_as::<_, ProfileAchievement>(
            r#"
            INSERT INTO profile_achievements
                (profile_id, title, description_text, metric, achieved_at,
                 related_experience_id, related_project_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(profile_id)
        .bind(&new.title)
        .bind(&new.description_text)
        .bind(&new.metric)
        .bind(new.achieved_at)
        .bind(new.related_experience_id)
        .bind(new.related_project_id)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn list_achievements(&self, profile_id: i64) -> Result<Vec<ProfileAchievement>> {
        let rows = sqlx::query_as::<_, ProfileAchievement>(
            "SELECT * FROM profile_achievements WHERE profile_id = ? ORDER BY id DESC",
        )
        .bind(profile_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn delete_achievement(&self, profile_id: i64, id: i64) -> Result<bool> {
        self.delete_owned(profile_id, id, "profile_achievements").await
    }

    // --- education -------------------------------------------------------

    pub async fn create_education(
        &self,
        profile_id: i64,
        new: &NewEducation,
    ) -> Result<ProfileEducation> {
        self.require_profile(profile_id).await?;
        let row = sqlx::query_as::<_, ProfileEducation>(
            r#"
            INSERT INTO profile_education
                (profile_id, institution, degree_level, field_of_study, start_year,
                 end_year, description_text, gpa, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(profile_id)
        .bind(&new.institution)
        .bind(&new.degree_level)
        .bind(&new.field_of_study)
        .bind(new.start_year)
        .bind(new.end_year)
        .bind(&new.description_text)
        .bind(new.gpa)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn list_education(&self, profile_id: i64) -> Result<Vec<ProfileEducation>> {
        let rows = sqlx::query_as::<_, ProfileEducation>(
            "SELECT * FROM profile_education WHERE profile_id = ? ORDER BY id DESC",
        )
        .bind(profile_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn delete_education(&self, profile_id: i64, id: i64) -> Result<bool> {
        self.delete_owned(profile_id, id, "profile_education").await
    }

    // --- certificates ----------------------------------------------------

    pub async fn create_certificate(
        &self,
        profile_id: i64,
        new: &NewCertificate,
    ) -> Result<ProfileCertificate> {
        self.require_profile(profile_id).await?;
        let row = sqlx::query_as::<_, ProfileCertificate>(
            r#"
            INSERT INTO profile_certificates
                (profile_id, name, issuer, issued_at, expires_at, url, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(profile_id)
        .bind(&new.name)
        .bind(&new.issuer)
        .bind(new.issued_at)
        .bind(new.expires_at)
        .bind(&new.url)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn list_certificates(&self, profile_id: i64) -> Result<Vec<ProfileCertificate>> {
        let rows = sqlx::query_as::<_, ProfileCertificate>(
            "SELECT * FROM profile_certificates WHERE profile_id = ? ORDER BY id DESC",
        )
        .bind(profile_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn delete_certificate(&self, profile_id: i64, id: i64) -> Result<bool> {
        self.delete_owned(profile_id, id, "profile_certificates").await
    }

    // --- skills ----------------------------------------------------------

    pub async fn create_skill(&self, profile_id: i64, new: &NewSkill) -> Result<ProfileSkill> {
        self.require_profile(profile_id).await?;
        let row = sqlx::query_as::<_, ProfileSkill>(
            r#"
            INSERT INTO profile_skills
                (profile_id, name_raw, normalized_key, category, level, years,
                 last_used_year, is_primary, evidence_text, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(profile_id)
        .bind(&new.name_raw)
        .bind(&new.normalized_key)
        .bind(&new.category)
        .bind(&new.level)
        .bind(new.years)
        .bind(new.last_used_year)
        .bind(new.is_primary)
        .bind(&new.evidence_text)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn list_skills(&self, profile_id: i64) -> Result<Vec<ProfileSkill>> {
        let rows = sqlx::query_as::<_, ProfileSkill>(
            "SELECT * FROM profile_skills WHERE profile_id = ? ORDER BY id ASC",
        )
        .bind(profile_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn delete_skill(&self, profile_id: i64, id: i64) -> Result<bool> {
        self.delete_owned(profile_id, id, "profile_skills").await
    }

    // --- languages -------------------------------------------------------

    pub async fn create_language(
        &self,
        profile_id: i64,
        new: &NewLanguage,
    ) -> Result<ProfileLanguage> {
        self.require_profile(profile_id).await?;
        let row = sqlx::query_as::<_, ProfileLanguage>(
            r#"
            INSERT INTO profile_languages (profile_id, language, level, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(profile_id)
        .bind(&new.language)
        .bind(&new.level)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn list_languages(&self, profile_id: i64) -> Result<Vec<ProfileLanguage>> {
        let rows = sqlx::query_as::<_, ProfileLanguage>(
            "SELECT * FROM profile_languages WHERE profile_id = ? ORDER BY id ASC",
        )
        .bind(profile_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn delete_language(&self, profile_id: i64, id: i64) -> Result<bool> {
        self.delete_owned(profile_id, id, "profile_languages").await
    }

    // --- links -----------------------------------------------------------

    pub async fn create_link(&self, profile_id: i64, new: &NewLink) -> Result<ProfileLink> {
        self.require_profile(profile_id).await?;
        let row = sqlx::query_as::<_, ProfileLink>(
            r#"
            INSERT INTO profile_links (profile_id, link_type, url, label, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(profile_id)
        .bind(&new.link_type)
        .bind(&new.url)
        .bind(&new.label)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn list_links(&self, profile_id: i64) -> Result<Vec<ProfileLink>> {
        let rows = sqlx::query_as::<_, ProfileLink>(
            "SELECT * FROM profile_links WHERE profile_id = ? ORDER BY id ASC",
        )
        .bind(profile_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn delete_link(&self, profile_id: i64, id: i64) -> Result<bool> {
        self.delete_owned(profile_id, id, "profile_links").await
    }

    // --- document versions -----------------------------------------------

    pub async fn create_resume_version(
        &self,
        profile_id: i64,
        new: &NewResumeVersion,
    ) -> Result<ResumeVersion> {
        self.require_profile(profile_id).await?;
        let status = new.status.as_deref().unwrap_or("draft");
        let approved_at: Option<DateTime<Utc>> =
            if status == "approved" { Some(Utc::now()) } else { None };

        let row = sqlx::query_as::<_, ResumeVersion>(
            r#"
            INSERT INTO resume_versions
                (profile_id, vacancy_id, title, content_text, format, source, status,
                 created_at, approved_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(profile_id)
        .bind(new.vacancy_id)
        .bind(&new.title)
        .bind(&new.content_text)
        .bind(new.format.as_deref().unwrap_or("plain"))
        .bind(new.source.as_deref().unwrap_or("user"))
        .bind(status)
        .bind(Utc::now())
        .bind(approved_at)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn list_resume_versions(&self, profile_id: i64) -> Result<Vec<ResumeVersion>> {
        let rows = sqlx::query_as::<_, ResumeVersion>(
            "SELECT * FROM resume_versions WHERE profile_id = ? ORDER BY id DESC",
        )
        .bind(profile_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Mark a resume version approved. Versions are otherwise immutable.
    pub async fn approve_resume_version(&self, profile_id: i64, id: i64) -> Result<ResumeVersion> {
        let row = sqlx::query_as::<_, ResumeVersion>(
            r#"
            UPDATE resume_versions SET status = 'approved', approved_at = ?
            WHERE id = ? AND profile_id = ?
            RETURNING *
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .bind(profile_id)
        .fetch_optional(self.pool())
        .await?;
        row.ok_or(EngineError::not_found("ResumeVersion", id))
    }

    pub async fn has_resume_versions(&self, profile_id: i64) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM resume_versions WHERE profile_id = ? LIMIT 1")
                .bind(profile_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(row.is_some())
    }

    pub async fn create_cover_letter_version(
        &self,
        profile_id: i64,
        new: &NewCoverLetterVersion,
    ) -> Result<CoverLetterVersion> {
        self.require_profile(profile_id).await?;
        let status = new.status.as_deref().unwrap_or("draft");
        let approved_at: Option<DateTime<Utc>> =
            if status == "approved" { Some(Utc::now()) } else { None };

        let row = sqlx::query_as::<_, CoverLetterVersion>(
            r#"
            INSERT INTO cover_letter_versions
                (profile_id, vacancy_id, title, subject, content_text, source, status,
                 created_at, approved_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(profile_id)
        .bind(new.vacancy_id)
        .bind(&new.title)
        .bind(&new.subject)
        .bind(&new.content_text)
        .bind(new.source.as_deref().unwrap_or("user"))
        .bind(status)
        .bind(Utc::now())
        .bind(approved_at)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn list_cover_letter_versions(
        &self,
        profile_id: i64,
    ) -> Result<Vec<CoverLetterVersion>> {
        let rows = sqlx::query_as::<_, CoverLetterVersion>(
            "SELECT * FROM cover_letter_versions WHERE profile_id = ? ORDER BY id DESC",
        )
        .bind(profile_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn approve_cover_letter_version(
        &self,
        profile_id: i64,
        id: i64,
    ) -> Result<CoverLetterVersion> {
        let row = sqlx::query_as::<_, CoverLetterVersion>(
            r#"
            UPDATE cover_letter_versions SET status = 'approved', approved_at = ?
            WHERE id = ? AND profile_id = ?
            RETURNING *
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .bind(profile_id)
        .fetch_optional(self.pool())
        .await?;
        row.ok_or(EngineError::not_found("CoverLetterVersion", id))
    }

    /// Delete a sub-entity row scoped to its owning profile.
    async fn delete_owned(&self, profile_id: i64, id: i64, table: &str) -> Result<bool> {
        let sql = format!("DELETE FROM {table} WHERE id = ? AND profile_id = ?");
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(profile_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::NewProfile;

    async fn profile(db: &Database) -> Profile {
        db.create_profile(&NewProfile {
            resume_text: "Python разработчик, 5 лет опыта".to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_profile_crud() {
        let db = Database::connect_in_memory().await.unwrap();
        let created = profile(&db).await;
        assert!(created.remote_ok);
        assert!(!created.relocation_ok);

        let updated = db
            .update_profile(
                created.id,
                &ProfileUpdate {
                    salary_min: Some(250_000),
                    relocation_ok: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.salary_min, Some(250_000));
        assert!(updated.relocation_ok);
        assert_eq!(updated.resume_text, created.resume_text);

        assert!(db.delete_profile(created.id).await.unwrap());
        assert!(db.get_profile(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cascade_delete_of_sub_entities() {
        let db = Database::connect_in_memory().await.unwrap();
        let owner = profile(&db).await;

        db.create_skill(
            owner.id,
            &NewSkill {
                name_raw: "Python".to_string(),
                normalized_key: Some("python".to_string()),
                category: "technical".to_string(),
                level: "senior".to_string(),
                years: Some(5.0),
                last_used_year: Some(2026),
                is_primary: true,
                evidence_text: None,
            },
        )
        .await
        .unwrap();

        db.delete_profile(owner.id).await.unwrap();
        let skills = db.list_skills(owner.id).await.unwrap();
        assert!(skills.is_empty());
    }

    #[tokio::test]
    async fn test_sub_entity_ownership_scoping() {
        let db = Database::connect_in_memory().await.unwrap();
        let owner = profile(&db).await;
        let stranger = profile(&db).await;

        let language = db
            .create_language(
                owner.id,
                &NewLanguage {
                    language: "English".to_string(),
                    level: "B2".to_string(),
                },
            )
            .await
            .unwrap();

        // Deleting through the wrong profile must not touch the row.
        assert!(!db.delete_language(stranger.id, language.id).await.unwrap());
        assert_eq!(db.list_languages(owner.id).await.unwrap().len(), 1);

        assert!(db.delete_language(owner.id, language.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_experience_ordering() {
        let db = Database::connect_in_memory().await.unwrap();
        let owner = profile(&db).await;

        for (company, year) in [("Старая", 2018), ("Новая", 2023)] {
            db.create_experience(
                owner.id,
                &NewExperience {
                    company_name: company.to_string(),
                    position_title: "Разработчик".to_string(),
                    location: None,
                    start_date: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
                    end_date: None,
                    is_current: year == 2023,
                    responsibilities_text: "писать код".to_string(),
                    achievements_text: "ускорил все".to_string(),
                    tech_stack_text: None,
                    employment_type: None,
                },
            )
            .await
            .unwrap();
        }

        let experiences = db.list_experiences(owner.id).await.unwrap();
        assert_eq!(experiences[0].company_name, "Новая");
    }

    #[tokio::test]
    async fn test_resume_version_approval() {
        let db = Database::connect_in_memory().await.unwrap();
        let owner = profile(&db).await;

        let version = db
            .create_resume_version(
                owner.id,
                &NewResumeVersion {
                    vacancy_id: None,
                    title: None,
                    content_text: "Резюме".to_string(),
                    format: None,
                    source: None,
                    status: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(version.status, "draft");
        assert!(version.approved_at.is_none());

        let approved = db.approve_resume_version(owner.id, version.id).await.unwrap();
        assert_eq!(approved.status, "approved");
        assert!(approved.approved_at.is_some());

        assert!(db.has_resume_versions(owner.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_profile_rejected() {
        let db = Database::connect_in_memory().await.unwrap();
        let err = db
            .create_language(
                999,
                &NewLanguage {
                    language: "English".to_string(),
                    level: "B2".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
