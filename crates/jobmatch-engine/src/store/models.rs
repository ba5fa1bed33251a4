//! Row types for the entity store
//!
//! Every cross-entity link is an integer id, matching the persistence model;
//! rows never hold references to each other in memory.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::matching::Explanation;
use crate::parser::ParsedSections;

/// External job posting. `(source, external_id)` is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vacancy {
    pub id: i64,
    pub source: String,
    pub external_id: String,
    pub title: String,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub salary_from: Option<i64>,
    pub salary_to: Option<i64>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable vacancy fields for insert/upsert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewVacancy {
    pub source: String,
    pub external_id: String,
    pub title: String,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub salary_from: Option<i64>,
    pub salary_to: Option<i64>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

/// Partial vacancy update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VacancyUpdate {
    pub title: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub salary_from: Option<i64>,
    pub salary_to: Option<i64>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub status: Option<String>,
}

/// Parsed form of a vacancy description, 1:1 with `Vacancy`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VacancyParsedRow {
    pub vacancy_id: i64,
    pub plain_text: String,
    pub sections_json: Json<ParsedSections>,
    pub version: String,
    pub quality_score: f64,
    pub extracted_at: DateTime<Utc>,
}

/// One extracted requirement of a vacancy.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VacancyRequirementRow {
    pub id: i64,
    pub vacancy_id: i64,
    pub kind: String,
    pub raw_text: String,
    pub normalized_key: String,
    pub weight: i64,
    pub is_hard: bool,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Candidate profile.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: i64,
    pub title: Option<String>,
    pub resume_text: String,
    pub skills_text: Option<String>,
    pub location: Option<String>,
    pub remote_ok: bool,
    pub relocation_ok: bool,
    pub salary_min: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProfile {
    pub title: Option<String>,
    pub resume_text: String,
    pub skills_text: Option<String>,
    pub location: Option<String>,
    pub remote_ok: Option<bool>,
    pub relocation_ok: Option<bool>,
    pub salary_min: Option<i64>,
}

/// Partial profile update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub title: Option<String>,
    pub resume_text: Option<String>,
    pub skills_text: Option<String>,
    pub location: Option<String>,
    pub remote_ok: Option<bool>,
    pub relocation_ok: Option<bool>,
    pub salary_min: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileExperience {
    pub id: i64,
    pub profile_id: i64,
    pub company_name: String,
    pub position_title: String,
    pub location: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
    pub responsibilities_text: String,
    pub achievements_text: String,
    pub tech_stack_text: Option<String>,
    pub employment_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileProject {
    pub id: i64,
    pub profile_id: i64,
    pub name: String,
    pub role: Option<String>,
    pub description_text: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub tech_stack_text: Option<String>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileAchievement {
    pub id: i64,
    pub profile_id: i64,
    pub title: String,
    pub description_text: String,
    pub metric: Option<String>,
    pub achieved_at: Option<NaiveDate>,
    pub related_experience_id: Option<i64>,
    pub related_project_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileEducation {
    pub id: i64,
    pub profile_id: i64,
    pub institution: String,
    pub degree_level: String,
    pub field_of_study: String,
    pub start_year: Option<i64>,
    pub end_year: Option<i64>,
    pub description_text: Option<String>,
    pub gpa: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileCertificate {
    pub id: i64,
    pub profile_id: i64,
    pub name: String,
    pub issuer: String,
    pub issued_at: Option<NaiveDate>,
    pub expires_at: Option<NaiveDate>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileSkill {
    pub id: i64,
    pub profile_id: i64,
    pub name_raw: String,
    pub normalized_key: Option<String>,
    pub category: String,
    pub level: String,
    pub years: Option<f64>,
    pub last_used_year: Option<i64>,
    pub is_primary: bool,
    pub evidence_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileLanguage {
    pub id: i64,
    pub profile_id: i64,
    pub language: String,
    pub level: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileLink {
    pub id: i64,
    pub profile_id: i64,
    #[serde(rename = "type")]
    pub link_type: String,
    pub url: String,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Immutable resume draft attached to a profile (and optionally a vacancy).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ResumeVersion {
    pub id: i64,
    pub profile_id: i64,
    pub vacancy_id: Option<i64>,
    pub title: Option<String>,
    pub content_text: String,
    pub format: String,
    pub source: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Immutable cover-letter draft.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CoverLetterVersion {
    pub id: i64,
    pub profile_id: i64,
    pub vacancy_id: Option<i64>,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub content_text: String,
    pub source: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Evidence snippet for a matched requirement; the requirement link nulls
/// out when the requirement row is deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ResumeEvidenceRow {
    pub id: i64,
    pub profile_id: i64,
    pub vacancy_id: i64,
    pub requirement_id: Option<i64>,
    pub evidence_text: String,
    pub evidence_type: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

/// Match score for a (profile, vacancy) pair; unique per pair.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VacancyScoreRow {
    pub id: i64,
    pub profile_id: i64,
    pub vacancy_id: i64,
    pub layer1_score: f64,
    pub layer2_score: f64,
    pub final_score: f64,
    pub verdict: String,
    pub explanation: Json<Explanation>,
    pub computed_at: DateTime<Utc>,
}

/// Stored query with pagination cursor and publish-date watermark.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SavedSearch {
    pub id: i64,
    pub text: String,
    pub area: Option<String>,
    pub schedule: Option<String>,
    pub experience: Option<String>,
    pub salary_from: Option<i64>,
    pub salary_to: Option<i64>,
    pub currency: Option<String>,
    pub filters_json: Json<serde_json::Map<String, serde_json::Value>>,
    pub per_page: i64,
    pub pages_limit: i64,
    pub cursor_page: i64,
    pub is_active: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_seen_published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a saved search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSavedSearch {
    pub text: String,
    pub area: Option<String>,
    pub schedule: Option<String>,
    pub experience: Option<String>,
    pub salary_from: Option<i64>,
    pub salary_to: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub filters_json: serde_json::Map<String, serde_json::Value>,
    pub per_page: Option<i64>,
    pub pages_limit: Option<i64>,
}

/// Partial saved-search update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavedSearchUpdate {
    pub text: Option<String>,
    pub area: Option<String>,
    pub schedule: Option<String>,
    pub experience: Option<String>,
    pub salary_from: Option<i64>,
    pub salary_to: Option<i64>,
    pub currency: Option<String>,
    pub filters_json: Option<serde_json::Map<String, serde_json::Value>>,
    pub per_page: Option<i64>,
    pub pages_limit: Option<i64>,
    pub cursor_page: Option<i64>,
    pub is_active: Option<bool>,
}
