//! Entity store over SQLite
//!
//! One [`Database`] handle wraps a connection pool; the schema is created
//! idempotently at startup. Natural-key UPSERTs (`(source, external_id)` for
//! vacancies, `(profile_id, vacancy_id)` for scores, entity id for
//! embeddings) are the only serialization mechanism; there is no global lock.

mod models;
mod profiles;
mod saved_searches;
mod scores;
mod vacancies;

pub use models::*;
pub use profiles::{
    NewAchievement, NewCertificate, NewCoverLetterVersion, NewEducation, NewExperience,
    NewLanguage, NewLink, NewProject, NewResumeVersion, NewSkill,
};
pub use scores::{EvidenceInput, ScoreInput};
pub(crate) use vacancies::{replace_requirements, upsert_parsed, upsert_vacancy};

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

/// Handle to the relational store. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (and create if missing) the database at `database_url`.
    ///
    /// Accepts a plain path, a `sqlite:` URL, or `:memory:`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let expanded = shellexpand::tilde(database_url).to_string();

        let url = if expanded == ":memory:" || expanded == "sqlite::memory:" {
            "sqlite::memory:".to_string()
        } else if expanded.starts_with("sqlite:") {
            expanded.clone()
        } else {
            format!("sqlite:{expanded}")
        };

        if let Some(path) = url.strip_prefix("sqlite:") {
            if path != ":memory:" {
                if let Some(parent) = Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)
                            .context("Failed to create database directory")?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(&url)
            .context("Invalid DATABASE_URL")?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database exists per connection; pooling more than one
        // would hand out empty databases.
        let max_connections = if url.ends_with(":memory:") { 1 } else { 10 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        let db = Self { pool };
        db.setup().await?;
        Ok(db)
    }

    /// In-memory database for tests.
    pub async fn connect_in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// The underlying pool, for modules that manage their own statements.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables and indexes.
    async fn setup(&self) -> Result<()> {
        let statements: &[(&str, &str)] = &[
            (
                "vacancies",
                r#"
                CREATE TABLE IF NOT EXISTS vacancies (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    source TEXT NOT NULL,
                    external_id TEXT NOT NULL,
                    title TEXT NOT NULL,
                    company_name TEXT,
                    location TEXT,
                    salary_from INTEGER,
                    salary_to INTEGER,
                    currency TEXT,
                    description TEXT,
                    url TEXT,
                    published_at TEXT,
                    status TEXT NOT NULL DEFAULT 'open',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE(source, external_id)
                )
                "#,
            ),
            (
                "vacancy_parsed",
                r#"
                CREATE TABLE IF NOT EXISTS vacancy_parsed (
                    vacancy_id INTEGER PRIMARY KEY
                        REFERENCES vacancies(id) ON DELETE CASCADE,
                    plain_text TEXT NOT NULL,
                    sections_json TEXT NOT NULL,
                    version TEXT NOT NULL,
                    quality_score REAL NOT NULL,
                    extracted_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "vacancy_requirements",
                r#"
                CREATE TABLE IF NOT EXISTS vacancy_requirements (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    vacancy_id INTEGER NOT NULL
                        REFERENCES vacancies(id) ON DELETE CASCADE,
                    kind TEXT NOT NULL,
                    raw_text TEXT NOT NULL,
                    normalized_key TEXT NOT NULL,
                    weight INTEGER NOT NULL DEFAULT 1,
                    is_hard INTEGER NOT NULL DEFAULT 0,
                    source TEXT,
                    created_at TEXT NOT NULL,
                    UNIQUE(vacancy_id, kind, normalized_key)
                )
                "#,
            ),
            (
                "profiles",
                r#"
                CREATE TABLE IF NOT EXISTS profiles (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT,
                    resume_text TEXT NOT NULL,
                    skills_text TEXT,
                    location TEXT,
                    remote_ok INTEGER NOT NULL DEFAULT 1,
                    relocation_ok INTEGER NOT NULL DEFAULT 0,
                    salary_min INTEGER,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "profile_experiences",
                r#"
                CREATE TABLE IF NOT EXISTS profile_experiences (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    profile_id INTEGER NOT NULL
                        REFERENCES profiles(id) ON DELETE CASCADE,
                    company_name TEXT NOT NULL,
                    position_title TEXT NOT NULL,
                    location TEXT,
                    start_date TEXT NOT NULL,
                    end_date TEXT,
                    is_current INTEGER NOT NULL DEFAULT 0,
                    responsibilities_text TEXT NOT NULL,
                    achievements_text TEXT NOT NULL,
                    tech_stack_text TEXT,
                    employment_type TEXT,
                    created_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "profile_projects",
                r#"
                CREATE TABLE IF NOT EXISTS profile_projects (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    profile_id INTEGER NOT NULL
                        REFERENCES profiles(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    role TEXT,
                    description_text TEXT NOT NULL,
                    start_date TEXT,
                    end_date TEXT,
                    tech_stack_text TEXT,
                    url TEXT,
                    created_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "profile_achievements",
                r#"
                CREATE TABLE IF NOT EXISTS profile_achievements (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    profile_id INTEGER NOT NULL
                        REFERENCES profiles(id) ON DELETE CASCADE,
                    title TEXT NOT NULL,
                    description_text TEXT NOT NULL,
                    metric TEXT,
                    achieved_at TEXT,
                    related_experience_id INTEGER,
                    related_project_id INTEGER,
                    created_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "profile_education",
                r#"
                CREATE TABLE IF NOT EXISTS profile_education (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    profile_id INTEGER NOT NULL
                        REFERENCES profiles(id) ON DELETE CASCADE,
                    institution TEXT NOT NULL,
                    degree_level TEXT NOT NULL,
                    field_of_study TEXT NOT NULL,
                    start_year INTEGER,
                    end_year INTEGER,
                    description_text TEXT,
                    gpa REAL,
                    created_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "profile_certificates",
                r#"
                CREATE TABLE IF NOT EXISTS profile_certificates (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    profile_id INTEGER NOT NULL
                        REFERENCES profiles(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    issuer TEXT NOT NULL,
                    issued_at TEXT,
                    expires_at TEXT,
                    url TEXT,
                    created_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "profile_skills",
                r#"
                CREATE TABLE IF NOT EXISTS profile_skills (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    profile_id INTEGER NOT NULL
                        REFERENCES profiles(id) ON DELETE CASCADE,
                    name_raw TEXT NOT NULL,
                    normalized_key TEXT,
                    category TEXT NOT NULL,
                    level TEXT NOT NULL,
                    years REAL,
                    last_used_year INTEGER,
                    is_primary INTEGER NOT NULL DEFAULT 0,
                    evidence_text TEXT,
                    created_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "profile_languages",
                r#"
                CREATE TABLE IF NOT EXISTS profile_languages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    profile_id INTEGER NOT NULL
                        REFERENCES profiles(id) ON DELETE CASCADE,
                    language TEXT NOT NULL,
                    level TEXT NOT NULL,
                    created_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "profile_links",
                r#"
                CREATE TABLE IF NOT EXISTS profile_links (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    profile_id INTEGER NOT NULL
                        REFERENCES profiles(id) ON DELETE CASCADE,
                    link_type TEXT NOT NULL,
                    url TEXT NOT NULL,
                    label TEXT,
                    created_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "resume_versions",
                r#"
                CREATE TABLE IF NOT EXISTS resume_versions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    profile_id INTEGER NOT NULL
                        REFERENCES profiles(id) ON DELETE CASCADE,
                    vacancy_id INTEGER
                        REFERENCES vacancies(id) ON DELETE SET NULL,
                    title TEXT,
                    content_text TEXT NOT NULL,
                    format TEXT NOT NULL DEFAULT 'plain',
                    source TEXT NOT NULL DEFAULT 'user',
                    status TEXT NOT NULL DEFAULT 'draft',
                    created_at TEXT NOT NULL,
                    approved_at TEXT
                )
                "#,
            ),
            (
                "cover_letter_versions",
                r#"
                CREATE TABLE IF NOT EXISTS cover_letter_versions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    profile_id INTEGER NOT NULL
                        REFERENCES profiles(id) ON DELETE CASCADE,
                    vacancy_id INTEGER
                        REFERENCES vacancies(id) ON DELETE SET NULL,
                    title TEXT,
                    subject TEXT,
                    content_text TEXT NOT NULL,
                    source TEXT NOT NULL DEFAULT 'user',
                    status TEXT NOT NULL DEFAULT 'draft',
                    created_at TEXT NOT NULL,
                    approved_at TEXT
                )
                "#,
            ),
            (
                "resume_evidence",
                r#"
                CREATE TABLE IF NOT EXISTS resume_evidence (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    profile_id INTEGER NOT NULL
                        REFERENCES profiles(id) ON DELETE CASCADE,
                    vacancy_id INTEGER NOT NULL
                        REFERENCES vacancies(id) ON DELETE CASCADE,
                    requirement_id INTEGER
                        REFERENCES vacancy_requirements(id) ON DELETE SET NULL,
                    evidence_text TEXT NOT NULL,
                    evidence_type TEXT NOT NULL,
                    confidence REAL NOT NULL,
                    created_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "vacancy_scores",
                r#"
                CREATE TABLE IF NOT EXISTS vacancy_scores (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    profile_id INTEGER NOT NULL
                        REFERENCES profiles(id) ON DELETE CASCADE,
                    vacancy_id INTEGER NOT NULL
                        REFERENCES vacancies(id) ON DELETE CASCADE,
                    layer1_score REAL NOT NULL,
                    layer2_score REAL NOT NULL,
                    final_score REAL NOT NULL,
                    verdict TEXT NOT NULL,
                    explanation TEXT NOT NULL,
                    computed_at TEXT NOT NULL,
                    UNIQUE(profile_id, vacancy_id)
                )
                "#,
            ),
            (
                "vacancy_embeddings",
                r#"
                CREATE TABLE IF NOT EXISTS vacancy_embeddings (
                    vacancy_id INTEGER PRIMARY KEY
                        REFERENCES vacancies(id) ON DELETE CASCADE,
                    embedding BLOB NOT NULL,
                    model_name TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "profile_embeddings",
                r#"
                CREATE TABLE IF NOT EXISTS profile_embeddings (
                    profile_id INTEGER PRIMARY KEY
                        REFERENCES profiles(id) ON DELETE CASCADE,
                    embedding BLOB NOT NULL,
                    model_name TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "saved_searches",
                r#"
                CREATE TABLE IF NOT EXISTS saved_searches (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    text TEXT NOT NULL,
                    area TEXT,
                    schedule TEXT,
                    experience TEXT,
                    salary_from INTEGER,
                    salary_to INTEGER,
                    currency TEXT,
                    filters_json TEXT NOT NULL DEFAULT '{}',
                    per_page INTEGER NOT NULL DEFAULT 20,
                    pages_limit INTEGER NOT NULL DEFAULT 3,
                    cursor_page INTEGER NOT NULL DEFAULT 0,
                    is_active INTEGER NOT NULL DEFAULT 1,
                    last_sync_at TEXT,
                    last_seen_published_at TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "tasks",
                r#"
                CREATE TABLE IF NOT EXISTS tasks (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    payload TEXT NOT NULL,
                    state TEXT NOT NULL DEFAULT 'pending',
                    attempts INTEGER NOT NULL DEFAULT 0,
                    parent_id TEXT,
                    chain_json TEXT NOT NULL DEFAULT '[]',
                    result TEXT,
                    error TEXT,
                    worker_id TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    started_at TEXT,
                    finished_at TEXT
                )
                "#,
            ),
        ];

        for (table, ddl) in statements {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to create {table} table"))?;
        }

        let indexes = [
            "CREATE INDEX IF NOT EXISTS idx_vacancy_requirements_vacancy ON vacancy_requirements(vacancy_id)",
            "CREATE INDEX IF NOT EXISTS idx_resume_evidence_pair ON resume_evidence(profile_id, vacancy_id)",
            "CREATE INDEX IF NOT EXISTS idx_vacancy_scores_profile ON vacancy_scores(profile_id, final_score)",
            "CREATE INDEX IF NOT EXISTS idx_tasks_state ON tasks(state, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_saved_searches_active ON saved_searches(is_active)",
        ];
        for ddl in indexes {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .context("Failed to create index")?;
        }

        Ok(())
    }
}

/// Encode an f32 vector as a little-endian BLOB.
pub fn vec_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Decode a little-endian BLOB back into an f32 vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_in_memory_creates_schema() {
        let db = Database::connect_in_memory().await.unwrap();
        // Setup is idempotent.
        db.setup().await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vacancies")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn test_connect_with_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobmatch.db");
        let db = Database::connect(path.to_str().unwrap()).await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM profiles")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 0);
        assert!(path.exists());
    }

    #[test]
    fn test_blob_round_trip() {
        let vector = vec![0.25f32, -1.5, 3.75, 0.0];
        let blob = vec_to_blob(&vector);
        assert_eq!(blob.len(), 16);
        assert_eq!(blob_to_vec(&blob), vector);
    }

    #[test]
    fn test_blob_empty() {
        assert!(blob_to_vec(&vec_to_blob(&[])).is_empty());
    }
}
