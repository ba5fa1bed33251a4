//! Ingestion service
//!
//! Idempotently imports vacancies from the job board: page by page, item by
//! item, each item cleaned, parsed, extracted and UPSERTed in its own
//! transaction. A failing item is rolled back and counted, never aborting
//! the page. Saved-search syncs resume from a stored cursor and stop early
//! at the publish-date cutoff.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::Result;
use crate::hh::{parse_published_at, HhClient, HhVacancy, SearchQuery};
use crate::parser::{parse_description, PARSER_VERSION};
use crate::requirements::{
    extract_constraints, extract_from_sections, extract_from_text, merge_requirements,
    ExtractedRequirement, RequirementKind,
};
use crate::store::{
    replace_requirements, upsert_parsed, upsert_vacancy, Database, NewVacancy, SavedSearch,
};
use crate::tasks::{TaskKind, TaskQueue, TaskRequest};
use crate::text::normalize_skill;

/// Source tag for board-ingested vacancies.
pub const HH_SOURCE: &str = "hh";

/// Search parameters of one import run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportFilters {
    pub text: String,
    pub area: Option<String>,
    pub schedule: Option<String>,
    pub experience: Option<String>,
    pub salary_from: Option<i64>,
    pub salary_to: Option<i64>,
    pub currency: Option<String>,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_pages_limit")]
    pub pages_limit: u32,
    #[serde(default = "default_include_details")]
    pub include_details: bool,
    #[serde(default)]
    pub extra_params: serde_json::Map<String, serde_json::Value>,
}

fn default_per_page() -> u32 {
    20
}

fn default_pages_limit() -> u32 {
    3
}

fn default_include_details() -> bool {
    true
}

impl Default for ImportFilters {
    fn default() -> Self {
        Self {
            text: String::new(),
            area: None,
            schedule: None,
            experience: None,
            salary_from: None,
            salary_to: None,
            currency: None,
            per_page: default_per_page(),
            pages_limit: default_pages_limit(),
            include_details: default_include_details(),
            extra_params: serde_json::Map::new(),
        }
    }
}

impl ImportFilters {
    /// Filters equivalent to a saved search.
    pub fn from_saved_search(search: &SavedSearch) -> Self {
        Self {
            text: search.text.clone(),
            area: search.area.clone(),
            schedule: search.schedule.clone(),
            experience: search.experience.clone(),
            salary_from: search.salary_from,
            salary_to: search.salary_to,
            currency: search.currency.clone(),
            per_page: search.per_page.max(1) as u32,
            pages_limit: search.pages_limit.max(1) as u32,
            include_details: true,
            extra_params: search.filters_json.0.clone(),
        }
    }

    fn to_query(&self, page: u32) -> SearchQuery {
        SearchQuery {
            text: self.text.clone(),
            area: self.area.clone(),
            schedule: self.schedule.clone(),
            experience: self.experience.clone(),
            salary: self.salary_from,
            currency: self.currency.clone(),
            page,
            per_page: self.per_page,
            clusters: false,
            extra: self.extra_params.clone(),
        }
    }
}

/// Outcome of one import run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportReport {
    pub pages_processed: u32,
    pub vacancies_seen: u64,
    pub saved: u64,
    pub updated: u64,
    pub errors: u64,
    pub stop_by_cutoff: bool,
    /// Highest publish date among ingested board vacancies, the next
    /// watermark candidate.
    pub max_published_at: Option<DateTime<Utc>>,
    /// Surrogate ids of successfully ingested vacancies.
    pub vacancy_ids: Vec<i64>,
}

/// Imports vacancies from the board into the entity store.
pub struct IngestService {
    db: Database,
    client: HhClient,
    queue: Option<TaskQueue>,
}

impl IngestService {
    pub fn new(db: Database, client: HhClient) -> Self {
        Self {
            db,
            client,
            queue: None,
        }
    }

    /// Attach a task queue so successful items schedule embedding builds.
    pub fn with_queue(mut self, queue: TaskQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Import pages `[start_page, start_page + pages_limit)` of a search.
    ///
    /// Items published at or before `cutoff` are skipped; the first skip
    /// marks `stop_by_cutoff` and the run ends after the current page.
    pub async fn import(
        &self,
        filters: &ImportFilters,
        cutoff: Option<DateTime<Utc>>,
        start_page: u32,
    ) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        let mut total_pages_from_api: Option<u32> = None;

        info!(
            text = %filters.text,
            area = ?filters.area,
            per_page = filters.per_page,
            pages_limit = filters.pages_limit,
            start_page,
            "import started"
        );

        for page_offset in 0..filters.pages_limit {
            let page = start_page + page_offset;
            if page_offset > 0 {
                self.client.polite_delay().await;
            }

            let payload = self.client.search_vacancies(&filters.to_query(page)).await?;
            if payload.pages.is_some() {
                total_pages_from_api = payload.pages;
            }

            info!(
                page,
                total_pages = ?total_pages_from_api,
                items = payload.items.len(),
                found = ?payload.found,
                "page fetched"
            );

            for item in payload.items {
                report.vacancies_seen += 1;

                let published_at = item
                    .published_at
                    .as_deref()
                    .and_then(parse_published_at);
                if let (Some(cutoff), Some(published_at)) = (cutoff, published_at) {
                    if published_at <= cutoff {
                        report.stop_by_cutoff = true;
                        continue;
                    }
                }

                match self.ingest_item(item, filters.include_details).await {
                    Ok((vacancy_id, inserted)) => {
                        if inserted {
                            report.saved += 1;
                        } else {
                            report.updated += 1;
                        }
                        report.vacancy_ids.push(vacancy_id);
                        if let Some(published_at) = published_at {
                            report.max_published_at = Some(
                                report
                                    .max_published_at
                                    .map_or(published_at, |current| current.max(published_at)),
                            );
                        }
                        self.schedule_embedding(vacancy_id).await;
                    }
                    Err(err) => {
                        report.errors += 1;
                        warn!(error = %err, "item ingest failed, skipping");
                    }
                }
            }

            report.pages_processed += 1;

            if report.stop_by_cutoff {
                break;
            }
            if total_pages_from_api.is_some_and(|total| page + 1 >= total) {
                break;
            }
        }

        info!(
            pages_processed = report.pages_processed,
            seen = report.vacancies_seen,
            saved = report.saved,
            updated = report.updated,
            errors = report.errors,
            stop_by_cutoff = report.stop_by_cutoff,
            "import finished"
        );
        Ok(report)
    }

    /// Sync one saved search: import from its cursor with its watermark as
    /// the cutoff, then advance the markers.
    pub async fn sync_saved_search(&self, search: &SavedSearch) -> Result<ImportReport> {
        let cutoff = search.last_seen_published_at.or(search.last_sync_at);
        let filters = ImportFilters::from_saved_search(search);

        let report = self
            .import(&filters, cutoff, search.cursor_page.max(0) as u32)
            .await?;

        let cursor_page = if report.stop_by_cutoff {
            0
        } else {
            search.cursor_page + i64::from(report.pages_processed)
        };

        self.db
            .update_sync_markers(search.id, Utc::now(), report.max_published_at, cursor_page)
            .await?;

        Ok(report)
    }

    /// Clean, parse, extract and UPSERT one item in a single transaction.
    async fn ingest_item(&self, mut item: HhVacancy, include_details: bool) -> Result<(i64, bool)> {
        if include_details {
            let details = self.client.vacancy_details(&item.id).await?;
            item.merge_details(details);
        }

        let values = vacancy_values(&item);
        let parsed = parse_description(values.description.as_deref().unwrap_or_default());
        let requirements = requirements_for_item(&item, &parsed.sections, &parsed.plain_text);

        let mut tx = self.db.pool().begin().await?;
        let (vacancy_id, inserted) = upsert_vacancy(&mut tx, &values).await?;
        upsert_parsed(&mut tx, vacancy_id, &parsed).await?;
        replace_requirements(&mut tx, vacancy_id, &requirements).await?;
        tx.commit().await?;

        Ok((vacancy_id, inserted))
    }

    /// Re-parse a stored vacancy and regenerate its requirements. Used for
    /// manual vacancies and for parser-version backfills.
    pub async fn reprocess_vacancy(&self, vacancy_id: i64) -> Result<()> {
        reprocess_vacancy(&self.db, vacancy_id).await
    }

    /// Vacancies whose parse is missing or predates [`PARSER_VERSION`].
    pub async fn vacancy_ids_needing_reparse(
        &self,
        only_missing: bool,
        limit: Option<i64>,
    ) -> Result<Vec<i64>> {
        self.db
            .list_vacancy_ids_for_reparse(HH_SOURCE, PARSER_VERSION, only_missing, limit)
            .await
    }

    async fn schedule_embedding(&self, vacancy_id: i64) {
        if let Some(queue) = &self.queue {
            if let Err(err) = queue
                .enqueue(TaskRequest::new(TaskKind::BuildVacancyEmbedding { vacancy_id }))
                .await
            {
                warn!(vacancy_id, error = %err, "failed to enqueue embedding build");
            }
        }
    }
}

/// Re-parse one stored vacancy's description and replace its generated
/// requirements, in a single transaction. Falls back to plain-text
/// extraction when no section yields a requirement.
pub async fn reprocess_vacancy(db: &Database, vacancy_id: i64) -> Result<()> {
    let vacancy = db.require_vacancy(vacancy_id).await?;
    let parsed = parse_description(vacancy.description.as_deref().unwrap_or_default());

    let mut requirements = extract_from_sections(&parsed.sections);
    if requirements.is_empty() {
        requirements = extract_from_text(&parsed.plain_text);
    }

    let mut tx = db.pool().begin().await?;
    upsert_parsed(&mut tx, vacancy_id, &parsed).await?;
    replace_requirements(&mut tx, vacancy_id, &requirements).await?;
    tx.commit().await?;
    Ok(())
}

fn vacancy_values(item: &HhVacancy) -> NewVacancy {
    let salary = item.salary.clone().unwrap_or_default();
    NewVacancy {
        source: HH_SOURCE.to_string(),
        external_id: item.id.clone(),
        title: item.name.clone().unwrap_or_default(),
        company_name: item.employer.as_ref().and_then(|e| e.name.clone()),
        location: item.area.as_ref().and_then(|a| a.name.clone()),
        salary_from: salary.from,
        salary_to: salary.to,
        currency: salary.currency,
        description: item.effective_description(),
        url: item.alternate_url.clone(),
        published_at: item.published_at.as_deref().and_then(parse_published_at),
        status: Some("open".to_string()),
    }
}

/// Skill requirements from the parsed sections, the item's key skills and
/// its structured fields, deduplicated with must-beats-nice.
fn requirements_for_item(
    item: &HhVacancy,
    sections: &crate::parser::ParsedSections,
    plain_text: &str,
) -> Vec<ExtractedRequirement> {
    let extracted = extract_from_sections(sections);

    let key_skills: Vec<ExtractedRequirement> = item
        .key_skill_names()
        .into_iter()
        .filter(|name| !name.trim().is_empty())
        .map(|name| ExtractedRequirement {
            kind: RequirementKind::Skill,
            normalized_key: normalize_skill(&name),
            raw_text: name,
            is_hard: false,
            weight: 1,
            source: "key_skills".to_string(),
        })
        .collect();

    let constraints = extract_constraints(
        &[
            ("experience", item.experience.as_ref().and_then(|v| v.name.as_deref())),
            ("schedule", item.schedule.as_ref().and_then(|v| v.name.as_deref())),
            ("employment", item.employment.as_ref().and_then(|v| v.name.as_deref())),
            ("area", item.area.as_ref().and_then(|v| v.name.as_deref())),
        ],
        plain_text,
    );

    merge_requirements(vec![extracted, key_skills, constraints])
}
