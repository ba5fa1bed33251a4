//! Task implementations
//!
//! Each handler is a pure function of its payload plus the persistent store.
//! Handlers return a JSON result payload that lands in the result store.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use super::queue::TaskQueue;
use super::types::{TaskKind, TaskRequest};
use crate::config::AppConfig;
use crate::embeddings::{
    build_profile_document, build_vacancy_document, global_provider, EmbeddingProvider,
};
use crate::errors::{EngineError, Result};
use crate::hh::HhClient;
use crate::ingest::{ImportFilters, ImportReport, IngestService};
use crate::matching::MatchingEngine;
use crate::store::{Database, NewResumeVersion, NewSkill};
use crate::text::normalize_skill;
use crate::vector_store::{SqliteVectorStore, VectorStore};

/// Batch size for embedding rebuilds.
const REBUILD_CHUNK_SIZE: usize = 32;

/// Everything a handler needs. One context per worker; each task body opens
/// its own HTTP client where it crawls.
#[derive(Clone)]
pub struct TaskContext {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub queue: TaskQueue,
}

impl TaskContext {
    pub fn new(db: Database, config: Arc<AppConfig>, queue: TaskQueue) -> Self {
        Self { db, config, queue }
    }

    fn provider(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        global_provider(&self.config.embedding)
    }

    fn ingest_service(&self) -> Result<IngestService> {
        let client = HhClient::new(&self.config.hh)?;
        Ok(IngestService::new(self.db.clone(), client).with_queue(self.queue.clone()))
    }

    fn matching_engine(&self) -> MatchingEngine {
        MatchingEngine::new(self.db.clone(), self.config.embedding.dimension)
    }
}

/// Run one task to completion and produce its result payload.
pub async fn run_task(ctx: &TaskContext, kind: &TaskKind) -> Result<serde_json::Value> {
    match kind {
        TaskKind::ImportVacancies { filters } => import_vacancies(ctx, filters).await,
        TaskKind::SyncSavedSearch { saved_search_id } => {
            sync_saved_search(ctx, *saved_search_id).await
        }
        TaskKind::SyncAllSavedSearches => sync_all_saved_searches(ctx).await,
        TaskKind::BuildVacancyEmbedding { vacancy_id } => {
            build_vacancy_embedding(ctx, *vacancy_id).await
        }
        TaskKind::BuildProfileEmbedding { profile_id } => {
            build_profile_embedding(ctx, *profile_id).await
        }
        TaskKind::RebuildEmbeddings => rebuild_embeddings(ctx).await,
        TaskKind::ComputeRecommendations { profile_id, limit } => {
            compute_recommendations(ctx, *profile_id, *limit).await
        }
        TaskKind::BackfillProfile { profile_id } => backfill_profile(ctx, *profile_id).await,
        TaskKind::BackfillParsed {
            limit,
            only_missing,
        } => backfill_parsed(ctx, *limit, *only_missing).await,
    }
}

fn report_json(report: &ImportReport) -> serde_json::Value {
    json!({
        "pages_processed": report.pages_processed,
        "vacancies_seen": report.vacancies_seen,
        "saved": report.saved,
        "updated": report.updated,
        "errors": report.errors,
        "stop_by_cutoff": report.stop_by_cutoff,
    })
}

async fn import_vacancies(ctx: &TaskContext, filters: &ImportFilters) -> Result<serde_json::Value> {
    let service = ctx.ingest_service()?;
    let report = service.import(filters, None, 0).await?;
    Ok(report_json(&report))
}

async fn sync_saved_search(ctx: &TaskContext, saved_search_id: i64) -> Result<serde_json::Value> {
    let search = ctx.db.require_saved_search(saved_search_id).await?;
    if !search.is_active {
        return Ok(json!({
            "saved_search_id": saved_search_id,
            "skipped": true,
            "reason": "inactive",
        }));
    }

    let service = ctx.ingest_service()?;
    let report = service.sync_saved_search(&search).await?;

    let mut payload = report_json(&report);
    payload["saved_search_id"] = json!(saved_search_id);
    Ok(payload)
}

async fn sync_all_saved_searches(ctx: &TaskContext) -> Result<serde_json::Value> {
    let ids = ctx.db.list_active_saved_search_ids().await?;
    for saved_search_id in &ids {
        ctx.queue
            .enqueue(TaskRequest::new(TaskKind::SyncSavedSearch {
                saved_search_id: *saved_search_id,
            }))
            .await?;
    }

    info!(active_searches = ids.len(), "enqueued saved search sync tasks");
    Ok(json!({ "enqueued": ids.len() }))
}

async fn build_vacancy_embedding(ctx: &TaskContext, vacancy_id: i64) -> Result<serde_json::Value> {
    let Some(vacancy) = ctx.db.get_vacancy(vacancy_id).await? else {
        warn!(vacancy_id, "vacancy not found for embedding");
        return Ok(json!({
            "status": "skipped",
            "reason": "vacancy_not_found",
            "vacancy_id": vacancy_id,
        }));
    };

    let plain_text = ctx.db.get_parsed_plain_text(vacancy_id).await?;
    let key_skills = ctx.db.list_skill_raw_texts(vacancy_id).await?;
    let document = build_vacancy_document(
        &vacancy.title,
        vacancy.description.as_deref(),
        plain_text.as_deref(),
        &key_skills,
    );

    let provider = ctx.provider()?;
    let vector = provider
        .embed(&document)
        .await
        .map_err(|e| EngineError::Embedding(e.to_string()))?;

    let store = SqliteVectorStore::for_vacancies(ctx.db.clone(), ctx.config.embedding.dimension);
    store
        .upsert(vacancy_id, &vector, provider.name())
        .await
        .map_err(|e| EngineError::Embedding(e.to_string()))?;

    Ok(json!({ "status": "ok", "vacancy_id": vacancy_id }))
}

async fn build_profile_embedding(ctx: &TaskContext, profile_id: i64) -> Result<serde_json::Value> {
    let Some(profile) = ctx.db.get_profile(profile_id).await? else {
        warn!(profile_id, "profile not found for embedding");
        return Ok(json!({
            "status": "skipped",
            "reason": "profile_not_found",
            "profile_id": profile_id,
        }));
    };

    let document = build_profile_document(
        profile.title.as_deref(),
        &profile.resume_text,
        profile.skills_text.as_deref(),
    );

    let provider = ctx.provider()?;
    let vector = provider
        .embed(&document)
        .await
        .map_err(|e| EngineError::Embedding(e.to_string()))?;

    let store = SqliteVectorStore::for_profiles(ctx.db.clone(), ctx.config.embedding.dimension);
    store
        .upsert(profile_id, &vector, provider.name())
        .await
        .map_err(|e| EngineError::Embedding(e.to_string()))?;

    Ok(json!({ "status": "ok", "profile_id": profile_id }))
}

/// Delete-then-insert rebuild of every embedding, in chunks of 32.
async fn rebuild_embeddings(ctx: &TaskContext) -> Result<serde_json::Value> {
    let provider = ctx.provider()?;
    let dimension = ctx.config.embedding.dimension;

    let vacancy_ids = ctx.db.list_vacancy_ids().await?;
    let vacancy_store = SqliteVectorStore::for_vacancies(ctx.db.clone(), dimension);
    let mut vacancies_rebuilt = 0usize;

    for chunk in vacancy_ids.chunks(REBUILD_CHUNK_SIZE) {
        let mut documents = Vec::with_capacity(chunk.len());
        for vacancy_id in chunk {
            let vacancy = ctx.db.require_vacancy(*vacancy_id).await?;
            let plain_text = ctx.db.get_parsed_plain_text(*vacancy_id).await?;
            let key_skills = ctx.db.list_skill_raw_texts(*vacancy_id).await?;
            documents.push(build_vacancy_document(
                &vacancy.title,
                vacancy.description.as_deref(),
                plain_text.as_deref(),
                &key_skills,
            ));
        }

        vacancy_store
            .delete(chunk)
            .await
            .map_err(|e| EngineError::Embedding(e.to_string()))?;
        let vectors = provider
            .embed_batch(documents)
            .await
            .map_err(|e| EngineError::Embedding(e.to_string()))?;
        for (vacancy_id, vector) in chunk.iter().zip(vectors) {
            vacancy_store
                .upsert(*vacancy_id, &vector, provider.name())
                .await
                .map_err(|e| EngineError::Embedding(e.to_string()))?;
            vacancies_rebuilt += 1;
        }
    }

    let profiles = ctx.db.list_profiles().await?;
    let profile_store = SqliteVectorStore::for_profiles(ctx.db.clone(), dimension);
    let mut profiles_rebuilt = 0usize;

    for chunk in profiles.chunks(REBUILD_CHUNK_SIZE) {
        let ids: Vec<i64> = chunk.iter().map(|p| p.id).collect();
        let documents: Vec<String> = chunk
            .iter()
            .map(|profile| {
                build_profile_document(
                    profile.title.as_deref(),
                    &profile.resume_text,
                    profile.skills_text.as_deref(),
                )
            })
            .collect();

        profile_store
            .delete(&ids)
            .await
            .map_err(|e| EngineError::Embedding(e.to_string()))?;
        let vectors = provider
            .embed_batch(documents)
            .await
            .map_err(|e| EngineError::Embedding(e.to_string()))?;
        for (profile_id, vector) in ids.iter().zip(vectors) {
            profile_store
                .upsert(*profile_id, &vector, provider.name())
                .await
                .map_err(|e| EngineError::Embedding(e.to_string()))?;
            profiles_rebuilt += 1;
        }
    }

    Ok(json!({
        "status": "ok",
        "vacancies": vacancies_rebuilt,
        "profiles": profiles_rebuilt,
        "model_name": provider.name(),
    }))
}

async fn compute_recommendations(
    ctx: &TaskContext,
    profile_id: i64,
    limit: usize,
) -> Result<serde_json::Value> {
    let engine = ctx.matching_engine();
    match engine.compute_recommendations(profile_id, limit).await {
        Ok(scores) => Ok(json!({
            "profile_id": profile_id,
            "computed": scores.len(),
            "top": scores
                .iter()
                .take(5)
                .map(|score| json!({
                    "vacancy_id": score.vacancy_id,
                    "final_score": score.final_score,
                    "verdict": score.verdict,
                }))
                .collect::<Vec<_>>(),
        })),
        Err(err) if err.is_not_found() => {
            // Missing profile or embedding is a skip, not a task failure.
            warn!(profile_id, limit, reason = %err, "recommendations task skipped");
            Ok(json!({
                "profile_id": profile_id,
                "computed": 0,
                "top": [],
            }))
        }
        Err(err) => Err(err),
    }
}

async fn backfill_profile(ctx: &TaskContext, profile_id: i64) -> Result<serde_json::Value> {
    let Some(profile) = ctx.db.get_profile(profile_id).await? else {
        return Ok(json!({ "status": "not_found", "profile_id": profile_id }));
    };

    let mut created_resume_version = false;
    if !ctx.db.has_resume_versions(profile_id).await? {
        ctx.db
            .create_resume_version(
                profile_id,
                &NewResumeVersion {
                    vacancy_id: None,
                    title: None,
                    content_text: profile.resume_text.clone(),
                    format: None,
                    source: Some("legacy_import".to_string()),
                    status: Some("approved".to_string()),
                },
            )
            .await?;
        created_resume_version = true;
    }

    let mut created_skills = 0usize;
    let skills_text = profile.skills_text.clone().unwrap_or_default();
    let has_skills = !ctx.db.list_skills(profile_id).await?.is_empty();
    if !skills_text.trim().is_empty() && !has_skills {
        let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
        for raw_skill in skills_text.split(&[';', ','][..]) {
            let raw_skill = raw_skill.trim();
            if raw_skill.is_empty() {
                continue;
            }
            let normalized_key = normalize_skill(raw_skill);
            if normalized_key.is_empty() || !seen.insert(normalized_key.clone()) {
                continue;
            }

            ctx.db
                .create_skill(
                    profile_id,
                    &NewSkill {
                        name_raw: raw_skill.to_string(),
                        normalized_key: Some(normalized_key),
                        category: "technical".to_string(),
                        level: "unspecified".to_string(),
                        years: None,
                        last_used_year: None,
                        is_primary: false,
                        evidence_text: None,
                    },
                )
                .await?;
            created_skills += 1;
        }
    }

    Ok(json!({
        "status": "ok",
        "profile_id": profile_id,
        "created_resume_version": created_resume_version,
        "created_skills": created_skills,
    }))
}

async fn backfill_parsed(
    ctx: &TaskContext,
    limit: Option<i64>,
    only_missing: bool,
) -> Result<serde_json::Value> {
    let service = ctx.ingest_service()?;
    let vacancy_ids = service.vacancy_ids_needing_reparse(only_missing, limit).await?;

    let mut processed = 0usize;
    let mut errors = 0usize;
    let mut enqueued_embeddings = 0usize;

    for vacancy_id in &vacancy_ids {
        match service.reprocess_vacancy(*vacancy_id).await {
            Ok(()) => {
                processed += 1;
                ctx.queue
                    .enqueue(TaskRequest::new(TaskKind::BuildVacancyEmbedding {
                        vacancy_id: *vacancy_id,
                    }))
                    .await?;
                enqueued_embeddings += 1;
            }
            Err(err) => {
                errors += 1;
                warn!(vacancy_id, error = %err, "failed to re-parse vacancy");
            }
        }
    }

    Ok(json!({
        "status": "ok",
        "targeted": vacancy_ids.len(),
        "processed": processed,
        "errors": errors,
        "enqueued_embeddings": enqueued_embeddings,
        "only_missing": only_missing,
        "version": crate::parser::PARSER_VERSION,
    }))
}
