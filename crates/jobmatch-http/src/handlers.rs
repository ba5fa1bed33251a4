//! API request handlers

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::debug;
use uuid::Uuid;

use jobmatch_engine::ingest::{reprocess_vacancy, ImportFilters};
use jobmatch_engine::store::{
    CoverLetterVersion, NewAchievement, NewCertificate, NewCoverLetterVersion, NewEducation,
    NewExperience, NewLanguage, NewLink, NewProfile, NewProject, NewResumeVersion, NewSavedSearch,
    NewSkill, NewVacancy, Profile, ProfileAchievement, ProfileCertificate, ProfileEducation,
    ProfileExperience, ProfileLanguage, ProfileLink, ProfileProject, ProfileSkill, ProfileUpdate,
    ResumeVersion, SavedSearch, SavedSearchUpdate, Vacancy, VacancyUpdate,
};
use jobmatch_engine::tasks::{TaskKind, TaskRequest, TaskStatus};

use crate::server::AppState;
use crate::types::{
    not_found, reject, unprocessable, ApiError, EvidenceItemDto, HealthResponse, LimitParams,
    RecommendationItem, RecommendationsResponse, Rejection, TailoringResponse, TaskIdResponse,
};

async fn enqueue(state: &AppState, kind: TaskKind) -> Result<TaskIdResponse, Rejection> {
    let task_id = state
        .queue
        .enqueue(TaskRequest::new(kind))
        .await
        .map_err(reject)?;
    Ok(TaskIdResponse {
        task_id: task_id.to_string(),
    })
}

async fn schedule_vacancy_embedding(state: &AppState, vacancy_id: i64) -> Result<(), Rejection> {
    state
        .queue
        .enqueue(TaskRequest::new(TaskKind::BuildVacancyEmbedding { vacancy_id }))
        .await
        .map_err(reject)?;
    Ok(())
}

async fn schedule_profile_embedding(state: &AppState, profile_id: i64) -> Result<(), Rejection> {
    state
        .queue
        .enqueue(TaskRequest::new(TaskKind::BuildProfileEmbedding { profile_id }))
        .await
        .map_err(reject)?;
    Ok(())
}

// --- vacancies -----------------------------------------------------------

/// Create a manual vacancy: extract requirements, schedule an embedding.
pub async fn create_vacancy(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewVacancy>,
) -> Result<(StatusCode, Json<Vacancy>), Rejection> {
    if payload.title.trim().is_empty() {
        return Err(unprocessable("title must not be empty"));
    }

    let vacancy = state.db.create_vacancy(&payload).await.map_err(reject)?;
    if vacancy.description.is_some() {
        reprocess_vacancy(&state.db, vacancy.id).await.map_err(reject)?;
    }
    schedule_vacancy_embedding(&state, vacancy.id).await?;

    Ok((StatusCode::CREATED, Json(vacancy)))
}

pub async fn list_vacancies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Vacancy>>, Rejection> {
    Ok(Json(state.db.list_vacancies().await.map_err(reject)?))
}

pub async fn get_vacancy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vacancy>, Rejection> {
    state
        .db
        .get_vacancy(id)
        .await
        .map_err(reject)?
        .map(Json)
        .ok_or_else(|| not_found("Vacancy"))
}

/// Update a vacancy. Manual sources get their requirements re-extracted;
/// every update schedules a re-embedding.
pub async fn update_vacancy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<VacancyUpdate>,
) -> Result<Json<Vacancy>, Rejection> {
    let vacancy = state.db.update_vacancy(id, &payload).await.map_err(reject)?;
    if vacancy.source != "hh" {
        reprocess_vacancy(&state.db, id).await.map_err(reject)?;
    }
    schedule_vacancy_embedding(&state, id).await?;
    Ok(Json(vacancy))
}

pub async fn delete_vacancy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, Rejection> {
    if state.db.delete_vacancy(id).await.map_err(reject)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Vacancy"))
    }
}

// --- profiles ------------------------------------------------------------

pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewProfile>,
) -> Result<(StatusCode, Json<Profile>), Rejection> {
    if payload.resume_text.trim().is_empty() {
        return Err(unprocessable("resume_text must not be empty"));
    }

    let profile = state.db.create_profile(&payload).await.map_err(reject)?;
    schedule_profile_embedding(&state, profile.id).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn list_profiles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Profile>>, Rejection> {
    Ok(Json(state.db.list_profiles().await.map_err(reject)?))
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Profile>, Rejection> {
    state
        .db
        .get_profile(id)
        .await
        .map_err(reject)?
        .map(Json)
        .ok_or_else(|| not_found("Profile"))
}

/// Update a profile; the embedding is recomputed afterwards.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<Profile>, Rejection> {
    let profile = state.db.update_profile(id, &payload).await.map_err(reject)?;
    schedule_profile_embedding(&state, id).await?;
    Ok(Json(profile))
}

pub async fn delete_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, Rejection> {
    if state.db.delete_profile(id).await.map_err(reject)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Profile"))
    }
}

// --- profile sub-resources ----------------------------------------------

macro_rules! sub_resource_handlers {
    ($create:ident, $list:ident, $delete:ident,
     $payload:ty, $row:ty,
     $db_create:ident, $db_list:ident, $db_delete:ident, $resource:literal) => {
        pub async fn $create(
            State(state): State<Arc<AppState>>,
            Path(profile_id): Path<i64>,
            Json(payload): Json<$payload>,
        ) -> Result<(StatusCode, Json<$row>), Rejection> {
            let row = state
                .db
                .$db_create(profile_id, &payload)
                .await
                .map_err(reject)?;
            Ok((StatusCode::CREATED, Json(row)))
        }

        pub async fn $list(
            State(state): State<Arc<AppState>>,
            Path(profile_id): Path<i64>,
        ) -> Result<Json<Vec<$row>>, Rejection> {
            state.db.require_profile(profile_id).await.map_err(reject)?;
            Ok(Json(state.db.$db_list(profile_id).await.map_err(reject)?))
        }

        pub async fn $delete(
            State(state): State<Arc<AppState>>,
            Path((profile_id, item_id)): Path<(i64, i64)>,
        ) -> Result<StatusCode, Rejection> {
            if state
                .db
                .$db_delete(profile_id, item_id)
                .await
                .map_err(reject)?
            {
                Ok(StatusCode::NO_CONTENT)
            } else {
                Err(not_found($resource))
            }
        }
    };
}

sub_resource_handlers!(
    create_experience, list_experiences, delete_experience,
    NewExperience, ProfileExperience,
    create_experience, list_experiences, delete_experience, "Experience"
);
sub_resource_handlers!(
    create_project, list_projects, delete_project,
    NewProject, ProfileProject,
    create_project, list_projects, delete_project, "Project"
);
sub_resource_handlers!(
    create_achievement, list_achievements, delete_achievement,
    NewAchievement, ProfileAchievement,
    create_achievement, list_achievements, delete_achievement, "Achievement"
);
sub_resource_handlers!(
    create_education, list_education, delete_education,
    NewEducation, ProfileEducation,
    create_education, list_education, delete_education, "Education"
);
sub_resource_handlers!(
    create_certificate, list_certificates, delete_certificate,
    NewCertificate, ProfileCertificate,
    create_certificate, list_certificates, delete_certificate, "Certificate"
);
sub_resource_handlers!(
    create_skill, list_skills, delete_skill,
    NewSkill, ProfileSkill,
    create_skill, list_skills, delete_skill, "Skill"
);
sub_resource_handlers!(
    create_language, list_languages, delete_language,
    NewLanguage, ProfileLanguage,
    create_language, list_languages, delete_language, "Language"
);
sub_resource_handlers!(
    create_link, list_links, delete_link,
    NewLink, ProfileLink,
    create_link, list_links, delete_link, "Link"
);

// --- document versions ---------------------------------------------------

pub async fn create_resume_version(
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<i64>,
    Json(payload): Json<NewResumeVersion>,
) -> Result<(StatusCode, Json<ResumeVersion>), Rejection> {
    let version = state
        .db
        .create_resume_version(profile_id, &payload)
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(version)))
}

pub async fn list_resume_versions(
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<i64>,
) -> Result<Json<Vec<ResumeVersion>>, Rejection> {
    state.db.require_profile(profile_id).await.map_err(reject)?;
    Ok(Json(
        state
            .db
            .list_resume_versions(profile_id)
            .await
            .map_err(reject)?,
    ))
}

pub async fn approve_resume_version(
    State(state): State<Arc<AppState>>,
    Path((profile_id, item_id)): Path<(i64, i64)>,
) -> Result<Json<ResumeVersion>, Rejection> {
    Ok(Json(
        state
            .db
            .approve_resume_version(profile_id, item_id)
            .await
            .map_err(reject)?,
    ))
}

pub async fn create_cover_letter_version(
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<i64>,
    Json(payload): Json<NewCoverLetterVersion>,
) -> Result<(StatusCode, Json<CoverLetterVersion>), Rejection> {
    let version = state
        .db
        .create_cover_letter_version(profile_id, &payload)
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(version)))
}

pub async fn list_cover_letter_versions(
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<i64>,
) -> Result<Json<Vec<CoverLetterVersion>>, Rejection> {
    state.db.require_profile(profile_id).await.map_err(reject)?;
    Ok(Json(
        state
            .db
            .list_cover_letter_versions(profile_id)
            .await
            .map_err(reject)?,
    ))
}

pub async fn approve_cover_letter_version(
    State(state): State<Arc<AppState>>,
    Path((profile_id, item_id)): Path<(i64, i64)>,
) -> Result<Json<CoverLetterVersion>, Rejection> {
    Ok(Json(
        state
            .db
            .approve_cover_letter_version(profile_id, item_id)
            .await
            .map_err(reject)?,
    ))
}

// --- imports and saved searches ------------------------------------------

/// Enqueue a one-off board import.
pub async fn start_import(
    State(state): State<Arc<AppState>>,
    Json(filters): Json<ImportFilters>,
) -> Result<Json<TaskIdResponse>, Rejection> {
    if filters.text.trim().is_empty() {
        return Err(unprocessable("text must not be empty"));
    }
    Ok(Json(
        enqueue(&state, TaskKind::ImportVacancies { filters }).await?,
    ))
}

pub async fn create_saved_search(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewSavedSearch>,
) -> Result<(StatusCode, Json<SavedSearch>), Rejection> {
    if payload.text.trim().is_empty() {
        return Err(unprocessable("text must not be empty"));
    }
    let search = state
        .db
        .create_saved_search(&payload)
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(search)))
}

pub async fn list_saved_searches(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SavedSearch>>, Rejection> {
    Ok(Json(state.db.list_saved_searches().await.map_err(reject)?))
}

pub async fn update_saved_search(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<SavedSearchUpdate>,
) -> Result<Json<SavedSearch>, Rejection> {
    Ok(Json(
        state
            .db
            .update_saved_search(id, &payload)
            .await
            .map_err(reject)?,
    ))
}

pub async fn delete_saved_search(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, Rejection> {
    if state.db.delete_saved_search(id).await.map_err(reject)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("SavedSearch"))
    }
}

/// Enqueue a manual sync of one saved search.
pub async fn sync_saved_search(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<TaskIdResponse>, Rejection> {
    state.db.require_saved_search(id).await.map_err(reject)?;
    Ok(Json(
        enqueue(&state, TaskKind::SyncSavedSearch { saved_search_id: id }).await?,
    ))
}

// --- matching ------------------------------------------------------------

/// Stored top-N recommendations, joined with vacancy fields.
pub async fn get_recommendations(
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<i64>,
    Query(params): Query<LimitParams>,
) -> Result<Json<RecommendationsResponse>, Rejection> {
    state.db.require_profile(profile_id).await.map_err(reject)?;

    let rows = state
        .db
        .list_recommendations(profile_id, params.limit.min(500) as i64)
        .await
        .map_err(reject)?;

    debug!(profile_id, count = rows.len(), "recommendations listed");

    let items = rows
        .into_iter()
        .map(|(score, vacancy)| RecommendationItem {
            id: vacancy.id,
            title: vacancy.title,
            company_name: vacancy.company_name,
            location: vacancy.location,
            url: vacancy.url,
            final_score: score.final_score,
            verdict: score.verdict,
        })
        .collect();

    Ok(Json(RecommendationsResponse { profile_id, items }))
}

/// Enqueue a recommendation recompute.
pub async fn recompute_recommendations(
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<i64>,
    Query(params): Query<LimitParams>,
) -> Result<Json<TaskIdResponse>, Rejection> {
    state.db.require_profile(profile_id).await.map_err(reject)?;
    Ok(Json(
        enqueue(
            &state,
            TaskKind::ComputeRecommendations {
                profile_id,
                limit: params.limit.min(500),
            },
        )
        .await?,
    ))
}

/// Tailoring bundle for a pair, computed on demand when absent.
pub async fn get_tailoring(
    State(state): State<Arc<AppState>>,
    Path((profile_id, vacancy_id)): Path<(i64, i64)>,
) -> Result<Json<TailoringResponse>, Rejection> {
    let bundle = state
        .matching_engine()
        .get_tailoring(profile_id, vacancy_id)
        .await
        .map_err(reject)?;

    Ok(Json(TailoringResponse {
        profile_id,
        vacancy_id,
        explanation: bundle.explanation,
        evidence: bundle
            .evidence
            .into_iter()
            .map(|item| EvidenceItemDto {
                evidence_text: item.evidence_text,
                evidence_type: item.evidence_type,
                confidence: item.confidence,
            })
            .collect(),
    }))
}

// --- tasks ---------------------------------------------------------------

/// Poll the result store for a task.
pub async fn get_task_status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatus>, Rejection> {
    let id = Uuid::parse_str(&task_id).map_err(|_| not_found("Task"))?;
    state
        .queue
        .status(id)
        .await
        .map_err(reject)?
        .map(Json)
        .ok_or_else(|| not_found("Task"))
}

// --- misc ----------------------------------------------------------------

pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub async fn fallback_not_found() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::not_found("Route")),
    )
}
