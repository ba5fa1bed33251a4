//! Two-layer matching engine
//!
//! Layer-1 is weighted keyword coverage over the vacancy's extracted skill
//! requirements; Layer-2 is cosine similarity of precomputed embeddings.
//! Eligibility gates can zero the final score regardless of either layer.
//! Scoring is deterministic for fixed inputs and persists atomically.

mod explanation;
mod tailoring;
mod utils;

pub use explanation::{
    AtsReport, Eligibility, Explanation, FinalReport, ScoreComponents, SemanticReport, Verdict,
};
pub use tailoring::{EvidenceItem, TailoringBundle};
pub use utils::{
    aliases_for_term, contains_token, extract_profile_tokens, find_evidence_snippet,
    has_uncertain_match, unique, SNIPPET_WINDOW,
};

use tracing::{debug, warn};

use crate::errors::{EngineError, Result};
use crate::parser::markers::{not_relocation_patterns, RELOCATION_MARKERS, REMOTE_MARKERS};
use crate::store::{
    Database, EvidenceInput, Profile, ScoreInput, Vacancy, VacancyRequirementRow, VacancyScoreRow,
};
use crate::text::{normalize_skill, strip_html, tokenize};
use crate::vector_store::{cosine_similarity, SqliteVectorStore, VectorStore};

/// Resumes shorter than this trigger a structure suggestion.
const MIN_RESUME_TEXT_LEN: usize = 280;

/// Score weights: semantic, hard coverage, nice coverage.
const WEIGHT_SEMANTIC: f64 = 0.45;
const WEIGHT_HARD: f64 = 0.35;
const WEIGHT_NICE: f64 = 0.20;

/// Cap applied when a vacancy has no skill requirements at all.
const NO_REQUIREMENTS_CAP: f64 = 0.65;

struct Layer1Outcome {
    hard_coverage: f64,
    nice_coverage: f64,
    ats: AtsReport,
    matched: Vec<EvidenceInput>,
}

/// Computes and persists match scores for (profile, vacancy) pairs.
pub struct MatchingEngine {
    db: Database,
    vacancy_vectors: SqliteVectorStore,
    profile_vectors: SqliteVectorStore,
}

impl MatchingEngine {
    pub fn new(db: Database, dimensions: usize) -> Self {
        let vacancy_vectors = SqliteVectorStore::for_vacancies(db.clone(), dimensions);
        let profile_vectors = SqliteVectorStore::for_profiles(db.clone(), dimensions);
        Self {
            db,
            vacancy_vectors,
            profile_vectors,
        }
    }

    /// Compute layer1/layer2/final for a pair, persist the score and its
    /// evidence, and return the stored row.
    pub async fn compute_for_pair(
        &self,
        profile_id: i64,
        vacancy_id: i64,
    ) -> Result<VacancyScoreRow> {
        let profile = self.db.require_profile(profile_id).await?;
        let vacancy = self.db.require_vacancy(vacancy_id).await?;
        let requirements = self.db.list_skill_requirements(vacancy_id).await?;
        let plain_text = self.db.get_parsed_plain_text(vacancy_id).await?;

        let resume_text = profile.resume_text.clone();
        let skills_text = profile.skills_text.clone().unwrap_or_default();
        let profile_text: String = [resume_text.as_str(), skills_text.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n");

        let layer1 = compute_layer1(&requirements, &profile_text, &resume_text, &skills_text);
        let semantic_score = self.compute_layer2(profile_id, vacancy_id).await?;

        let mut reasons_failed: Vec<String> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut explanation_warnings: Vec<String> = Vec::new();

        if requirements.is_empty() {
            explanation_warnings.push("no_skill_requirements_extracted".to_string());
        }

        if !layer1.ats.keywords_missing_must.is_empty() {
            reasons_failed.push("missing_required_skills".to_string());
        }

        if is_relocation_required(&vacancy, plain_text.as_deref()) && !profile.relocation_ok {
            reasons_failed.push("Требуется релокация".to_string());
        }

        if is_location_mismatch(&vacancy, &profile, plain_text.as_deref()) {
            reasons_failed.push("Несовпадение локации".to_string());
        }

        if let Some(salary_min) = profile.salary_min {
            if vacancy.salary_to.is_some_and(|to| to < salary_min) {
                reasons_failed.push("Ожидания по зарплате выше вилки".to_string());
            } else if vacancy.salary_from.is_some_and(|from| from < salary_min) {
                warnings.push("Нижняя граница зарплаты ниже ожиданий".to_string());
            }
        }

        let vacancy_level = detect_vacancy_level(vacancy.title.as_str());
        let profile_level = detect_profile_level(&resume_text);
        let overqualified = vacancy_level == Some("junior") && profile_level == Some("senior");
        if overqualified {
            warnings.push("overqualified".to_string());
        }

        let eligibility_ok = reasons_failed.is_empty();

        let mut penalties: Vec<String> = Vec::new();
        let mut raw_score = WEIGHT_SEMANTIC * semantic_score
            + WEIGHT_HARD * layer1.hard_coverage
            + WEIGHT_NICE * layer1.nice_coverage;

        if overqualified {
            raw_score *= 0.9;
            penalties.push("overqualified".to_string());
        }

        if warnings.iter().any(|warning| warning.contains("зарплаты")) {
            raw_score *= 0.95;
            penalties.push("salary_warning".to_string());
        }

        if requirements.is_empty() {
            raw_score = raw_score.min(NO_REQUIREMENTS_CAP);
            penalties.push("no_skill_requirements_cap".to_string());
        }

        let raw_score = raw_score.clamp(0.0, 1.0);
        let final_score = if eligibility_ok { raw_score } else { 0.0 };

        let verdict = if !eligibility_ok {
            Verdict::Reject
        } else if raw_score >= 0.75 {
            Verdict::Strong
        } else if raw_score >= 0.50 {
            Verdict::Ok
        } else if raw_score >= 0.30 {
            Verdict::Weak
        } else {
            Verdict::Reject
        };

        let explanation = Explanation {
            warnings: unique(explanation_warnings),
            eligibility: Eligibility {
                ok: eligibility_ok,
                reasons_failed: unique(reasons_failed),
                warnings: unique(warnings),
            },
            ats: layer1.ats,
            semantic: SemanticReport {
                score: semantic_score,
            },
            r#final: FinalReport {
                score: final_score,
                raw_score,
                verdict,
                components: ScoreComponents {
                    semantic: semantic_score,
                    hard: layer1.hard_coverage,
                    nice: layer1.nice_coverage,
                },
                penalties,
            },
            cover_letter_points: build_cover_letter_points(&requirements, &layer1.matched),
        };

        let score = ScoreInput {
            layer1_score: (layer1.hard_coverage + layer1.nice_coverage) / 2.0,
            layer2_score: semantic_score,
            final_score,
            verdict: verdict.to_string(),
            explanation,
        };

        debug!(
            profile_id,
            vacancy_id,
            final_score,
            verdict = %verdict,
            "pair scored"
        );

        self.db
            .persist_score(profile_id, vacancy_id, &score, &layer1.matched)
            .await
    }

    /// Score the top-N semantically nearest vacancies for a profile.
    ///
    /// Requires the profile embedding to exist. Vacancies without an
    /// embedding are skipped with a warning; a failure on one pair logs and
    /// moves on to the next candidate.
    pub async fn compute_recommendations(
        &self,
        profile_id: i64,
        limit: usize,
    ) -> Result<Vec<VacancyScoreRow>> {
        let profile_vector = self
            .profile_vectors
            .get(profile_id)
            .await
            .map_err(|e| EngineError::Embedding(e.to_string()))?
            .ok_or(EngineError::not_found("ProfileEmbedding", profile_id))?;

        let hits = self
            .vacancy_vectors
            .search(&profile_vector, usize::MAX)
            .await
            .map_err(|e| EngineError::Embedding(e.to_string()))?;

        for vacancy_id in self
            .vacancy_vectors
            .ids_without_embedding()
            .await
            .map_err(|e| EngineError::Embedding(e.to_string()))?
        {
            warn!(
                profile_id,
                vacancy_id, "skipping vacancy without embedding in recommendations"
            );
        }

        let mut scores: Vec<VacancyScoreRow> = Vec::new();
        for hit in hits {
            if scores.len() >= limit {
                break;
            }
            match self.compute_for_pair(profile_id, hit.id).await {
                Ok(score) => scores.push(score),
                Err(err) => {
                    warn!(
                        profile_id,
                        vacancy_id = hit.id,
                        error = %err,
                        "pair scoring failed, continuing with next candidate"
                    );
                }
            }
        }

        scores.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.vacancy_id.cmp(&b.vacancy_id))
        });
        Ok(scores)
    }

    /// Tailoring bundle for a pair, scoring it on demand when absent.
    pub async fn get_tailoring(
        &self,
        profile_id: i64,
        vacancy_id: i64,
    ) -> Result<TailoringBundle> {
        let score = match self.db.get_score(profile_id, vacancy_id).await? {
            Some(score) => score,
            None => self.compute_for_pair(profile_id, vacancy_id).await?,
        };

        let profile = self.db.require_profile(profile_id).await?;
        let vacancy = self.db.require_vacancy(vacancy_id).await?;
        let evidence = self.db.list_evidence(profile_id, vacancy_id).await?;

        Ok(TailoringBundle::assemble(profile, vacancy, score, evidence))
    }

    async fn compute_layer2(&self, profile_id: i64, vacancy_id: i64) -> Result<f64> {
        let profile_vector = self
            .profile_vectors
            .get(profile_id)
            .await
            .map_err(|e| EngineError::Embedding(e.to_string()))?;
        let vacancy_vector = self
            .vacancy_vectors
            .get(vacancy_id)
            .await
            .map_err(|e| EngineError::Embedding(e.to_string()))?;

        match (profile_vector, vacancy_vector) {
            (Some(profile_vector), Some(vacancy_vector)) => {
                let similarity = cosine_similarity(&profile_vector, &vacancy_vector) as f64;
                Ok(similarity.clamp(0.0, 1.0))
            }
            _ => Ok(0.0),
        }
    }
}

fn compute_layer1(
    requirements: &[VacancyRequirementRow],
    profile_text: &str,
    resume_text: &str,
    skills_text: &str,
) -> Layer1Outcome {
    let profile_tokens = extract_profile_tokens(profile_text);

    let mut matched_hard_weight: i64 = 0;
    let mut total_hard_weight: i64 = 0;
    let mut matched_nice_weight: i64 = 0;
    let mut total_nice_weight: i64 = 0;

    let mut keywords_present: Vec<String> = Vec::new();
    let mut keywords_missing_must: Vec<String> = Vec::new();
    let mut keywords_missing_nice: Vec<String> = Vec::new();
    let mut keywords_uncertain: Vec<String> = Vec::new();
    let mut matched: Vec<EvidenceInput> = Vec::new();

    for requirement in requirements {
        let needle = if requirement.normalized_key.is_empty() {
            requirement.raw_text.as_str()
        } else {
            requirement.normalized_key.as_str()
        };
        let normalized_needle = normalize_skill(needle);
        let term_tokens = tokenize(&normalized_needle);

        let weight = requirement.weight.max(0);
        if requirement.is_hard {
            total_hard_weight += weight;
        } else {
            total_nice_weight += weight;
        }

        let exact_token_match = contains_token(&profile_tokens, &term_tokens);
        let evidence = find_evidence_snippet(profile_text, needle, SNIPPET_WINDOW);

        if exact_token_match || evidence.is_some() {
            if requirement.is_hard {
                matched_hard_weight += weight;
            } else {
                matched_nice_weight += weight;
            }
            keywords_present.push(requirement.raw_text.clone());
            if let Some((evidence_text, confidence)) = evidence {
                matched.push(EvidenceInput {
                    requirement_id: Some(requirement.id),
                    evidence_text,
                    evidence_type: "skill_match".to_string(),
                    confidence,
                });
            }
        } else {
            if requirement.is_hard {
                keywords_missing_must.push(requirement.raw_text.clone());
            } else {
                keywords_missing_nice.push(requirement.raw_text.clone());
            }
            if has_uncertain_match(&profile_tokens, &normalized_needle) {
                keywords_uncertain.push(requirement.raw_text.clone());
            }
        }
    }

    let hard_coverage = if total_hard_weight > 0 {
        matched_hard_weight as f64 / total_hard_weight as f64
    } else {
        0.0
    };
    let nice_coverage = if total_nice_weight > 0 {
        matched_nice_weight as f64 / total_nice_weight as f64
    } else {
        0.0
    };

    let keywords_missing_nice = unique(keywords_missing_nice);
    let keywords_uncertain = unique(keywords_uncertain);
    let keywords_to_add = unique(
        keywords_missing_nice
            .iter()
            .chain(keywords_uncertain.iter())
            .cloned()
            .collect(),
    );
    let keywords_missing_must = unique(keywords_missing_must);

    let structure_suggestions =
        build_structure_suggestions(&keywords_missing_must, resume_text, skills_text);

    Layer1Outcome {
        hard_coverage,
        nice_coverage,
        ats: AtsReport {
            keywords_present: unique(keywords_present),
            keywords_missing_must,
            keywords_missing_nice,
            keywords_uncertain,
            keywords_to_add,
            structure_suggestions,
        },
        matched,
    }
}

fn vacancy_haystack(vacancy: &Vacancy, plain_text: Option<&str>) -> String {
    match plain_text {
        Some(text) if !text.is_empty() => text.to_lowercase(),
        _ => strip_html(vacancy.description.as_deref().unwrap_or_default()).to_lowercase(),
    }
}

fn is_relocation_required(vacancy: &Vacancy, plain_text: Option<&str>) -> bool {
    if vacancy.source != "hh" {
        return false;
    }

    let description = vacancy_haystack(vacancy, plain_text);
    if not_relocation_patterns()
        .iter()
        .any(|pattern| pattern.is_match(&description))
    {
        return false;
    }

    RELOCATION_MARKERS
        .iter()
        .any(|marker| description.contains(marker))
}

fn is_remote_vacancy(vacancy: &Vacancy, plain_text: Option<&str>) -> bool {
    let haystack = [
        vacancy.title.to_lowercase(),
        vacancy.location.as_deref().unwrap_or_default().to_lowercase(),
        vacancy_haystack(vacancy, plain_text),
    ]
    .join(" ");

    REMOTE_MARKERS.iter().any(|marker| haystack.contains(marker))
}

fn is_location_mismatch(vacancy: &Vacancy, profile: &Profile, plain_text: Option<&str>) -> bool {
    let (Some(vacancy_location), Some(profile_location)) =
        (vacancy.location.as_deref(), profile.location.as_deref())
    else {
        return false;
    };
    if vacancy_location.trim().is_empty() || profile_location.trim().is_empty() {
        return false;
    }
    if is_remote_vacancy(vacancy, plain_text) {
        return false;
    }
    vacancy_location.trim() != profile_location.trim()
}

fn detect_vacancy_level(title: &str) -> Option<&'static str> {
    let lowered = title.to_lowercase();
    if lowered.contains("junior") || lowered.contains("джуниор") {
        return Some("junior");
    }
    if lowered.contains("senior") || lowered.contains("сеньор") {
        return Some("senior");
    }
    if lowered.contains("middle") || lowered.contains("мидл") {
        return Some("middle");
    }
    None
}

fn detect_profile_level(resume_text: &str) -> Option<&'static str> {
    let lowered = resume_text.to_lowercase();
    if lowered.contains("6+") || lowered.contains("senior") || lowered.contains("сеньор") {
        return Some("senior");
    }
    if lowered.contains("middle") || lowered.contains("мидл") {
        return Some("middle");
    }
    if lowered.contains("junior") || lowered.contains("джуниор") {
        return Some("junior");
    }
    None
}

fn build_cover_letter_points(
    requirements: &[VacancyRequirementRow],
    matched: &[EvidenceInput],
) -> Vec<String> {
    let mut points = Vec::new();
    for evidence in matched.iter().take(3) {
        let Some(requirement_id) = evidence.requirement_id else {
            continue;
        };
        let Some(requirement) = requirements.iter().find(|r| r.id == requirement_id) else {
            continue;
        };
        if normalize_skill(&requirement.raw_text).is_empty() {
            continue;
        }
        points.push(format!(
            "Подкрепите навык '{}' фактом из резюме: {}",
            requirement.raw_text, evidence.evidence_text
        ));
    }
    points
}

fn build_structure_suggestions(
    keywords_missing_must: &[String],
    resume_text: &str,
    skills_text: &str,
) -> Vec<String> {
    let mut suggestions = vec![
        "Опишите достижения в формате 'действие → результат → метрика'.".to_string(),
    ];
    if skills_text.trim().is_empty() {
        suggestions.push("Добавьте раздел Skills с ключевыми навыками.".to_string());
    }
    if resume_text.trim().chars().count() < MIN_RESUME_TEXT_LEN {
        suggestions
            .push("Расширьте описание опыта: добавьте задачи, результаты и метрики.".to_string());
    }
    if !keywords_missing_must.is_empty() {
        suggestions.push("Явно укажите обязательные навыки в опыте и summary.".to_string());
    }
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NewProfile, NewVacancy};

    async fn setup() -> (Database, MatchingEngine) {
        let db = Database::connect_in_memory().await.unwrap();
        let engine = MatchingEngine::new(db.clone(), 4);
        (db, engine)
    }

    async fn make_profile(db: &Database, resume: &str) -> i64 {
        db.create_profile(&NewProfile {
            resume_text: resume.to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
        .id
    }

    async fn make_vacancy(db: &Database, external_id: &str, description: &str) -> i64 {
        let (id, _) = db
            .upsert_vacancy(&NewVacancy {
                source: "hh".to_string(),
                external_id: external_id.to_string(),
                title: "Backend разработчик".to_string(),
                description: Some(description.to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        id
    }

    async fn add_skill_requirement(db: &Database, vacancy_id: i64, skill: &str, is_hard: bool) {
        let requirement = crate::requirements::ExtractedRequirement {
            kind: crate::requirements::RequirementKind::Skill,
            raw_text: skill.to_string(),
            normalized_key: normalize_skill(skill),
            is_hard,
            weight: if is_hard { 3 } else { 1 },
            source: "text_requirements".to_string(),
        };
        let mut conn = db.pool().acquire().await.unwrap();
        crate::store::replace_requirements(&mut conn, vacancy_id, &[requirement])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_hard_miss_gate() {
        let (db, engine) = setup().await;
        let profile_id = make_profile(&db, "Я пишу на Go").await;
        let vacancy_id = make_vacancy(&db, "v1", "нужен бекендер").await;
        add_skill_requirement(&db, vacancy_id, "Python", true).await;

        let score = engine.compute_for_pair(profile_id, vacancy_id).await.unwrap();
        assert_eq!(score.final_score, 0.0);
        assert_eq!(score.verdict, "reject");
        assert!(!score.explanation.0.eligibility.ok);
        assert!(score
            .explanation
            .0
            .ats
            .keywords_missing_must
            .contains(&"Python".to_string()));
    }

    #[tokio::test]
    async fn test_exact_match_and_evidence() {
        let (db, engine) = setup().await;
        let profile_id = make_profile(&db, "Пять лет опыта с Node.js в продакшене").await;
        let vacancy_id = make_vacancy(&db, "v1", "").await;
        add_skill_requirement(&db, vacancy_id, "Node", true).await;

        let score = engine.compute_for_pair(profile_id, vacancy_id).await.unwrap();
        let explanation = &score.explanation.0;
        assert!(explanation
            .ats
            .keywords_present
            .contains(&"Node".to_string()));
        assert!(explanation.eligibility.ok);

        let evidence = db.list_evidence(profile_id, vacancy_id).await.unwrap();
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].confidence, 1.0);
        assert_eq!(evidence[0].evidence_type, "skill_match");
    }

    #[tokio::test]
    async fn test_alias_match_confidence() {
        let (db, engine) = setup().await;
        let profile_id = make_profile(&db, "Делаю интерфейсы на React").await;
        let vacancy_id = make_vacancy(&db, "v1", "").await;
        add_skill_requirement(&db, vacancy_id, "ReactJS", true).await;

        let score = engine.compute_for_pair(profile_id, vacancy_id).await.unwrap();
        assert!(score
            .explanation
            .0
            .ats
            .keywords_present
            .contains(&"ReactJS".to_string()));

        let evidence = db.list_evidence(profile_id, vacancy_id).await.unwrap();
        assert_eq!(evidence[0].confidence, 0.8);
    }

    #[tokio::test]
    async fn test_relocation_reject() {
        let (db, engine) = setup().await;
        let profile_id = make_profile(&db, "Python разработчик").await;
        let vacancy_id = make_vacancy(
            &db,
            "v1",
            "<p>Требуется релокация в Казань, поможем с переездом</p>",
        )
        .await;

        let score = engine.compute_for_pair(profile_id, vacancy_id).await.unwrap();
        assert_eq!(score.verdict, "reject");
        assert_eq!(score.final_score, 0.0);
        assert!(score
            .explanation
            .0
            .eligibility
            .reasons_failed
            .contains(&"Требуется релокация".to_string()));
    }

    #[tokio::test]
    async fn test_relocation_negative_pattern() {
        let (db, engine) = setup().await;
        let profile_id = make_profile(&db, "Python разработчик").await;
        let vacancy_id = make_vacancy(&db, "v1", "<p>Удаленная работа, релокация не требуется</p>").await;

        let score = engine.compute_for_pair(profile_id, vacancy_id).await.unwrap();
        assert!(score.explanation.0.eligibility.ok);
    }

    #[tokio::test]
    async fn test_location_mismatch_unless_remote() {
        let (db, engine) = setup().await;
        let profile = db
            .create_profile(&NewProfile {
                resume_text: "Python".to_string(),
                location: Some("Санкт-Петербург".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let (office_id, _) = db
            .upsert_vacancy(&NewVacancy {
                source: "hh".to_string(),
                external_id: "office".to_string(),
                title: "Backend".to_string(),
                location: Some("Москва".to_string()),
                description: Some("офисная работа".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let score = engine.compute_for_pair(profile.id, office_id).await.unwrap();
        assert!(score
            .explanation
            .0
            .eligibility
            .reasons_failed
            .contains(&"Несовпадение локации".to_string()));

        let (remote_id, _) = db
            .upsert_vacancy(&NewVacancy {
                source: "hh".to_string(),
                external_id: "remote".to_string(),
                title: "Backend (удаленно)".to_string(),
                location: Some("Москва".to_string()),
                description: Some("полностью удаленная работа".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let score = engine.compute_for_pair(profile.id, remote_id).await.unwrap();
        assert!(score.explanation.0.eligibility.ok);
    }

    #[tokio::test]
    async fn test_salary_gate_and_warning() {
        let (db, engine) = setup().await;
        let profile = db
            .create_profile(&NewProfile {
                resume_text: "Python".to_string(),
                salary_min: Some(300_000),
                ..Default::default()
            })
            .await
            .unwrap();

        // Fork entirely below expectations: hard fail.
        let (low_id, _) = db
            .upsert_vacancy(&NewVacancy {
                source: "hh".to_string(),
                external_id: "low".to_string(),
                title: "Backend".to_string(),
                salary_from: Some(150_000),
                salary_to: Some(250_000),
                ..Default::default()
            })
            .await
            .unwrap();
        let score = engine.compute_for_pair(profile.id, low_id).await.unwrap();
        assert!(score
            .explanation
            .0
            .eligibility
            .reasons_failed
            .contains(&"Ожидания по зарплате выше вилки".to_string()));

        // Only the lower bound is below: warning plus the 0.95 penalty.
        let (floor_id, _) = db
            .upsert_vacancy(&NewVacancy {
                source: "hh".to_string(),
                external_id: "floor".to_string(),
                title: "Backend".to_string(),
                salary_from: Some(250_000),
                salary_to: Some(400_000),
                ..Default::default()
            })
            .await
            .unwrap();
        let score = engine.compute_for_pair(profile.id, floor_id).await.unwrap();
        assert!(score.explanation.0.eligibility.ok);
        assert!(score
            .explanation
            .0
            .r#final
            .penalties
            .contains(&"salary_warning".to_string()));
    }

    #[tokio::test]
    async fn test_no_requirements_cap() {
        let (db, engine) = setup().await;
        let profile_id = make_profile(&db, "Python").await;
        let vacancy_id = make_vacancy(&db, "v1", "просто описание").await;

        // Perfectly aligned embeddings would otherwise give raw = 0.45.
        let store = SqliteVectorStore::for_profiles(db.clone(), 4);
        store.upsert(profile_id, &[1.0, 0.0, 0.0, 0.0], "m").await.unwrap();
        let store = SqliteVectorStore::for_vacancies(db.clone(), 4);
        store.upsert(vacancy_id, &[1.0, 0.0, 0.0, 0.0], "m").await.unwrap();

        let score = engine.compute_for_pair(profile_id, vacancy_id).await.unwrap();
        let explanation = &score.explanation.0;
        assert!(explanation
            .warnings
            .contains(&"no_skill_requirements_extracted".to_string()));
        assert!(explanation
            .r#final
            .penalties
            .contains(&"no_skill_requirements_cap".to_string()));
        assert!(score.final_score <= NO_REQUIREMENTS_CAP);
        assert_eq!(explanation.r#final.components.hard, 0.0);
        assert_eq!(explanation.r#final.components.nice, 0.0);
    }

    #[tokio::test]
    async fn test_overqualified_penalty() {
        let (db, engine) = setup().await;
        let profile_id = make_profile(&db, "Senior инженер, 6+ лет опыта с Python").await;
        let (vacancy_id, _) = db
            .upsert_vacancy(&NewVacancy {
                source: "hh".to_string(),
                external_id: "junior".to_string(),
                title: "Junior Python разработчик".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        add_skill_requirement(&db, vacancy_id, "Python", true).await;

        let score = engine.compute_for_pair(profile_id, vacancy_id).await.unwrap();
        let explanation = &score.explanation.0;
        assert!(explanation.eligibility.ok, "penalty must not gate");
        assert!(explanation
            .r#final
            .penalties
            .contains(&"overqualified".to_string()));
        assert!(explanation
            .eligibility
            .warnings
            .contains(&"overqualified".to_string()));
    }

    #[tokio::test]
    async fn test_layer2_missing_embeddings_is_zero() {
        let (db, engine) = setup().await;
        let profile_id = make_profile(&db, "Python").await;
        let vacancy_id = make_vacancy(&db, "v1", "").await;
        add_skill_requirement(&db, vacancy_id, "Python", true).await;

        let score = engine.compute_for_pair(profile_id, vacancy_id).await.unwrap();
        assert_eq!(score.layer2_score, 0.0);
    }

    #[tokio::test]
    async fn test_recommendations_require_profile_embedding() {
        let (db, engine) = setup().await;
        let profile_id = make_profile(&db, "Python").await;

        let err = engine.compute_recommendations(profile_id, 5).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_recommendations_ordering_and_limit() {
        let (db, engine) = setup().await;
        let profile_id = make_profile(&db, "Пишу на Python, знаю Docker").await;

        let profile_store = SqliteVectorStore::for_profiles(db.clone(), 4);
        profile_store
            .upsert(profile_id, &[1.0, 0.0, 0.0, 0.0], "m")
            .await
            .unwrap();

        let vacancy_store = SqliteVectorStore::for_vacancies(db.clone(), 4);
        let vectors: [(f32, f32); 5] = [(1.0, 0.0), (0.9, 0.1), (0.5, 0.5), (0.1, 0.9), (0.0, 1.0)];
        for (index, (x, y)) in vectors.iter().enumerate() {
            let vacancy_id = make_vacancy(&db, &format!("v{index}"), "описание").await;
            add_skill_requirement(&db, vacancy_id, "Python", true).await;
            let norm = (x * x + y * y).sqrt();
            vacancy_store
                .upsert(vacancy_id, &[x / norm, y / norm, 0.0, 0.0], "m")
                .await
                .unwrap();
        }

        let scores = engine.compute_recommendations(profile_id, 5).await.unwrap();
        assert_eq!(scores.len(), 5);
        for pair in scores.windows(2) {
            assert!(
                pair[0].final_score >= pair[1].final_score
                    || (pair[0].final_score == pair[1].final_score
                        && pair[0].vacancy_id < pair[1].vacancy_id)
            );
        }

        let limited = engine.compute_recommendations(profile_id, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn test_layer2_monotonic_over_ann_order() {
        let (db, engine) = setup().await;
        let profile_id = make_profile(&db, "Python").await;

        let profile_store = SqliteVectorStore::for_profiles(db.clone(), 4);
        profile_store
            .upsert(profile_id, &[1.0, 0.0, 0.0, 0.0], "m")
            .await
            .unwrap();

        let vacancy_store = SqliteVectorStore::for_vacancies(db.clone(), 4);
        for (index, similarity) in [0.95_f32, 0.6, 0.2].iter().enumerate() {
            let vacancy_id = make_vacancy(&db, &format!("v{index}"), "").await;
            let y = (1.0 - similarity * similarity).sqrt();
            vacancy_store
                .upsert(vacancy_id, &[*similarity, y, 0.0, 0.0], "m")
                .await
                .unwrap();
        }

        let profile_vector = profile_store.get(profile_id).await.unwrap().unwrap();
        let hits = vacancy_store.search(&profile_vector, 10).await.unwrap();

        let mut previous = f64::INFINITY;
        for hit in hits {
            let score = engine.compute_for_pair(profile_id, hit.id).await.unwrap();
            assert!(score.layer2_score <= previous + 1e-9);
            previous = score.layer2_score;
        }
    }

    #[tokio::test]
    async fn test_tailoring_computes_on_demand() {
        let (db, engine) = setup().await;
        let profile_id = make_profile(&db, "Python и Docker").await;
        let vacancy_id = make_vacancy(&db, "v1", "").await;
        add_skill_requirement(&db, vacancy_id, "Python", true).await;

        assert!(db.get_score(profile_id, vacancy_id).await.unwrap().is_none());

        let bundle = engine.get_tailoring(profile_id, vacancy_id).await.unwrap();
        assert_eq!(bundle.profile_id, profile_id);
        assert_eq!(bundle.vacancy_id, vacancy_id);
        assert!(!bundle.evidence.is_empty());
        assert!(db.get_score(profile_id, vacancy_id).await.unwrap().is_some());
    }

    #[test]
    fn test_level_probes() {
        assert_eq!(detect_vacancy_level("Junior Python dev"), Some("junior"));
        assert_eq!(detect_vacancy_level("Сеньор-разработчик"), Some("senior"));
        assert_eq!(detect_vacancy_level("Backend разработчик"), None);

        assert_eq!(detect_profile_level("опыт 6+ лет"), Some("senior"));
        assert_eq!(detect_profile_level("джуниор ищет работу"), Some("junior"));
        assert_eq!(detect_profile_level("просто текст"), None);
    }
}
