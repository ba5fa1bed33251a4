//! Tailoring bundle for downstream document generation
//!
//! Assembles profile facts, vacancy facts, the stored explanation and the
//! supporting evidence into one input payload for resume/cover-letter
//! drafting. This is the boundary of the core: the generation service only
//! ever sees this bundle.

use serde::{Deserialize, Serialize};

use super::Explanation;
use crate::store::{Profile, ResumeEvidenceRow, Vacancy, VacancyScoreRow};

/// One evidence snippet in the bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub evidence_text: String,
    pub evidence_type: String,
    pub confidence: f64,
}

/// Compact profile facts carried into generation prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileFacts {
    pub title: Option<String>,
    pub resume_text: String,
    pub skills_text: Option<String>,
    pub location: Option<String>,
    pub salary_min: Option<i64>,
}

/// Compact vacancy facts carried into generation prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VacancyFacts {
    pub title: String,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub salary_from: Option<i64>,
    pub salary_to: Option<i64>,
    pub currency: Option<String>,
}

/// Everything a downstream generator needs for one (profile, vacancy) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailoringBundle {
    pub profile_id: i64,
    pub vacancy_id: i64,
    pub profile: ProfileFacts,
    pub vacancy: VacancyFacts,
    pub explanation: Explanation,
    pub evidence: Vec<EvidenceItem>,
}

impl TailoringBundle {
    pub fn assemble(
        profile: Profile,
        vacancy: Vacancy,
        score: VacancyScoreRow,
        evidence: Vec<ResumeEvidenceRow>,
    ) -> Self {
        Self {
            profile_id: profile.id,
            vacancy_id: vacancy.id,
            profile: ProfileFacts {
                title: profile.title,
                resume_text: profile.resume_text,
                skills_text: profile.skills_text,
                location: profile.location,
                salary_min: profile.salary_min,
            },
            vacancy: VacancyFacts {
                title: vacancy.title,
                company_name: vacancy.company_name,
                location: vacancy.location,
                url: vacancy.url,
                salary_from: vacancy.salary_from,
                salary_to: vacancy.salary_to,
                currency: vacancy.currency,
            },
            explanation: score.explanation.0,
            evidence: evidence
                .into_iter()
                .map(|row| EvidenceItem {
                    evidence_text: row.evidence_text,
                    evidence_type: row.evidence_type,
                    confidence: row.confidence,
                })
                .collect(),
        }
    }
}
