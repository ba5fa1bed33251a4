//! Typed match explanation
//!
//! The explanation is a tagged structure with stable keys, serialized to
//! JSON only at the storage boundary. Serialization must round-trip so that
//! previously stored rows stay readable.

use serde::{Deserialize, Serialize};

/// Categorical match summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Strong,
    Ok,
    Weak,
    #[default]
    Reject,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Ok => "ok",
            Self::Weak => "weak",
            Self::Reject => "reject",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strong" => Ok(Self::Strong),
            "ok" => Ok(Self::Ok),
            "weak" => Ok(Self::Weak),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown verdict: {other}")),
        }
    }
}

/// Gate outcomes: a non-empty `reasons_failed` zeroes the final score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Eligibility {
    pub ok: bool,
    pub reasons_failed: Vec<String>,
    pub warnings: Vec<String>,
}

/// Keyword-coverage report (Layer-1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtsReport {
    pub keywords_present: Vec<String>,
    pub keywords_missing_must: Vec<String>,
    pub keywords_missing_nice: Vec<String>,
    pub keywords_uncertain: Vec<String>,
    pub keywords_to_add: Vec<String>,
    pub structure_suggestions: Vec<String>,
}

/// Semantic-similarity report (Layer-2).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticReport {
    pub score: f64,
}

/// Weighted components of the raw score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub semantic: f64,
    pub hard: f64,
    pub nice: f64,
}

/// Final score block, including the pre-gate raw score and applied penalties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    pub score: f64,
    pub raw_score: f64,
    pub verdict: Verdict,
    pub components: ScoreComponents,
    pub penalties: Vec<String>,
}

/// Full explanation stored with every score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub warnings: Vec<String>,
    pub eligibility: Eligibility,
    pub ats: AtsReport,
    pub semantic: SemanticReport,
    pub r#final: FinalReport,
    pub cover_letter_points: Vec<String>,
}
