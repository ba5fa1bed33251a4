//! API request and response payloads
//!
//! Entity payloads (create/update bodies, stored rows) come straight from
//! the engine's store models; this module adds the wrappers and the error
//! body that exist only at the HTTP edge.

use axum::http::StatusCode;
use axum::Json;
use jobmatch_engine::matching::Explanation;
use jobmatch_engine::EngineError;
use serde::{Deserialize, Serialize};

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable message
    pub detail: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            detail: detail.into(),
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new("NOT_FOUND", format!("{resource} not found"))
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", detail)
    }
}

/// Standard rejection type of the handlers.
pub type Rejection = (StatusCode, Json<ApiError>);

/// Map an engine error onto an HTTP rejection.
pub fn reject(err: EngineError) -> Rejection {
    match &err {
        EngineError::NotFound { entity, .. } => (
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found(entity)),
        ),
        EngineError::Config(detail) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::new("CONFIGURATION_ERROR", detail.clone())),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::internal(err.to_string())),
        ),
    }
}

pub fn not_found(resource: &str) -> Rejection {
    (StatusCode::NOT_FOUND, Json(ApiError::not_found(resource)))
}

pub fn unprocessable(detail: impl Into<String>) -> Rejection {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ApiError::validation(detail)),
    )
}

/// Response carrying an enqueued task id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskIdResponse {
    pub task_id: String,
}

/// One entry of a recommendations listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub id: i64,
    pub title: String,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub final_score: f64,
    pub verdict: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub profile_id: i64,
    pub items: Vec<RecommendationItem>,
}

/// Evidence snippet in a tailoring response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItemDto {
    pub evidence_text: String,
    pub evidence_type: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailoringResponse {
    pub profile_id: i64,
    pub vacancy_id: i64,
    pub explanation: Explanation,
    pub evidence: Vec<EvidenceItemDto>,
}

/// Query parameter for recommendation endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

impl Default for LimitParams {
    fn default() -> Self {
        Self {
            limit: default_limit(),
        }
    }
}

/// Health check payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_not_found_maps_to_404() {
        let (status, body) = reject(EngineError::not_found("Profile", 7));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "NOT_FOUND");
        assert!(body.detail.contains("Profile"));
    }

    #[test]
    fn test_config_error_maps_to_500() {
        let (status, body) = reject(EngineError::Config("missing HH_USER_AGENT".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_limit_default() {
        let params: LimitParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.limit, 50);
    }
}
