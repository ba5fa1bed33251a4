//! Task types
//!
//! Every task is a named, serializable payload; the runtime provides
//! at-least-once delivery, a result store and immutable chains.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ingest::ImportFilters;

/// Unique task identifier.
pub type TaskId = Uuid;

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Running,
    Success,
    Failure,
    Cancelled,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal states never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::Cancelled)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown task state: {other}")),
        }
    }
}

/// Named task payloads the workers know how to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    /// One-off import with explicit filters.
    ImportVacancies { filters: ImportFilters },

    /// Incremental sync of one saved search.
    SyncSavedSearch { saved_search_id: i64 },

    /// Beat target: enqueue a sync task per active saved search.
    SyncAllSavedSearches,

    /// Compute and UPSERT the embedding of one vacancy.
    BuildVacancyEmbedding { vacancy_id: i64 },

    /// Compute and UPSERT the embedding of one profile.
    BuildProfileEmbedding { profile_id: i64 },

    /// Delete and re-embed every vacancy and profile, in chunks.
    RebuildEmbeddings,

    /// Score the top-N nearest vacancies for a profile.
    ComputeRecommendations { profile_id: i64, limit: usize },

    /// Seed normalized rows (resume version, skills) for a legacy profile.
    BackfillProfile { profile_id: i64 },

    /// Re-parse stored vacancies whose parser version is stale.
    BackfillParsed {
        limit: Option<i64>,
        only_missing: bool,
    },
}

impl TaskKind {
    /// Stable task name, stored alongside the payload.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ImportVacancies { .. } => "import_vacancies",
            Self::SyncSavedSearch { .. } => "sync_saved_search",
            Self::SyncAllSavedSearches => "sync_all_saved_searches",
            Self::BuildVacancyEmbedding { .. } => "build_vacancy_embedding",
            Self::BuildProfileEmbedding { .. } => "build_profile_embedding",
            Self::RebuildEmbeddings => "rebuild_embeddings",
            Self::ComputeRecommendations { .. } => "compute_recommendations",
            Self::BackfillProfile { .. } => "backfill_profile",
            Self::BackfillParsed { .. } => "backfill_parsed",
        }
    }
}

/// A stored task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub kind: TaskKind,
    pub state: TaskState,
    pub attempts: i64,
    /// Previous step of the chain this task was spawned by, if any.
    pub parent_id: Option<TaskId>,
    /// Remaining chain steps to enqueue after success.
    pub chain: Vec<TaskKind>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub worker_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// An enqueue request: one task plus an immutable chain of follow-ups.
///
/// Each successful step enqueues the next with `parent_id` pointing at the
/// finished step, so the chain's history is reachable from its tail. A
/// failed step aborts the remainder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub kind: TaskKind,
    pub chain: Vec<TaskKind>,
    pub parent_id: Option<TaskId>,
}

impl TaskRequest {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            chain: Vec::new(),
            parent_id: None,
        }
    }

    /// Append a follow-up step to run after this one succeeds.
    pub fn then(mut self, kind: TaskKind) -> Self {
        self.chain.push(kind);
        self
    }
}

/// Result-store view of a task, the `AsyncResult` analog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    pub task_id: TaskId,
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serialization_is_tagged() {
        let kind = TaskKind::BuildVacancyEmbedding { vacancy_id: 7 };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "build_vacancy_embedding");
        assert_eq!(json["vacancy_id"], 7);

        let parsed: TaskKind = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, kind);
    }

    #[test]
    fn test_chain_builder_preserves_order() {
        let request = TaskRequest::new(TaskKind::BackfillProfile { profile_id: 1 })
            .then(TaskKind::BuildProfileEmbedding { profile_id: 1 })
            .then(TaskKind::ComputeRecommendations {
                profile_id: 1,
                limit: 50,
            });

        assert_eq!(request.chain.len(), 2);
        assert_eq!(request.chain[0].name(), "build_profile_embedding");
        assert_eq!(request.chain[1].name(), "compute_recommendations");
    }

    #[test]
    fn test_state_round_trip() {
        for state in [
            TaskState::Pending,
            TaskState::Running,
            TaskState::Success,
            TaskState::Failure,
            TaskState::Cancelled,
        ] {
            assert_eq!(state.as_str().parse::<TaskState>().unwrap(), state);
        }
        assert!(TaskState::Success.is_terminal());
        assert!(!TaskState::Running.is_terminal());
    }
}
