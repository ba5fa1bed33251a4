//! Durable task queue over the `tasks` table
//!
//! At-least-once: a claim moves the oldest pending row to `running` inside a
//! transaction; a worker that dies mid-task leaves the row `running` until an
//! operator requeues it. The same table doubles as the result store.

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[cfg(test)]
use super::types::TaskKind;
use super::types::{Task, TaskId, TaskRequest, TaskState, TaskStatus};
use crate::errors::{EngineError, Result};
use crate::store::Database;

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: String,
    name: String,
    payload: String,
    state: String,
    attempts: i64,
    parent_id: Option<String>,
    chain_json: String,
    result: Option<String>,
    error: Option<String>,
    worker_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl TryFrom<TaskRow> for Task {
    type Error = EngineError;

    fn try_from(row: TaskRow) -> Result<Task> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| EngineError::Task(format!("invalid task id {}: {e}", row.id)))?;
        let parent_id = row
            .parent_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| EngineError::Task(format!("invalid parent id: {e}")))?;
        let state: TaskState = row.state.parse().map_err(EngineError::Task)?;

        Ok(Task {
            id,
            name: row.name,
            kind: serde_json::from_str(&row.payload)?,
            state,
            attempts: row.attempts,
            parent_id,
            chain: serde_json::from_str(&row.chain_json)?,
            result: row.result.as_deref().map(serde_json::from_str).transpose()?,
            error: row.error,
            worker_id: row.worker_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            started_at: row.started_at,
            finished_at: row.finished_at,
        })
    }
}

/// Handle to the task queue. Cheap to clone.
#[derive(Clone, Debug)]
pub struct TaskQueue {
    db: Database,
}

impl TaskQueue {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Enqueue a task (and remember its chain); returns the task id.
    pub async fn enqueue(&self, request: TaskRequest) -> Result<TaskId> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO tasks (id, name, payload, state, attempts, parent_id, chain_json,
                               created_at, updated_at)
            VALUES (?, ?, ?, 'pending', 0, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(request.kind.name())
        .bind(serde_json::to_string(&request.kind)?)
        .bind(request.parent_id.map(|p| p.to_string()))
        .bind(serde_json::to_string(&request.chain)?)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        Ok(id)
    }

    pub async fn get(&self, id: TaskId) -> Result<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(self.db.pool())
            .await?;
        row.map(Task::try_from).transpose()
    }

    /// Result-store read for polling clients.
    pub async fn status(&self, id: TaskId) -> Result<Option<TaskStatus>> {
        Ok(self.get(id).await?.map(|task| TaskStatus {
            task_id: task.id,
            state: task.state,
            result: task.result,
            error: task.error,
        }))
    }

    /// Claim the oldest pending task for a worker.
    pub async fn claim(&self, worker_id: &str) -> Result<Option<Task>> {
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query_as::<_, TaskRow>(
            "SELECT * FROM tasks WHERE state = 'pending' ORDER BY created_at ASC, rowid ASC LIMIT 1",
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE tasks SET state = 'running', worker_id = ?, attempts = attempts + 1,
                             started_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(worker_id)
        .bind(now)
        .bind(now)
        .bind(&row.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut task = Task::try_from(row)?;
        task.state = TaskState::Running;
        task.worker_id = Some(worker_id.to_string());
        task.attempts += 1;
        task.started_at = Some(now);
        Ok(Some(task))
    }

    /// Mark a task successful and enqueue the next chain step, if any.
    /// Returns the follow-up task id.
    pub async fn complete(
        &self,
        task: &Task,
        result: serde_json::Value,
    ) -> Result<Option<TaskId>> {
        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE tasks SET state = 'success', result = ?, finished_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(serde_json::to_string(&result)?)
        .bind(now)
        .bind(now)
        .bind(task.id.to_string())
        .execute(self.db.pool())
        .await?;

        let mut chain = task.chain.clone();
        if chain.is_empty() {
            return Ok(None);
        }

        let next_kind = chain.remove(0);
        let next_id = self
            .enqueue(TaskRequest {
                kind: next_kind,
                chain,
                parent_id: Some(task.id),
            })
            .await?;
        Ok(Some(next_id))
    }

    /// Mark a task failed. The remaining chain is aborted.
    pub async fn fail(&self, id: TaskId, error: &str) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE tasks SET state = 'failure', error = ?, finished_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(error)
        .bind(now)
        .bind(now)
        .bind(id.to_string())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Cancel a pending task. Running tasks finish; cancellation is
    /// cooperative.
    pub async fn cancel(&self, id: TaskId) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE tasks SET state = 'cancelled', finished_at = ?, updated_at = ? \
             WHERE id = ? AND state = 'pending'",
        )
        .bind(now)
        .bind(now)
        .bind(id.to_string())
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn pending_count(&self) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE state = 'pending'")
                .fetch_one(self.db.pool())
                .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn queue() -> TaskQueue {
        TaskQueue::new(Database::connect_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_enqueue_and_status() {
        let queue = queue().await;
        let id = queue
            .enqueue(TaskRequest::new(TaskKind::SyncSavedSearch { saved_search_id: 1 }))
            .await
            .unwrap();

        let status = queue.status(id).await.unwrap().unwrap();
        assert_eq!(status.state, TaskState::Pending);
        assert!(status.result.is_none());
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn test_claim_order_is_fifo() {
        let queue = queue().await;
        let first = queue
            .enqueue(TaskRequest::new(TaskKind::BuildVacancyEmbedding { vacancy_id: 1 }))
            .await
            .unwrap();
        let _second = queue
            .enqueue(TaskRequest::new(TaskKind::BuildVacancyEmbedding { vacancy_id: 2 }))
            .await
            .unwrap();

        let claimed = queue.claim("worker-1").await.unwrap().unwrap();
        assert_eq!(claimed.id, first);
        assert_eq!(claimed.state, TaskState::Running);
        assert_eq!(claimed.attempts, 1);

        // The claimed task is no longer claimable.
        let next = queue.claim("worker-2").await.unwrap().unwrap();
        assert_ne!(next.id, first);
        assert!(queue.claim("worker-3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_complete_stores_result() {
        let queue = queue().await;
        queue
            .enqueue(TaskRequest::new(TaskKind::SyncAllSavedSearches))
            .await
            .unwrap();

        let task = queue.claim("worker-1").await.unwrap().unwrap();
        queue
            .complete(&task, serde_json::json!({"enqueued": 3}))
            .await
            .unwrap();

        let status = queue.status(task.id).await.unwrap().unwrap();
        assert_eq!(status.state, TaskState::Success);
        assert_eq!(status.result.unwrap()["enqueued"], 3);
    }

    #[tokio::test]
    async fn test_chain_spawns_next_with_parent_link() {
        let queue = queue().await;
        let head = queue
            .enqueue(
                TaskRequest::new(TaskKind::BackfillProfile { profile_id: 1 })
                    .then(TaskKind::BuildProfileEmbedding { profile_id: 1 })
                    .then(TaskKind::ComputeRecommendations {
                        profile_id: 1,
                        limit: 10,
                    }),
            )
            .await
            .unwrap();

        let first = queue.claim("w").await.unwrap().unwrap();
        assert_eq!(first.id, head);
        let second_id = queue
            .complete(&first, serde_json::json!({}))
            .await
            .unwrap()
            .unwrap();

        let second = queue.claim("w").await.unwrap().unwrap();
        assert_eq!(second.id, second_id);
        assert_eq!(second.parent_id, Some(head));
        assert_eq!(second.chain.len(), 1);

        let third_id = queue
            .complete(&second, serde_json::json!({}))
            .await
            .unwrap()
            .unwrap();
        let third = queue.get(third_id).await.unwrap().unwrap();
        // Parent ids walk back to the head of the chain.
        assert_eq!(third.parent_id, Some(second.id));
        assert!(third.chain.is_empty());
    }

    #[tokio::test]
    async fn test_failure_aborts_chain() {
        let queue = queue().await;
        queue
            .enqueue(
                TaskRequest::new(TaskKind::BackfillProfile { profile_id: 1 })
                    .then(TaskKind::BuildProfileEmbedding { profile_id: 1 }),
            )
            .await
            .unwrap();

        let task = queue.claim("w").await.unwrap().unwrap();
        queue.fail(task.id, "profile exploded").await.unwrap();

        let status = queue.status(task.id).await.unwrap().unwrap();
        assert_eq!(status.state, TaskState::Failure);
        assert_eq!(status.error.as_deref(), Some("profile exploded"));

        // No follow-up was enqueued.
        assert_eq!(queue.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancel_only_pending() {
        let queue = queue().await;
        let id = queue
            .enqueue(TaskRequest::new(TaskKind::SyncAllSavedSearches))
            .await
            .unwrap();
        assert!(queue.cancel(id).await.unwrap());

        let running = queue
            .enqueue(TaskRequest::new(TaskKind::SyncAllSavedSearches))
            .await
            .unwrap();
        queue.claim("w").await.unwrap().unwrap();
        // In-flight tasks are not cancelled out from under their worker.
        assert!(!queue.cancel(running).await.unwrap());
    }
}
