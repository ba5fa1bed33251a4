//! Worker loop
//!
//! A worker claims one task at a time and runs it to completion; each task
//! opens its own HTTP client and database session through the shared pool.
//! Parallelism comes from running several workers. Shutdown is cooperative:
//! the in-flight task finishes before the loop exits.

use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use super::handlers::{run_task, TaskContext};
use super::queue::TaskQueue;
use super::types::Task;

/// Worker settings.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Worker identity, recorded on claimed tasks.
    pub worker_id: String,

    /// Poll interval while the queue is empty.
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("worker-{}", uuid::Uuid::new_v4()),
            poll_interval: Duration::from_millis(500),
        }
    }
}

pub struct Worker {
    ctx: TaskContext,
    queue: TaskQueue,
    config: WorkerConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl Worker {
    pub fn new(ctx: TaskContext, config: WorkerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let queue = ctx.queue.clone();
        Self {
            ctx,
            queue,
            config,
            shutdown_tx,
        }
    }

    /// Sender used to request a graceful stop.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Claim-and-run loop until shutdown is requested.
    pub async fn run(&self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        info!(worker_id = %self.config.worker_id, "worker started");

        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            match self.queue.claim(&self.config.worker_id).await {
                Ok(Some(task)) => self.process(task).await,
                Ok(None) => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                        _ = shutdown_rx.recv() => break,
                    }
                }
                Err(err) => {
                    error!(error = %err, "failed to claim task");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }

        info!(worker_id = %self.config.worker_id, "worker stopped");
    }

    /// Run exactly one claimed task. Exposed for tests and one-shot CLI runs.
    pub async fn process(&self, task: Task) {
        info!(task_id = %task.id, name = %task.name, "task started");

        match run_task(&self.ctx, &task.kind).await {
            Ok(result) => match self.queue.complete(&task, result).await {
                Ok(Some(next_id)) => {
                    info!(task_id = %task.id, next_task_id = %next_id, "task finished, chain continues");
                }
                Ok(None) => {
                    info!(task_id = %task.id, "task finished");
                }
                Err(err) => {
                    error!(task_id = %task.id, error = %err, "failed to store task result");
                }
            },
            Err(err) => {
                warn!(task_id = %task.id, name = %task.name, error = %err, "task failed");
                if let Err(store_err) = self.queue.fail(task.id, &err.to_string()).await {
                    error!(task_id = %task.id, error = %store_err, "failed to store task failure");
                }
            }
        }
    }

    /// Drain the queue until it is empty. Useful for tests and CLI one-shots.
    pub async fn drain(&self) -> usize {
        let mut processed = 0;
        while let Ok(Some(task)) = self.queue.claim(&self.config.worker_id).await {
            self.process(task).await;
            processed += 1;
        }
        processed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::types::{TaskKind, TaskRequest, TaskState};
    use super::*;
    use crate::config::AppConfig;
    use crate::store::{Database, NewProfile};

    async fn worker() -> (Worker, TaskQueue, Database) {
        let db = Database::connect_in_memory().await.unwrap();
        let queue = TaskQueue::new(db.clone());
        let ctx = TaskContext::new(db.clone(), Arc::new(AppConfig::default()), queue.clone());
        (
            Worker::new(
                ctx,
                WorkerConfig {
                    worker_id: "test-worker".to_string(),
                    poll_interval: Duration::from_millis(10),
                },
            ),
            queue,
            db,
        )
    }

    #[tokio::test]
    async fn test_drain_processes_queue() {
        let (worker, queue, db) = worker().await;
        let profile = db
            .create_profile(&NewProfile {
                resume_text: "Python".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let task_id = queue
            .enqueue(TaskRequest::new(TaskKind::BuildProfileEmbedding {
                profile_id: profile.id,
            }))
            .await
            .unwrap();

        let processed = worker.drain().await;
        assert_eq!(processed, 1);

        let status = queue.status(task_id).await.unwrap().unwrap();
        assert_eq!(status.state, TaskState::Success);
        assert_eq!(status.result.unwrap()["status"], "ok");
    }

    #[tokio::test]
    async fn test_chain_runs_through_drain() {
        let (worker, queue, db) = worker().await;
        let profile = db
            .create_profile(&NewProfile {
                resume_text: "Python".to_string(),
                skills_text: Some("Python;Docker".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        queue
            .enqueue(
                TaskRequest::new(TaskKind::BackfillProfile { profile_id: profile.id })
                    .then(TaskKind::BuildProfileEmbedding { profile_id: profile.id })
                    .then(TaskKind::ComputeRecommendations {
                        profile_id: profile.id,
                        limit: 10,
                    }),
            )
            .await
            .unwrap();

        // backfill -> embed -> recommend.
        let processed = worker.drain().await;
        assert_eq!(processed, 3);

        assert!(!db.list_skills(profile.id).await.unwrap().is_empty());
        let store = crate::vector_store::SqliteVectorStore::for_profiles(db.clone(), 384);
        assert_eq!(
            crate::vector_store::VectorStore::count(&store).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_failure_lands_in_result_store() {
        let (worker, queue, _db) = worker().await;

        // Sync of a missing saved search fails the task.
        let task_id = queue
            .enqueue(TaskRequest::new(TaskKind::SyncSavedSearch {
                saved_search_id: 404,
            }))
            .await
            .unwrap();

        worker.drain().await;

        let status = queue.status(task_id).await.unwrap().unwrap();
        assert_eq!(status.state, TaskState::Failure);
        assert!(status.error.unwrap().contains("SavedSearch"));
    }
}
