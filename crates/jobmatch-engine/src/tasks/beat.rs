//! Beat scheduler
//!
//! Fires [`TaskKind::SyncAllSavedSearches`] on a cron schedule. Ticks are
//! not ordered across hosts; each fired sync task is independent.

use std::str::FromStr;

use chrono::Utc;
use cron::Schedule;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::queue::TaskQueue;
use super::types::{TaskKind, TaskRequest};
use crate::errors::{EngineError, Result};

#[derive(Debug)]
pub struct BeatScheduler {
    queue: TaskQueue,
    schedule: Schedule,
    shutdown_tx: broadcast::Sender<()>,
}

impl BeatScheduler {
    /// Build a scheduler from a cron expression (seconds-resolution syntax,
    /// e.g. `0 */5 * * * *` for every five minutes).
    pub fn new(queue: TaskQueue, cron_expr: &str) -> Result<Self> {
        let schedule = Schedule::from_str(cron_expr).map_err(|e| {
            EngineError::Config(format!("Invalid beat cron expression {cron_expr:?}: {e}"))
        })?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            queue,
            schedule,
            shutdown_tx,
        })
    }

    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Tick loop: sleep until the next cron occurrence, enqueue the sync
    /// fan-out task, repeat.
    pub async fn run(&self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        info!("beat scheduler started");

        loop {
            let Some(next) = self.schedule.upcoming(Utc).next() else {
                warn!("cron schedule has no upcoming occurrence, stopping beat");
                return;
            };

            let wait = (next - Utc::now()).to_std().unwrap_or_default();
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown_rx.recv() => break,
            }

            if let Err(err) = self.tick().await {
                warn!(error = %err, "beat tick failed");
            }
        }

        info!("beat scheduler stopped");
    }

    /// One tick: enqueue the saved-search fan-out.
    pub async fn tick(&self) -> Result<()> {
        let task_id = self
            .queue
            .enqueue(TaskRequest::new(TaskKind::SyncAllSavedSearches))
            .await?;
        info!(task_id = %task_id, "beat tick enqueued saved-search sync");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;
    use crate::tasks::TaskState;

    #[tokio::test]
    async fn test_invalid_cron_is_config_error() {
        let db = Database::connect_in_memory().await.unwrap();
        let queue = TaskQueue::new(db);
        let err = BeatScheduler::new(queue, "not a cron").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[tokio::test]
    async fn test_tick_enqueues_fanout() {
        let db = Database::connect_in_memory().await.unwrap();
        let queue = TaskQueue::new(db);
        let beat = BeatScheduler::new(queue.clone(), "0 */5 * * * *").unwrap();

        beat.tick().await.unwrap();

        assert_eq!(queue.pending_count().await.unwrap(), 1);
        let task = queue.claim("w").await.unwrap().unwrap();
        assert_eq!(task.name, "sync_all_saved_searches");
        assert_eq!(task.state, TaskState::Running);
    }
}
