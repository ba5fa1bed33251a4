//! Task runtime
//!
//! Named tasks over a durable queue (SQLite-backed, at-least-once), a beat
//! scheduler for periodic saved-search syncs, and immutable chains where a
//! failed step aborts the remainder.
//!
//! ```text
//! ┌───────────┐  enqueue   ┌───────────┐  claim   ┌──────────┐
//! │ HTTP/CLI  │ ─────────▶ │ TaskQueue │ ◀─────── │  Worker  │
//! │ BeatSched │            │ (tasks)   │  result  │  (loop)  │
//! └───────────┘            └───────────┘ ───────▶ └──────────┘
//! ```

mod beat;
mod handlers;
mod queue;
mod types;
mod worker;

pub use beat::BeatScheduler;
pub use handlers::{run_task, TaskContext};
pub use queue::TaskQueue;
pub use types::{Task, TaskId, TaskKind, TaskRequest, TaskState, TaskStatus};
pub use worker::{Worker, WorkerConfig};
