//! Job-board API client
//!
//! A polite, rate-limited client for the HH vacancy API. Each ingestion task
//! owns its own client (and therefore its own connection pool and timers);
//! parallelism comes from running multiple tasks, never from concurrency
//! inside one sync.

mod client;
mod types;

pub use client::{HhApiError, HhClient};
pub use types::{
    parse_published_at, HhKeySkill, HhNamed, HhSalary, HhSnippet, HhVacancy, SearchPage,
    SearchQuery,
};
