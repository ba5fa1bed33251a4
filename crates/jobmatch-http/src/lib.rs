//! REST API for the jobmatch engine
//!
//! Thin axum layer over [`jobmatch_engine`]: CRUD for vacancies, profiles
//! and their sub-resources, import/sync task enqueueing, stored
//! recommendations, tailoring bundles and task polling. All business rules
//! live in the engine; handlers translate between HTTP and engine calls.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod types;

pub use server::{serve, AppState, HttpServerConfig};
pub use types::ApiError;
