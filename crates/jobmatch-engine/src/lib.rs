//! Jobmatch engine - vacancy ingestion and profile matching pipeline
//!
//! This crate is the core of the job-matching service: a polite crawler for
//! an external job board, an HTML description parser, a requirement
//! extractor, an embedding subsystem with a pluggable provider, a two-layer
//! matching engine, and a durable task runtime that ties them together.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   pages    ┌───────────────┐   parse/extract   ┌─────────┐
//! │ HhClient │ ─────────▶ │ IngestService │ ────────────────▶ │  store  │
//! └──────────┘            └───────────────┘     (UPSERT)      │ (SQLite)│
//!                                 │                           └─────────┘
//!                                 ▼ embedding tasks                │
//!                         ┌───────────────┐                        │
//!                         │  TaskQueue /  │    vectors             ▼
//!                         │    Worker     │ ─────────▶ ┌────────────────┐
//!                         └───────────────┘            │  VectorStore   │
//!                                 │                    └────────────────┘
//!                                 ▼ recommendations            │ k-NN
//!                         ┌────────────────┐ ◀─────────────────┘
//!                         │ MatchingEngine │ ──▶ scores + evidence
//!                         └────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use jobmatch_engine::config::AppConfig;
//! use jobmatch_engine::matching::MatchingEngine;
//! use jobmatch_engine::store::Database;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = AppConfig::from_env()?;
//! let db = Database::connect(&config.database_url).await?;
//!
//! let engine = MatchingEngine::new(db, config.embedding.dimension);
//! let scores = engine.compute_recommendations(1, 50).await?;
//! println!("scored {} vacancies", scores.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Feature flags
//!
//! - `fastembed`: local ONNX embedding models
//! - `openai`: OpenAI embeddings API provider

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod hh;
pub mod ingest;
pub mod matching;
pub mod parser;
pub mod requirements;
pub mod store;
pub mod tasks;
pub mod text;
pub mod vector_store;

pub use config::AppConfig;
pub use errors::{EngineError, Result};

pub use embeddings::{create_provider, global_provider, EmbeddingProvider, HashingProvider};
pub use hh::{HhApiError, HhClient, SearchQuery};
pub use ingest::{reprocess_vacancy, ImportFilters, ImportReport, IngestService};
pub use matching::{Explanation, MatchingEngine, TailoringBundle, Verdict};
pub use parser::{parse_description, ParsedDescription, ParsedSections, PARSER_VERSION};
pub use requirements::{ExtractedRequirement, RequirementKind};
pub use store::Database;
pub use tasks::{
    BeatScheduler, TaskContext, TaskId, TaskKind, TaskQueue, TaskRequest, TaskState, TaskStatus,
    Worker, WorkerConfig,
};
pub use text::strip_html;
pub use vector_store::{
    cosine_similarity, InMemoryVectorStore, SearchHit, SqliteVectorStore, VectorStore,
};
