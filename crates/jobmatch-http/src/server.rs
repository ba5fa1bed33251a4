//! HTTP server state and startup

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use jobmatch_engine::matching::MatchingEngine;
use jobmatch_engine::store::Database;
use jobmatch_engine::tasks::TaskQueue;
use jobmatch_engine::AppConfig;
use tracing::info;

use crate::routes::create_app;

/// Server settings.
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub enable_tracing: bool,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            enable_cors: true,
            enable_tracing: true,
        }
    }
}

/// Shared application state handed to every handler.
pub struct AppState {
    pub started_at: Instant,
    pub db: Database,
    pub queue: TaskQueue,
    pub config: Arc<AppConfig>,
    pub http: HttpServerConfig,
}

impl AppState {
    pub fn new(db: Database, config: Arc<AppConfig>, http: HttpServerConfig) -> Self {
        let queue = TaskQueue::new(db.clone());
        Self {
            started_at: Instant::now(),
            db,
            queue,
            config,
            http,
        }
    }

    /// Matching engine over the shared database.
    pub fn matching_engine(&self) -> MatchingEngine {
        MatchingEngine::new(self.db.clone(), self.config.embedding.dimension)
    }
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.http.host, state.http.port)
        .parse()
        .context("Invalid host/port")?;

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(%addr, "HTTP server listening");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
