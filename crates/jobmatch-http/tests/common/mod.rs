//! Common test utilities for HTTP integration tests

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use jobmatch_engine::store::Database;
use jobmatch_engine::tasks::{TaskContext, Worker, WorkerConfig};
use jobmatch_engine::AppConfig;
use jobmatch_http::{AppState, HttpServerConfig};
use tower::ServiceExt;

/// Test app over an in-memory database.
pub struct TestApp {
    pub state: Arc<AppState>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::connect_in_memory().await.unwrap();
        let config = Arc::new(AppConfig::default());
        let http = HttpServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            enable_cors: false,
            enable_tracing: false,
        };
        let state = Arc::new(AppState::new(db, config, http));
        Self { state }
    }

    /// Send a request through the router and return status plus body bytes.
    pub async fn request(&self, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let app = jobmatch_http::routes::create_app(self.state.clone());
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Vec<u8>) {
        self.request(
            Request::builder()
                .method("GET")
                .uri(path)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post(&self, path: &str, body: &str) -> (StatusCode, Vec<u8>) {
        self.request(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn put(&self, path: &str, body: &str) -> (StatusCode, Vec<u8>) {
        self.request(
            Request::builder()
                .method("PUT")
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn patch(&self, path: &str, body: &str) -> (StatusCode, Vec<u8>) {
        self.request(
            Request::builder()
                .method("PATCH")
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn delete(&self, path: &str) -> (StatusCode, Vec<u8>) {
        self.request(
            Request::builder()
                .method("DELETE")
                .uri(path)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Run every queued task to completion with a one-shot worker.
    pub async fn drain_tasks(&self) -> usize {
        let ctx = TaskContext::new(
            self.state.db.clone(),
            self.state.config.clone(),
            self.state.queue.clone(),
        );
        let worker = Worker::new(
            ctx,
            WorkerConfig {
                worker_id: "test-worker".to_string(),
                poll_interval: std::time::Duration::from_millis(10),
            },
        );
        worker.drain().await
    }
}

pub fn parse_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> T {
    serde_json::from_slice(body).expect("failed to parse JSON response")
}
