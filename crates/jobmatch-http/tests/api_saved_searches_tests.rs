//! Saved-search and task endpoint tests

mod common;

use axum::http::StatusCode;
use common::{parse_json, TestApp};
use serde_json::Value;

#[tokio::test]
async fn test_saved_search_crud() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/v1/saved-searches",
            r#"{
                "text": "python backend",
                "area": "1",
                "salary_from": 200000,
                "currency": "RUR",
                "filters_json": {"professional_role": ["96", "104"], "only_with_salary": true},
                "per_page": 50,
                "pages_limit": 2
            }"#,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let search: Value = parse_json(&body);
    let id = search["id"].as_i64().unwrap();
    assert_eq!(search["cursor_page"], 0);
    assert_eq!(search["is_active"], true);
    assert_eq!(search["filters_json"]["only_with_salary"], true);

    let (status, body) = app.get("/api/v1/saved-searches").await;
    assert_eq!(status, StatusCode::OK);
    let listed: Vec<Value> = parse_json(&body);
    assert_eq!(listed.len(), 1);

    let (status, body) = app
        .patch(
            &format!("/api/v1/saved-searches/{id}"),
            r#"{"is_active": false, "pages_limit": 5}"#,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let updated: Value = parse_json(&body);
    assert_eq!(updated["is_active"], false);
    assert_eq!(updated["pages_limit"], 5);
    assert_eq!(updated["text"], "python backend");

    let (status, _) = app.delete(&format!("/api/v1/saved-searches/{id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_saved_search_requires_text() {
    let app = TestApp::new().await;
    let (status, _) = app
        .post("/api/v1/saved-searches", r#"{"text": "  "}"#)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_sync_enqueues_task() {
    let app = TestApp::new().await;

    let (_, body) = app
        .post("/api/v1/saved-searches", r#"{"text": "python"}"#)
        .await;
    let search: Value = parse_json(&body);
    let id = search["id"].as_i64().unwrap();

    let (status, body) = app
        .post(&format!("/api/v1/saved-searches/{id}/sync"), "")
        .await;
    assert_eq!(status, StatusCode::OK);
    let task: Value = parse_json(&body);
    let task_id = task["task_id"].as_str().unwrap().to_string();

    // The task is pending until a worker picks it up.
    let (status, body) = app.get(&format!("/api/v1/tasks/{task_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let task_status: Value = parse_json(&body);
    assert_eq!(task_status["state"], "pending");
}

#[tokio::test]
async fn test_sync_of_missing_search_is_404() {
    let app = TestApp::new().await;
    let (status, _) = app.post("/api/v1/saved-searches/999/sync", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_import_requires_text_and_returns_task() {
    let app = TestApp::new().await;

    let (status, _) = app.post("/api/v1/import/hh", r#"{"text": ""}"#).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app
        .post(
            "/api/v1/import/hh",
            r#"{"text": "rust developer", "pages_limit": 1}"#,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let task: Value = parse_json(&body);
    assert!(task["task_id"].as_str().is_some());
}

#[tokio::test]
async fn test_failed_task_surfaces_error() {
    let app = TestApp::new().await;

    // Import without HH_USER_AGENT configured fails at client construction;
    // the failure must land in the result store, not crash the worker.
    let (_, body) = app
        .post("/api/v1/import/hh", r#"{"text": "python"}"#)
        .await;
    let task: Value = parse_json(&body);
    let task_id = task["task_id"].as_str().unwrap().to_string();

    app.drain_tasks().await;

    let (status, body) = app.get(&format!("/api/v1/tasks/{task_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let task_status: Value = parse_json(&body);
    assert_eq!(task_status["state"], "failure");
    assert!(task_status["error"]
        .as_str()
        .unwrap()
        .contains("HH_USER_AGENT"));
}

#[tokio::test]
async fn test_unknown_task_is_404() {
    let app = TestApp::new().await;

    let (status, _) = app.get("/api/v1/tasks/not-a-uuid").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .get("/api/v1/tasks/00000000-0000-0000-0000-000000000000")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    let health: Value = parse_json(&body);
    assert_eq!(health["status"], "ok");
}
