//! Integration tests for the issue API over an on-disk SQLite database

use axum::http::StatusCode;
use axum_test::TestServer;
use itrack::domain::{Issue, IssuePage, User};
use itrack::{IssueService, SqliteStorage};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

/// Helper to create a test server over a fresh database with two users
fn create_test_server() -> (TestServer, TempDir) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let storage = SqliteStorage::open(temp.path().join("itrack.db")).expect("Failed to open db");
    for (id, name) in [("u7", "Ada"), ("u8", "Grace")] {
        storage
            .insert_user(&User {
                id: id.to_string(),
                name: name.to_string(),
                email: format!("{}@example.com", id),
            })
            .expect("Failed to seed user");
    }

    let app = itrack_server::create_routes(Arc::new(IssueService::new(storage)));
    let server = TestServer::new(app).expect("Failed to create test server");
    (server, temp)
}

#[tokio::test]
async fn test_issue_lifecycle() {
    let (server, _temp) = create_test_server();

    let response = server
        .post("/issues")
        .json(&json!({"title": "Bug A", "description": "It breaks"}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: Issue = response.json();
    assert_eq!(created.id, 1);
    assert_eq!(created.assigned_to_user_id, None);

    let response = server
        .patch("/issues/1")
        .json(&json!({"assignedToUserId": "u7"}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["assignedToUserId"], "u7");
    assert_eq!(body["status"], "OPEN");

    let response = server
        .patch("/issues/1")
        .json(&json!({"assignedToUserId": "u999"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["fieldErrors"]["assignedToUserId"][0], "Invalid user.");

    let still: Issue = server.get("/issues/1").await.json();
    assert_eq!(still.assigned_to_user_id.as_deref(), Some("u7"));

    server
        .delete("/issues/1")
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server.get("/issues/1").await.assert_status_not_found();
    server.delete("/issues/1").await.assert_status_not_found();
}

#[tokio::test]
async fn test_unassign_with_null() {
    let (server, _temp) = create_test_server();
    server
        .post("/issues")
        .json(&json!({"title": "T", "description": "D", "assignedToUserId": "u8"}))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .patch("/issues/1")
        .json(&json!({"assignedToUserId": null}))
        .await;
    response.assert_status_ok();
    let issue: Issue = response.json();
    assert_eq!(issue.assigned_to_user_id, None);
}

#[tokio::test]
async fn test_list_pagination_and_filters() {
    let (server, _temp) = create_test_server();
    for n in 1..=12 {
        let status = if n % 3 == 0 { "CLOSED" } else { "OPEN" };
        server
            .post("/issues")
            .json(&json!({"title": format!("Issue {:02}", n), "description": "d", "status": status}))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let first: IssuePage = server.get("/issues").await.json();
    assert_eq!(first.total, 12);
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.page_count, 2);
    // newest first
    assert_eq!(first.items[0].title, "Issue 12");

    let second: IssuePage = server
        .get("/issues")
        .add_query_param("page", 2)
        .await
        .json();
    assert_eq!(second.items.len(), 2);

    let closed: IssuePage = server
        .get("/issues")
        .add_query_param("status", "CLOSED")
        .add_query_param("orderBy", "title")
        .await
        .json();
    assert_eq!(closed.total, 4);
    let titles: Vec<_> = closed.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, ["Issue 03", "Issue 06", "Issue 09", "Issue 12"]);

    let small: IssuePage = server
        .get("/issues")
        .add_query_param("pageSize", 5)
        .await
        .json();
    assert_eq!(small.items.len(), 5);
    assert_eq!(small.page_count, 3);
}

#[tokio::test]
async fn test_status_summary_after_updates() {
    let (server, _temp) = create_test_server();
    for title in ["A", "B"] {
        server
            .post("/issues")
            .json(&json!({"title": title, "description": "d"}))
            .await
            .assert_status(StatusCode::CREATED);
    }
    server
        .patch("/issues/2")
        .json(&json!({"status": "IN_PROGRESS"}))
        .await
        .assert_status_ok();

    let response = server.get("/status").await;
    response.assert_status_ok();
    response.assert_json(&json!({"open": 1, "inProgress": 1, "closed": 0, "total": 2}));
}

#[tokio::test]
async fn test_invalid_patch_reports_every_field() {
    let (server, _temp) = create_test_server();
    server
        .post("/issues")
        .json(&json!({"title": "A", "description": "d"}))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .patch("/issues/1")
        .json(&json!({"title": "", "status": "DONE"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["fieldErrors"]["title"].is_array());
    assert!(body["fieldErrors"]["status"].is_array());
}

#[tokio::test]
async fn test_list_rejects_bad_query_values() {
    let (server, _temp) = create_test_server();

    let response = server.get("/issues").add_query_param("status", "DONE").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("DONE"));

    server
        .get("/issues")
        .add_query_param("orderBy", "priority")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .get("/issues")
        .add_query_param("page", "abc")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
