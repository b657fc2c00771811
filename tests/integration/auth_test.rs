//! Integration tests for account endpoints, presence, and health.

use axum::http::StatusCode;
use serde_json::json;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_signup_then_login() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "POST",
            "/api/auth/signup",
            Some(json!({"username": "alice", "password": "password123"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    assert_eq!(response.body["data"]["identity"], "alice");

    let response = app
        .request(
            "POST",
            "/api/auth/login",
            Some(json!({"username": "alice", "password": "password123"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["identity"], "alice");
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let app = TestApp::new().await;
    app.create_user("+15550100", "password123").await;

    let response = app
        .request(
            "POST",
            "/api/auth/signup",
            Some(json!({"username": "+15550100", "password": "another-pass"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "CONFLICT");
}

#[tokio::test]
async fn test_invalid_signup_is_bad_request() {
    let app = TestApp::new().await;

    for body in [
        json!({"username": "bob", "password": "short"}),
        json!({"username": "", "password": "password123"}),
        json!({"username": "bob smith", "password": "password123"}),
        json!({"username": "x".repeat(33), "password": "password123"}),
    ] {
        let response = app.request("POST", "/api/auth/signup", Some(body)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{:?}", response.body);
        assert_eq!(response.body["error"], "VALIDATION");
    }
}

#[tokio::test]
async fn test_login_failures_are_unauthorized() {
    let app = TestApp::new().await;
    app.create_user("alice", "password123").await;

    let wrong = app
        .request(
            "POST",
            "/api/auth/login",
            Some(json!({"username": "alice", "password": "password124"})),
        )
        .await;
    let unknown = app
        .request(
            "POST",
            "/api/auth/login",
            Some(json!({"username": "nobody", "password": "password123"})),
        )
        .await;

    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], unknown.body["message"]);
}

#[tokio::test]
async fn test_presence_starts_empty() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/presence", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["online"], json!([]));
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/health", None).await;
    assert_eq!(response.status, StatusCode::OK);

    let data = &response.body["data"];
    assert_eq!(data["status"], "ok");
    assert_eq!(data["database"], "connected");
    assert_eq!(data["ws_connections"], 0);
    assert_eq!(data["metrics"]["messages_appended"], 0);
}

#[tokio::test]
async fn test_ws_route_requires_upgrade() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/ws", None).await;
    assert!(
        response.status.is_client_error(),
        "Expected a 4xx for a plain GET, got {}",
        response.status
    );
}
