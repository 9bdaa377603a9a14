//! Integration tests for the login/logout flow.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_login_success() {
    let server = helpers::TestServer::start().await;

    let response = server
        .request(
            "POST",
            "/login",
            Some(json!({ "username": "alice", "password": helpers::PASSWORD })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let cookie = response.set_cookie.unwrap();
    assert!(cookie.starts_with("SESSION="));
    assert!(cookie.contains("HttpOnly"));
    assert_eq!(response.body["data"]["username"], "alice");
    server.stop().await;
}

#[tokio::test]
async fn test_login_invalid_password() {
    let server = helpers::TestServer::start().await;

    let response = server
        .request(
            "POST",
            "/login",
            Some(json!({ "username": "alice", "password": "wrong" })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.set_cookie.is_none());
    server.stop().await;
}

#[tokio::test]
async fn test_logout_ends_session() {
    let server = helpers::TestServer::start().await;
    let cookie = server.login("bob").await;

    let presence = server
        .request("GET", "/api/presence", None, Some(&cookie))
        .await;
    assert_eq!(presence.status, StatusCode::OK);

    let logout = server.request("POST", "/logout", None, Some(&cookie)).await;
    assert_eq!(logout.status, StatusCode::OK);

    let presence = server
        .request("GET", "/api/presence", None, Some(&cookie))
        .await;
    assert_eq!(presence.status, StatusCode::UNAUTHORIZED);
    server.stop().await;
}

#[tokio::test]
async fn test_health_check() {
    let server = helpers::TestServer::start().await;

    let response = server.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
    server.stop().await;
}
