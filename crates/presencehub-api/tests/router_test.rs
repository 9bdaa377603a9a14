//! HTTP surface driven through the router without a socket.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use presencehub_api::{AppState, build_app, build_state};
use presencehub_auth::PasswordHasher;
use presencehub_core::config::AppConfig;
use presencehub_core::config::auth::UserCredentialConfig;

struct Reply {
    status: StatusCode,
    cookie: Option<String>,
    body: Value,
}

async fn test_state() -> AppState {
    let hasher = PasswordHasher::new();
    let mut config = AppConfig::default();
    config.auth.users = vec![UserCredentialConfig {
        username: "alice".to_string(),
        password_hash: hasher.hash_password("wonderland").unwrap(),
        authorities: vec!["ROLE_USER".to_string()],
    }];
    build_state(config).await.unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Reply {
        status,
        cookie,
        body,
    }
}

fn json_login(username: &str, password: &str) -> Request<Body> {
    Request::post("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"username": username, "password": password}).to_string(),
        ))
        .unwrap()
}

fn session_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn test_json_login_sets_session_cookie() {
    let app = build_app(test_state().await);

    let reply = send(&app, json_login("alice", "wonderland")).await;

    assert_eq!(reply.status, StatusCode::OK);
    let cookie = reply.cookie.expect("session cookie");
    assert!(cookie.starts_with("SESSION="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));
    assert_eq!(reply.body["data"]["username"], "alice");
}

#[tokio::test]
async fn test_form_login() {
    let app = build_app(test_state().await);

    let request = Request::post("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=alice&password=wonderland"))
        .unwrap();
    let reply = send(&app, request).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.cookie.is_some());
}

#[tokio::test]
async fn test_bad_credentials_rejected() {
    let app = build_app(test_state().await);

    let wrong_password = send(&app, json_login("alice", "nope")).await;
    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert!(wrong_password.cookie.is_none());

    let unknown = send(&app, json_login("mallory", "wonderland")).await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.body["message"], wrong_password.body["message"]);
}

#[tokio::test]
async fn test_presence_requires_session() {
    let app = build_app(test_state().await);

    let anonymous = send(
        &app,
        Request::get("/api/presence").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let login = send(&app, json_login("alice", "wonderland")).await;
    let cookie = session_pair(&login.cookie.unwrap());
    let reply = send(
        &app,
        Request::get("/api/presence")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["sessions"], 0);
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let state = test_state().await;
    let app = build_app(state.clone());

    let login = send(&app, json_login("alice", "wonderland")).await;
    let cookie = session_pair(&login.cookie.unwrap());

    let logout = send(
        &app,
        Request::post("/logout")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(logout.status, StatusCode::OK);
    assert!(logout.cookie.unwrap().starts_with("SESSION="));

    let after = send(
        &app,
        Request::get("/api/presence")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_relogin_replaces_previous_session() {
    let app = build_app(test_state().await);

    let first = session_pair(&send(&app, json_login("alice", "wonderland")).await.cookie.unwrap());

    let mut relogin = json_login("alice", "wonderland");
    relogin
        .headers_mut()
        .insert(header::COOKIE, first.parse().unwrap());
    let second = session_pair(&send(&app, relogin).await.cookie.unwrap());
    assert_ne!(first, second);

    let stale = send(
        &app,
        Request::get("/api/presence")
            .header(header::COOKIE, &first)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_websocket_endpoint_requires_session() {
    let app = build_app(test_state().await);

    let reply = send(
        &app,
        Request::get("/messages").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = build_app(test_state().await);

    let basic = send(&app, Request::get("/api/health").body(Body::empty()).unwrap()).await;
    assert_eq!(basic.status, StatusCode::OK);
    assert_eq!(basic.body["data"]["status"], "ok");

    let detailed = send(
        &app,
        Request::get("/api/health/detailed")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(detailed.status, StatusCode::OK);
    assert_eq!(detailed.body["data"]["cache"], "connected");
    assert_eq!(detailed.body["data"]["ws_connections"], 0);
    assert!(detailed.body["data"]["metrics"].is_object());
}
