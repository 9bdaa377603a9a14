//! Integration tests for websocket presence and messaging.

mod helpers;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use helpers::{expect_closed, expect_silence, next_frame, send_frame, subscribe};

const SIGNIN: &str = "/topic/friends/signin";
const SIGNOUT: &str = "/topic/friends/signout";

#[tokio::test]
async fn test_ws_upgrade_without_session() {
    let server = helpers::TestServer::start().await;

    let result = server.open_ws(None).await;
    match result {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status().as_u16(), StatusCode::UNAUTHORIZED.as_u16());
        }
        other => panic!("expected HTTP 401, got {:?}", other.map(|_| ())),
    }

    let stale = server.open_ws(Some("SESSION=not-a-session")).await;
    assert!(stale.is_err());
    server.stop().await;
}

#[tokio::test]
async fn test_ws_upgrade_from_foreign_origin() {
    let server = helpers::TestServer::start().await;
    let cookie = server.login("alice").await;

    let result = server
        .open_ws_from(Some(&cookie), Some("http://evil.example"))
        .await;
    match result {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status().as_u16(), StatusCode::FORBIDDEN.as_u16());
        }
        other => panic!("expected HTTP 403, got {:?}", other.map(|_| ())),
    }
    assert_eq!(server.state.realtime.connections.connection_count(), 0);

    let own = format!("http://{}", server.addr);
    let mut ws = server
        .open_ws_from(Some(&cookie), Some(&own))
        .await
        .expect("same-origin upgrade failed");
    send_frame(&mut ws, json!({ "command": "CONNECT" })).await;
    assert_eq!(next_frame(&mut ws).await["command"], "CONNECTED");
    server.stop().await;
}

#[tokio::test]
async fn test_ws_upgrade_from_listed_origin() {
    let mut config = helpers::test_config();
    config.server.allowed_origins = vec!["https://app.example".to_string()];
    let server = helpers::TestServer::start_with(config).await;
    let cookie = server.login("bob").await;

    let ws = server
        .open_ws_from(Some(&cookie), Some("https://app.example"))
        .await;
    assert!(ws.is_ok());
    server.stop().await;
}

#[tokio::test]
async fn test_presence_online_then_offline() {
    let server = helpers::TestServer::start().await;
    let (_, mut alice) = server.connect("alice").await;
    subscribe(&mut alice, "in", SIGNIN).await;
    subscribe(&mut alice, "out", SIGNOUT).await;
    expect_silence(&mut alice, Duration::from_millis(100)).await;

    let (_, bob) = server.connect("bob").await;
    let online = next_frame(&mut alice).await;
    assert_eq!(online["command"], "MESSAGE");
    assert_eq!(online["subscription"], "in");
    assert_eq!(online["body"]["type"], "ONLINE");
    assert_eq!(online["body"]["username"], "bob");

    drop(bob);
    let offline = next_frame(&mut alice).await;
    assert_eq!(offline["subscription"], "out");
    assert_eq!(offline["body"]["type"], "OFFLINE");
    assert_eq!(offline["body"]["username"], "bob");

    expect_silence(&mut alice, Duration::from_millis(300)).await;
    server.stop().await;
}

#[tokio::test]
async fn test_forged_presence_is_denied_silently() {
    let server = helpers::TestServer::start().await;
    let (_, mut alice) = server.connect("alice").await;
    subscribe(&mut alice, "in", SIGNIN).await;
    let (_, mut bob) = server.connect("bob").await;
    next_frame(&mut alice).await;

    send_frame(
        &mut bob,
        json!({
            "command": "SEND",
            "destination": SIGNIN,
            "body": { "type": "ONLINE", "username": "mallory" }
        }),
    )
    .await;

    expect_silence(&mut alice, Duration::from_millis(300)).await;
    expect_silence(&mut bob, Duration::from_millis(100)).await;
    assert_eq!(server.state.realtime.metrics.snapshot().messages_denied, 1);
    server.stop().await;
}

#[tokio::test]
async fn test_instant_message() {
    let server = helpers::TestServer::start().await;
    let (_, mut alice) = server.connect("alice").await;
    let (_, mut bob) = server.connect("bob").await;
    subscribe(&mut alice, "im", "/user/queue/messages").await;
    subscribe(&mut bob, "im", "/user/queue/messages").await;
    expect_silence(&mut bob, Duration::from_millis(100)).await;

    send_frame(
        &mut bob,
        json!({
            "command": "SEND",
            "destination": "/app/im",
            "body": { "to": "alice", "message": "hi alice" }
        }),
    )
    .await;

    for ws in [&mut alice, &mut bob] {
        let frame = next_frame(ws).await;
        assert_eq!(frame["command"], "MESSAGE");
        assert_eq!(frame["body"]["from"], "bob");
        assert_eq!(frame["body"]["to"], "alice");
        assert_eq!(frame["body"]["message"], "hi alice");
    }
    server.stop().await;
}

#[tokio::test]
async fn test_online_users_command() {
    let server = helpers::TestServer::start().await;
    let (_, mut alice) = server.connect("alice").await;
    let (_, _bob) = server.connect("bob").await;

    subscribe(&mut alice, "users", "/app/users").await;

    let frame = next_frame(&mut alice).await;
    assert_eq!(frame["subscription"], "users");
    assert_eq!(frame["body"], json!(["alice", "bob"]));
    server.stop().await;
}

#[tokio::test]
async fn test_multi_device_presence() {
    let server = helpers::TestServer::start().await;
    let (cookie, mut alice) = server.connect("alice").await;
    subscribe(&mut alice, "in", SIGNIN).await;
    expect_silence(&mut alice, Duration::from_millis(100)).await;

    let (_, _laptop) = server.connect("carol").await;
    let (_, _phone) = server.connect("carol").await;

    for _ in 0..2 {
        assert_eq!(next_frame(&mut alice).await["body"]["username"], "carol");
    }

    let presence = server
        .request("GET", "/api/presence", None, Some(&cookie))
        .await;
    let users = presence.body["data"]["users"].as_array().unwrap().clone();
    let carol = users.iter().find(|u| u["username"] == "carol").unwrap();
    assert_eq!(carol["sessions"], 2);
    server.stop().await;
}

#[tokio::test]
async fn test_logout_closes_open_connection() {
    let server = helpers::TestServer::start().await;
    let (_, mut alice) = server.connect("alice").await;
    subscribe(&mut alice, "out", SIGNOUT).await;
    let (bob_cookie, mut bob) = server.connect("bob").await;

    let logout = server.request("POST", "/logout", None, Some(&bob_cookie)).await;
    assert_eq!(logout.status, StatusCode::OK);

    let error = next_frame(&mut bob).await;
    assert_eq!(error["command"], "ERROR");
    expect_closed(&mut bob).await;

    let offline = next_frame(&mut alice).await;
    assert_eq!(offline["body"]["username"], "bob");
    server.stop().await;
}

#[tokio::test]
async fn test_disconnect_with_receipt() {
    let server = helpers::TestServer::start().await;
    let (_, mut alice) = server.connect("alice").await;

    send_frame(&mut alice, json!({ "command": "DISCONNECT", "receipt": "bye" })).await;

    let receipt = next_frame(&mut alice).await;
    assert_eq!(receipt["command"], "RECEIPT");
    assert_eq!(receipt["receipt_id"], "bye");
    expect_closed(&mut alice).await;
    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_closes_connections() {
    let server = helpers::TestServer::start().await;
    let (_, mut alice) = server.connect("alice").await;
    let realtime = server.state.realtime.clone();

    server.stop().await;

    expect_closed(&mut alice).await;
    assert_eq!(realtime.connections.connection_count(), 0);
    assert!(realtime.presence.is_empty());
}
