//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use presencehub_api::{AppState, build_app, build_state, serve};
use presencehub_auth::PasswordHasher;
use presencehub_core::config::AppConfig;
use presencehub_core::config::auth::UserCredentialConfig;

/// Password of every test account.
pub const PASSWORD: &str = "secret";

/// Client side of a websocket connection.
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long to wait for an expected frame.
const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

fn password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| {
        PasswordHasher::new()
            .hash_password(PASSWORD)
            .expect("Failed to hash test password")
    })
}

/// Configuration with accounts alice, bob and carol.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.auth.users = ["alice", "bob", "carol"]
        .into_iter()
        .map(|username| UserCredentialConfig {
            username: username.to_string(),
            password_hash: password_hash().to_string(),
            authorities: vec!["ROLE_USER".to_string()],
        })
        .collect();
    config
}

/// HTTP response captured for assertions.
pub struct TestResponse {
    /// Status code
    pub status: StatusCode,
    /// `Set-Cookie` header, if any
    pub set_cookie: Option<String>,
    /// JSON body, `Null` when empty
    pub body: Value,
}

/// Server bound to an ephemeral port.
pub struct TestServer {
    /// Listening address
    pub addr: SocketAddr,
    /// Shared state, for direct inspection
    pub state: AppState,
    router: Router,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Starts a server with [`test_config`].
    pub async fn start() -> Self {
        Self::start_with(test_config()).await
    }

    /// Starts a server with the given configuration.
    pub async fn start_with(config: AppConfig) -> Self {
        let state = build_state(config).await.expect("Failed to build state");
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("No local address");

        let (tx, rx) = oneshot::channel::<()>();
        let server_state = state.clone();
        let task = tokio::spawn(async move {
            serve(listener, server_state, async {
                let _ = rx.await;
            })
            .await
            .expect("Server failed");
        });

        Self {
            addr,
            router: build_app(state.clone()),
            state,
            shutdown: Some(tx),
            task: Some(task),
        }
    }

    /// Sends an HTTP request through the router sharing this server's state.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            set_cookie,
            body,
        }
    }

    /// Logs in and returns the `SESSION=<id>` cookie pair.
    pub async fn login(&self, username: &str) -> String {
        let response = self
            .request(
                "POST",
                "/login",
                Some(json!({ "username": username, "password": PASSWORD })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {:?}", response.body);
        let set_cookie = response.set_cookie.expect("No session cookie");
        set_cookie
            .split(';')
            .next()
            .expect("Empty cookie")
            .to_string()
    }

    /// Opens a websocket with the given cookie.
    pub async fn open_ws(
        &self,
        cookie: Option<&str>,
    ) -> Result<WsClient, tokio_tungstenite::tungstenite::Error> {
        self.open_ws_from(cookie, None).await
    }

    /// Opens a websocket with the given cookie and `Origin` header.
    pub async fn open_ws_from(
        &self,
        cookie: Option<&str>,
        origin: Option<&str>,
    ) -> Result<WsClient, tokio_tungstenite::tungstenite::Error> {
        let mut request = format!("ws://{}/messages", self.addr)
            .into_client_request()
            .expect("Invalid websocket url");
        if let Some(cookie) = cookie {
            request.headers_mut().insert(
                "cookie",
                HeaderValue::from_str(cookie).expect("Invalid cookie"),
            );
        }
        if let Some(origin) = origin {
            request.headers_mut().insert(
                "origin",
                HeaderValue::from_str(origin).expect("Invalid origin"),
            );
        }
        let (ws, _) = tokio_tungstenite::connect_async(request).await?;
        Ok(ws)
    }

    /// Logs in, opens a websocket and completes the CONNECT handshake.
    pub async fn connect(&self, username: &str) -> (String, WsClient) {
        let cookie = self.login(username).await;
        let mut ws = self.open_ws(Some(&cookie)).await.expect("Upgrade failed");
        send_frame(&mut ws, json!({ "command": "CONNECT" })).await;
        let connected = next_frame(&mut ws).await;
        assert_eq!(connected["command"], "CONNECTED");
        assert_eq!(connected["user"], username);
        (cookie, ws)
    }

    /// Stops the server and waits for it to exit.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = tokio::time::timeout(FRAME_TIMEOUT, task).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Sends one JSON frame.
pub async fn send_frame(ws: &mut WsClient, frame: Value) {
    ws.send(Message::text(frame.to_string()))
        .await
        .expect("Failed to send frame");
}

/// Subscribes with `id` to `destination`.
pub async fn subscribe(ws: &mut WsClient, id: &str, destination: &str) {
    send_frame(
        ws,
        json!({ "command": "SUBSCRIBE", "id": id, "destination": destination }),
    )
    .await;
}

/// Next non-heartbeat frame; panics on timeout or close.
pub async fn next_frame(ws: &mut WsClient) -> Value {
    loop {
        let message = tokio::time::timeout(FRAME_TIMEOUT, ws.next())
            .await
            .expect("Timed out waiting for frame")
            .expect("Socket closed")
            .expect("Socket error");
        if let Message::Text(text) = message {
            let frame: Value = serde_json::from_str(text.as_str()).expect("Invalid frame");
            if frame["command"] != "HEARTBEAT" {
                return frame;
            }
        }
    }
}

/// Asserts that no non-heartbeat frame arrives within `window`.
pub async fn expect_silence(ws: &mut WsClient, window: Duration) {
    let deadline = tokio::time::Instant::now() + window;
    loop {
        match tokio::time::timeout_at(deadline, ws.next()).await {
            Err(_) => return,
            Ok(Some(Ok(Message::Text(text)))) => {
                let frame: Value = serde_json::from_str(text.as_str()).expect("Invalid frame");
                assert_eq!(frame["command"], "HEARTBEAT", "unexpected frame: {frame}");
            }
            Ok(Some(Ok(_))) => {}
            Ok(other) => panic!("socket ended: {other:?}"),
        }
    }
}

/// Waits until the server closes the socket.
pub async fn expect_closed(ws: &mut WsClient) {
    loop {
        match tokio::time::timeout(FRAME_TIMEOUT, ws.next())
            .await
            .expect("Socket was not closed")
        {
            None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
            Some(Ok(_)) => {}
        }
    }
}
