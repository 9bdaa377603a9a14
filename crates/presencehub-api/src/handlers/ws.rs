//! WebSocket upgrade handler.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use presencehub_core::error::AppError;
use presencehub_core::types::SessionData;
use presencehub_realtime::connection::{HeartbeatConfig, run_heartbeat};
use presencehub_realtime::message::ServerFrame;
use presencehub_realtime::{ConnectionGuard, FrameOutcome};

use crate::error::ApiResult;
use crate::extractors::AuthSession;
use crate::middleware::origin::origin_allowed;
use crate::state::AppState;

/// How long the writer may take to flush after the reader stops.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// GET /messages: websocket upgrade for an authenticated session.
///
/// A missing or dead session is rejected with 401 and a foreign `Origin`
/// with 403, both before the upgrade.
pub async fn ws_handler(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    if !origin_allowed(&headers, &state.config.server) {
        warn!(
            session_id = %session.id,
            origin = ?headers.get(axum::http::header::ORIGIN),
            "WebSocket upgrade from disallowed origin"
        );
        return Err(AppError::authorization("Origin not allowed").into());
    }

    Ok(ws.on_upgrade(move |socket| handle_ws_connection(state, session, socket)))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, session: SessionData, socket: WebSocket) {
    let manager = state.realtime.connections.clone();
    let (handle, outbound_rx) = manager.open(&session);
    // releases the connection on every exit path, including task cancellation
    let _guard = ConnectionGuard::new(manager.clone(), handle.id);
    let cancel = handle.cancel_token();

    info!(
        conn_id = %handle.id,
        session_id = %session.id,
        username = %session.principal,
        "WebSocket connection established"
    );

    let (ws_tx, mut ws_rx) = socket.split();
    let writer = tokio::spawn(forward_outbound(ws_tx, outbound_rx, cancel.clone()));
    let heartbeat = tokio::spawn(run_heartbeat(
        handle.clone(),
        HeartbeatConfig::from(manager.config()),
    ));

    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            message = ws_rx.next() => message,
        };

        match message {
            Some(Ok(Message::Text(text))) => {
                if manager.handle_text(&handle, text.as_str()).await == FrameOutcome::Close {
                    break;
                }
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => handle.record_activity(),
            Some(Ok(Message::Binary(_))) => {
                handle.record_activity();
                handle.send(ServerFrame::error("Binary frames are not supported"));
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Err(e)) => {
                warn!(conn_id = %handle.id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    manager.disconnect(&handle.id).await;

    match heartbeat.await {
        Ok(exit) => debug!(conn_id = %handle.id, exit = ?exit, "Heartbeat stopped"),
        Err(e) => error!(conn_id = %handle.id, error = %e, "Heartbeat task failed"),
    }

    let writer_abort = writer.abort_handle();
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await.is_err() {
        warn!(conn_id = %handle.id, "Outbound writer did not drain in time");
        writer_abort.abort();
    }

    info!(conn_id = %handle.id, session_id = %session.id, "WebSocket connection closed");
}

/// Serializes queued frames onto the socket until the connection is closed.
///
/// Frames queued before the close (a RECEIPT, an expiry ERROR) are still sent.
async fn forward_outbound(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<ServerFrame>,
    cancel: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            biased;
            frame = outbound_rx.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
            _ = cancel.cancelled() => break,
        };

        let text = match serde_json::to_string(&frame) {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Failed to serialize outbound frame");
                continue;
            }
        };
        if ws_tx.send(Message::Text(text.into())).await.is_err() {
            return;
        }
    }

    let _ = ws_tx.send(Message::Close(None)).await;
}
