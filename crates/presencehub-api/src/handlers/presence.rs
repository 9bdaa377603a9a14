//! Presence handlers.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{ApiResponse, PresenceResponse};
use crate::extractors::AuthSession;
use crate::state::AppState;

/// GET /api/presence
pub async fn online_users(
    State(state): State<AppState>,
    _auth: AuthSession,
) -> Json<ApiResponse<PresenceResponse>> {
    let presence = &state.realtime.presence;
    Json(ApiResponse::ok(PresenceResponse {
        users: presence.online_users(),
        sessions: presence.len(),
    }))
}
