//! Auth handlers: login and logout over the session cookie.

use axum::Json;
use axum::extract::State;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use tracing::{info, warn};

use crate::dto::response::{ApiResponse, LoginResponse, MessageResponse};
use crate::error::ApiResult;
use crate::extractors::{LoginForm, session_cookie};
use crate::state::AppState;

/// POST /login
///
/// Authenticates the credentials and issues a fresh session. A session the
/// caller already held is invalidated first, which closes its connections.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    LoginForm(req): LoginForm,
) -> ApiResult<(CookieJar, Json<ApiResponse<LoginResponse>>)> {
    let principal = state
        .authenticator
        .authenticate(&req.username, &req.password)
        .await?;

    if let Some(previous) = session_cookie(&jar, state.cookie_name()) {
        if let Err(e) = state.realtime.bridge.invalidate(&previous).await {
            warn!(session_id = %previous, error = %e, "Failed to invalidate previous session");
        }
    }

    let session = state.sessions.create(principal).await?;

    info!(
        username = %session.principal,
        session_id = %session.id,
        "User logged in"
    );

    let cookie = Cookie::build((state.cookie_name().to_string(), session.id.to_string()))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .build();

    let body = LoginResponse {
        username: session.principal.username.clone(),
        authorities: session.principal.authorities.iter().cloned().collect(),
        expires_in_seconds: session.max_inactive_seconds,
    };

    Ok((jar.add(cookie), Json(ApiResponse::ok(body))))
}

/// POST /logout
///
/// Invalidates the session named by the cookie, if any, and clears the cookie.
/// Open connections of that session go through the expiry path.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<ApiResponse<MessageResponse>>)> {
    if let Some(session_id) = session_cookie(&jar, state.cookie_name()) {
        state.realtime.bridge.invalidate(&session_id).await?;
        info!(session_id = %session_id, "User logged out");
    }

    let removal = Cookie::build(state.cookie_name().to_string())
        .path("/")
        .build();

    Ok((
        jar.remove(removal),
        Json(ApiResponse::ok(MessageResponse {
            message: "Logged out successfully".to_string(),
        })),
    ))
}
