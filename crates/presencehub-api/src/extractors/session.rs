//! `AuthSession` extractor: resolves the session cookie to a live session.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use presencehub_core::error::AppError;
use presencehub_core::types::{SessionData, SessionId};

use crate::error::ApiError;
use crate::state::AppState;

/// The caller's live session.
///
/// Rejects with 401 when the cookie is missing, malformed, or names a
/// session that no longer exists. A successful extraction extends the
/// session's idle timeout.
#[derive(Debug, Clone)]
pub struct AuthSession(pub SessionData);

impl std::ops::Deref for AuthSession {
    type Target = SessionData;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Session id carried by the named cookie, if present and well-formed.
pub fn session_cookie(jar: &CookieJar, name: &str) -> Option<SessionId> {
    jar.get(name).and_then(|cookie| cookie.value().parse().ok())
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let session_id = session_cookie(&jar, state.cookie_name())
            .ok_or_else(|| AppError::authentication("Missing session cookie"))?;

        let session = state
            .sessions
            .get(&session_id)
            .await?
            .ok_or_else(|| AppError::authentication("Session expired or invalid"))?;

        if !state.sessions.touch(&session_id).await? {
            return Err(AppError::authentication("Session expired or invalid").into());
        }

        Ok(AuthSession(session))
    }
}
