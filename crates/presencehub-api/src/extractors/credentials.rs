//! `LoginForm` extractor: login credentials from a JSON or form body.

use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};

use presencehub_core::error::AppError;

use crate::dto::request::LoginRequest;
use crate::error::ApiError;

/// Credentials posted to `/login`.
///
/// `application/json` bodies are read as JSON, anything else as
/// `application/x-www-form-urlencoded`.
#[derive(Debug)]
pub struct LoginForm(pub LoginRequest);

impl<S> FromRequest<S> for LoginForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let request = if is_json {
            let Json(request) = Json::<LoginRequest>::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            request
        } else {
            let Form(request) = Form::<LoginRequest>::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            request
        };

        if request.username.trim().is_empty() {
            return Err(AppError::validation("Username is required").into());
        }
        Ok(LoginForm(request))
    }
}
