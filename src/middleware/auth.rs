use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::warn;

use crate::app_state::AppState;
use crate::catalog::dtos::ErrorResponse;

/// Extractor guarding the sync trigger routes. Succeeds only when the
/// request carries the basic-auth pair configured in [`AppState`].
pub struct BasicAuthed;

impl FromRequestParts<AppState> for BasicAuthed {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AuthError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;

        let encoded = header
            .strip_prefix("Basic ")
            .ok_or(AuthError::MissingCredentials)?;
        let decoded = BASE64
            .decode(encoded)
            .map_err(|_| AuthError::MalformedCredentials)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedCredentials)?;
        let (user, password) = decoded
            .split_once(':')
            .ok_or(AuthError::MalformedCredentials)?;

        let want = &state.basic_auth;
        if user != want.user || password != want.password {
            return Err(AuthError::WrongCredentials);
        }

        Ok(BasicAuthed)
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,
    MalformedCredentials,
    WrongCredentials,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let reason = match self {
            AuthError::MissingCredentials => "no basic auth header",
            AuthError::MalformedCredentials => "basic auth header does not decode",
            AuthError::WrongCredentials => "user or password does not match",
        };
        warn!("Rejected trigger request: {reason}");

        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Unauthorized".to_string(),
            }),
        )
            .into_response()
    }
}
