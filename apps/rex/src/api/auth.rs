//! Request authentication.
//!
//! Accepts `Authorization: Basic base64(login:app_password)` or
//! `Authorization: Bearer <api_key>` and resolves the caller's capabilities
//! from the live user directory on every request.

use super::AppState;
use crate::directory::Credentials;
use crate::error::AppError;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rex_core::Caller;

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Caller);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credentials = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_authorization)
            .ok_or(AppError::Unauthorized)?;

        let directory = state
            .directory
            .read()
            .map_err(|_| AppError::lock_poisoned("user directory"))?;
        let user = directory
            .authenticate(&credentials)
            .ok_or(AppError::Unauthorized)?;
        let caller = Caller::resolve(&*directory, user).ok_or(AppError::Unauthorized)?;
        Ok(Authenticated(caller))
    }
}

/// Parse an `Authorization` header value.
pub fn parse_authorization(header: &str) -> Option<Credentials> {
    let (scheme, value) = header.trim().split_once(' ')?;
    let value = value.trim();
    if scheme.eq_ignore_ascii_case("bearer") {
        return (!value.is_empty()).then(|| Credentials::ApiKey(value.to_string()));
    }
    if scheme.eq_ignore_ascii_case("basic") {
        let decoded = STANDARD.decode(value).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (login, password) = decoded.split_once(':')?;
        return Some(Credentials::AppPassword {
            login: login.to_string(),
            // Application passwords are often shown with spaces
            password: password.split_whitespace().collect(),
        });
    }
    None
}
