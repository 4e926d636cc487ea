//! The `session_id` cookie that ties jobs and stories to a browser.

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use storyforge_core::error::DomainError;
use uuid::Uuid;

/// Cookie name carrying the session identifier.
pub const SESSION_COOKIE: &str = "session_id";

/// Reads the session id from the request's `Cookie` headers, if present and
/// non-empty.
#[must_use]
pub fn session_id_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().trim_matches('"').to_owned())
        .filter(|value| !value.is_empty())
}

/// Mints a fresh session id.
#[must_use]
pub fn mint() -> String {
    Uuid::new_v4().to_string()
}

/// Builds the `Set-Cookie` value for `session_id`.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the id cannot be carried in a header.
pub fn set_cookie(session_id: &str) -> Result<HeaderValue, DomainError> {
    HeaderValue::from_str(&format!("{SESSION_COOKIE}={session_id}; HttpOnly; Path=/"))
        .map_err(|e| DomainError::Validation(format!("invalid session id: {e}")))
}
