//! Bearer token extraction.
//!
//! The principal is returned to the handler and passed on explicitly; nothing
//! is stashed in request-global state.

use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use tracing::debug;

use crate::gate::{AuthGate, Principal};

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Resolve the `Authorization` header into a principal, or 401.
pub fn require_auth(headers: &HeaderMap, gate: &AuthGate) -> Result<Principal, StatusCode> {
    let token = bearer_token(headers).ok_or(StatusCode::UNAUTHORIZED)?;
    gate.verify_token(token).map_err(|err| {
        debug!("Rejected bearer token: {err}");
        StatusCode::UNAUTHORIZED
    })
}
