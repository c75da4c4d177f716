//! Current-user lookup for an authenticated request.
//!
//! 1) Verify the bearer token into a principal.
//! 2) Resolve the account through the user cache, falling back to the store.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::debug;

use super::{principal::require_auth, types::MeResponse};
use crate::{api::handlers::gate_error_response, gate::AuthGate};

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "Return the authenticated user.", body = MeResponse),
        (status = 401, description = "Missing, invalid, or expired bearer token."),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me(headers: HeaderMap, gate: Extension<Arc<AuthGate>>) -> impl IntoResponse {
    let principal = match require_auth(&headers, &gate) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    match gate.lookup_cached_user(&principal.username).await {
        Ok(Some(account)) => (
            StatusCode::OK,
            Json(MeResponse {
                username: account.username,
                role: account.role.to_string(),
            }),
        )
            .into_response(),
        Ok(None) => {
            debug!("Token subject {} no longer exists", principal.username);
            StatusCode::UNAUTHORIZED.into_response()
        }
        Err(err) => gate_error_response(&err),
    }
}
