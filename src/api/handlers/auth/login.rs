use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::instrument;

use super::types::{Credentials, TokenResponse};
use crate::{
    api::handlers::gate_error_response,
    gate::{AuthGate, LoginOutcome},
};

#[utoipa::path(
    post,
    path = "/v1/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Missing payload or empty username/password"),
        (status = 401, description = "Invalid credentials"),
        (status = 423, description = "User is locked"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "auth"
)]
#[instrument(skip(gate, payload))]
pub async fn login(
    gate: Extension<Arc<AuthGate>>,
    payload: Option<Json<Credentials>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    match gate.login(&request.username, &request.password).await {
        Ok(LoginOutcome::Authenticated { token, .. }) => (
            StatusCode::OK,
            Json(TokenResponse {
                token: token.token,
                token_type: "Bearer".to_string(),
                expires_at: token.expires_at,
            }),
        )
            .into_response(),
        Ok(LoginOutcome::InvalidCredentials) => {
            (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()).into_response()
        }
        Ok(LoginOutcome::AccountLocked) => (
            StatusCode::LOCKED,
            "User is locked. Try again later.".to_string(),
        )
            .into_response(),
        Err(err) => gate_error_response(&err),
    }
}
