use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::{instrument, warn};

use super::types::{Credentials, SignupResponse};
use crate::{
    api::handlers::gate_error_response,
    gate::{AuthGate, SignupOutcome},
};

#[utoipa::path(
    post,
    path = "/v1/signup",
    request_body = Credentials,
    responses(
        (status = 201, description = "User created", body = SignupResponse),
        (status = 400, description = "Missing payload or empty username/password"),
        (status = 409, description = "User already exists", body = SignupResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "auth"
)]
#[instrument(skip(gate, payload))]
pub async fn signup(
    gate: Extension<Arc<AuthGate>>,
    payload: Option<Json<Credentials>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    match gate.signup(&request.username, &request.password).await {
        Ok(SignupOutcome::Created(_)) => (
            StatusCode::CREATED,
            Json(SignupResponse {
                username: request.username,
                message: "User created".to_string(),
            }),
        )
            .into_response(),
        Ok(SignupOutcome::AlreadyExists) => {
            warn!("User already exists");
            (
                StatusCode::CONFLICT,
                Json(SignupResponse {
                    username: request.username,
                    message: "User already exists".to_string(),
                }),
            )
                .into_response()
        }
        Err(err) => gate_error_response(&err),
    }
}
