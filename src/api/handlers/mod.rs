//! API handlers and the shared mapping from gate failures to responses.

pub mod auth;
pub mod health;
pub mod root;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::gate::GateError;

/// Invalid input is the caller's fault; everything else is logged and hidden.
pub(crate) fn gate_error_response(err: &GateError) -> Response {
    match err {
        GateError::InvalidInput(reason) => {
            (StatusCode::BAD_REQUEST, (*reason).to_string()).into_response()
        }
        other => {
            error!("Gate failure: {other:?}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::StoreError;

    #[test]
    fn invalid_input_is_bad_request() {
        let response = gate_error_response(&GateError::InvalidInput("username must not be empty"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn infrastructure_failures_are_internal() {
        let response = gate_error_response(&GateError::StoreTimeout);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let response = gate_error_response(&GateError::Store(StoreError::Conflict));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
