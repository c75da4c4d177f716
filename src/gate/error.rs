use super::{password::HashError, store::StoreError, token::TokenError};

/// Infrastructure and validation failures.
///
/// Domain outcomes (invalid credentials, locked, already exists) are not
/// errors; they are returned as outcome values.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("credential store failure")]
    Store(#[from] StoreError),
    #[error("credential store timed out")]
    StoreTimeout,
    #[error("password hashing failure")]
    Hash(#[from] HashError),
    #[error("token failure")]
    Token(#[from] TokenError),
}

impl GateError {
    /// True for failures a caller may reasonably retry.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::StoreTimeout | Self::Store(StoreError::Database(_)))
    }
}

/// Reject empty credentials before any store access.
///
/// # Errors
/// Returns [`GateError::InvalidInput`] for an empty or all-whitespace username,
/// or an empty password.
pub fn validate_credentials(username: &str, password: &str) -> Result<(), GateError> {
    if username.trim().is_empty() {
        return Err(GateError::InvalidInput("username must not be empty"));
    }
    if password.is_empty() {
        return Err(GateError::InvalidInput("password must not be empty"));
    }
    Ok(())
}
