use std::{sync::Arc, time::Duration};
use tracing::{info, instrument};

use super::{
    account::{Account, NewAccount, Role},
    error::{validate_credentials, GateError},
    password::{HashError, PasswordHasher},
    store::{bounded, CredentialStore, StoreError},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignupOutcome {
    Created(Account),
    AlreadyExists,
}

#[derive(Clone)]
pub struct SignupHandler {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    store_timeout: Duration,
}

impl SignupHandler {
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            hasher,
            store_timeout,
        }
    }

    /// Create an account with the default role and zeroed counters.
    ///
    /// A username taken between the existence check and the insert is reported
    /// as `AlreadyExists` as well.
    ///
    /// # Errors
    /// Returns an error for empty input, store failure or timeout, or a hashing
    /// failure.
    #[instrument(skip(self, password))]
    pub async fn signup(&self, username: &str, password: &str) -> Result<SignupOutcome, GateError> {
        validate_credentials(username, password)?;

        if bounded(self.store_timeout, self.store.exists_by_username(username)).await? {
            return Ok(SignupOutcome::AlreadyExists);
        }

        let hasher = Arc::clone(&self.hasher);
        let plain = password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(|_| HashError::Hash)??;

        let new_account = NewAccount {
            username: username.to_owned(),
            password_hash,
            role: Role::default(),
        };
        match tokio::time::timeout(self.store_timeout, self.store.save(new_account)).await {
            Ok(Ok(account)) => {
                info!("User {username} created");
                Ok(SignupOutcome::Created(account))
            }
            Ok(Err(StoreError::Conflict)) => Ok(SignupOutcome::AlreadyExists),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(GateError::StoreTimeout),
        }
    }
}

impl std::fmt::Debug for SignupHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupHandler")
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}
