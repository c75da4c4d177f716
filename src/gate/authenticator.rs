//! Credential check with lockout bookkeeping.
//!
//! The store is authoritative on this path: the cache is written on success and
//! evicted on failure, but never read to decide whether a password is valid.

use chrono::{DateTime, Utc};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, instrument, warn};

use super::{
    account::Account,
    cache::UserCache,
    error::{validate_credentials, GateError},
    lockout::LockoutPolicy,
    password::{HashError, PasswordHasher},
    store::{bounded, CredentialStore},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Account),
    /// Unknown user or wrong password; the two are indistinguishable.
    InvalidCredentials,
    AccountLocked,
}

#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    cache: Arc<dyn UserCache>,
    hasher: Arc<dyn PasswordHasher>,
    policy: LockoutPolicy,
    store_timeout: Duration,
}

impl Authenticator {
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        cache: Arc<dyn UserCache>,
        hasher: Arc<dyn PasswordHasher>,
        policy: LockoutPolicy,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            hasher,
            policy,
            store_timeout,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Decide whether `(username, password)` is valid at `now`.
    ///
    /// # Errors
    /// Returns an error for empty input, store failure or timeout, or a hashing
    /// failure. Authentication outcomes are never errors.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthOutcome, GateError> {
        validate_credentials(username, password)?;

        let Some(account) =
            bounded(self.store_timeout, self.store.find_by_username(username)).await?
        else {
            self.cache.invalidate(username);
            debug!("Unknown user");
            return Ok(AuthOutcome::InvalidCredentials);
        };

        if self.policy.is_locked(&account, now) {
            return Ok(AuthOutcome::AccountLocked);
        }

        if !self.verify_password(password, &account.password_hash).await? {
            bounded(
                self.store_timeout,
                self.store.increment_failed_attempts(
                    account.id,
                    self.policy.max_failed_attempts(),
                    self.policy.lock_until(now),
                    now,
                ),
            )
            .await?;
            self.cache.invalidate(username);
            warn!(
                "Failed login for {username}, attempt {} of {}",
                account.failed_attempts.saturating_add(1),
                self.policy.max_failed_attempts()
            );
            return Ok(AuthOutcome::InvalidCredentials);
        }

        if self.policy.needs_reset(&account) {
            bounded(
                self.store_timeout,
                self.store.reset_failed_attempts(account.id),
            )
            .await?;
            debug!("Lockout counters reset for {username}");
        }

        let state = self.policy.on_success(&account);
        let account = account.with_lockout(state);
        self.cache.put(username, account.clone());
        info!("User {username} authenticated");

        Ok(AuthOutcome::Authenticated(account))
    }

    /// Account for an already-authenticated principal.
    ///
    /// Cache first; a miss falls back to the store and re-caches the result.
    ///
    /// # Errors
    /// Returns an error on store failure or timeout.
    #[instrument(skip(self))]
    pub async fn lookup_cached_user(&self, username: &str) -> Result<Option<Account>, GateError> {
        if let Some(account) = self.cache.get(username) {
            return Ok(Some(account));
        }

        let account = bounded(self.store_timeout, self.store.find_by_username(username)).await?;
        if let Some(account) = &account {
            self.cache.put(username, account.clone());
        }
        Ok(account)
    }

    async fn verify_password(&self, password: &str, digest: &str) -> Result<bool, GateError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();
        let digest = digest.to_owned();
        let verified = tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|_| HashError::Hash)??;
        Ok(verified)
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("policy", &self.policy)
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}
