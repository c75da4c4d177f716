//! Credential store contract.
//!
//! The store is the system of record for accounts. The lockout counters are only
//! ever mutated through [`CredentialStore::increment_failed_attempts`] and
//! [`CredentialStore::reset_failed_attempts`], each a single atomic step on the
//! store side, so concurrent attempts against one account cannot lose updates.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{future::Future, time::Duration};

use super::account::{Account, AccountId, NewAccount};
use super::error::GateError;

pub use memory::{MemoryCredentialStore, StoreCalls};
pub use postgres::PgCredentialStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("username already taken")]
    Conflict,
    #[error("stored record is invalid: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    async fn exists_by_username(&self, username: &str) -> Result<bool, StoreError>;

    /// Persist a new account with zeroed counters.
    ///
    /// Returns [`StoreError::Conflict`] when the username is already taken.
    async fn save(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Conditional atomic increment.
    ///
    /// No-op while `locked_until > now`. Otherwise adds one to
    /// `failed_attempts` and, when the result is `>= threshold`, sets
    /// `locked_until = lock_until` in the same step.
    async fn increment_failed_attempts(
        &self,
        id: AccountId,
        threshold: u32,
        lock_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Clear `failed_attempts` and `locked_until` together.
    async fn reset_failed_attempts(&self, id: AccountId) -> Result<(), StoreError>;

    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Run one store call under `limit`; expiry surfaces as [`GateError::StoreTimeout`].
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, GateError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(GateError::from),
        Err(_) => Err(GateError::StoreTimeout),
    }
}
