//! In-process credential store.
//!
//! Every operation runs under one mutex, which makes the conditional increment
//! atomic exactly like the row-level update in `PostgreSQL`. Call counters let
//! tests observe which store paths a flow touched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CredentialStore, StoreError};
use crate::gate::account::{Account, AccountId, NewAccount};

/// Snapshot of how many times each store operation ran.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub find: usize,
    pub exists: usize,
    pub save: usize,
    pub increment: usize,
    pub reset: usize,
}

#[derive(Default)]
struct Counters {
    find: AtomicUsize,
    exists: AtomicUsize,
    save: AtomicUsize,
    increment: AtomicUsize,
    reset: AtomicUsize,
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    accounts: Mutex<HashMap<String, Account>>,
    calls: Counters,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            find: self.calls.find.load(Ordering::SeqCst),
            exists: self.calls.exists.load(Ordering::SeqCst),
            save: self.calls.save.load(Ordering::SeqCst),
            increment: self.calls.increment.load(Ordering::SeqCst),
            reset: self.calls.reset.load(Ordering::SeqCst),
        }
    }

    pub async fn len(&self) -> usize {
        self.accounts.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.lock().await.is_empty()
    }

    /// Current record without touching the call counters.
    pub async fn snapshot(&self, username: &str) -> Option<Account> {
        self.accounts.lock().await.get(username).cloned()
    }
}

impl std::fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCredentialStore")
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        self.calls.find.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.lock().await.get(username).cloned())
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, StoreError> {
        self.calls.exists.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.lock().await.contains_key(username))
    }

    async fn save(&self, account: NewAccount) -> Result<Account, StoreError> {
        self.calls.save.fetch_add(1, Ordering::SeqCst);
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(&account.username) {
            return Err(StoreError::Conflict);
        }
        let account = account.into_account(Uuid::now_v7());
        accounts.insert(account.username.clone(), account.clone());
        Ok(account)
    }

    async fn increment_failed_attempts(
        &self,
        id: AccountId,
        threshold: u32,
        lock_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.calls.increment.fetch_add(1, Ordering::SeqCst);
        let mut accounts = self.accounts.lock().await;
        if let Some(account) = accounts.values_mut().find(|account| account.id == id) {
            if let Some(next) = account.lockout().after_failure(threshold, lock_until, now) {
                account.failed_attempts = next.failed_attempts;
                account.locked_until = next.locked_until;
            }
        }
        Ok(())
    }

    async fn reset_failed_attempts(&self, id: AccountId) -> Result<(), StoreError> {
        self.calls.reset.fetch_add(1, Ordering::SeqCst);
        let mut accounts = self.accounts.lock().await;
        if let Some(account) = accounts.values_mut().find(|account| account.id == id) {
            account.failed_attempts = 0;
            account.locked_until = None;
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
