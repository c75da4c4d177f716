//! Advisory cache of authenticated accounts, keyed by username.
//!
//! The cache is a hint: it is refreshed on login and read while serving an
//! authenticated session, dropped on authentication failure, and never
//! consulted for credential decisions.

use moka::sync::Cache;
use std::time::Duration;
use tracing::debug;

use super::account::Account;

pub const DEFAULT_CACHE_CAPACITY: u64 = 100;
pub const DEFAULT_CACHE_IDLE: Duration = Duration::from_secs(15 * 60);

pub trait UserCache: Send + Sync {
    /// Cached snapshot, if any. Never loads from the store.
    fn get(&self, username: &str) -> Option<Account>;
    /// Overwrites unconditionally.
    fn put(&self, username: &str, account: Account);
    /// Removes the entry if present.
    fn invalidate(&self, username: &str);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    capacity: u64,
    idle: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            idle: DEFAULT_CACHE_IDLE,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_idle(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    #[must_use]
    pub fn idle(&self) -> Duration {
        self.idle
    }
}

/// Bounded cache whose entries expire after `idle` without access.
#[derive(Clone)]
pub struct MokaUserCache {
    inner: Cache<String, Account>,
}

impl MokaUserCache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let inner = Cache::builder()
            .name("user_cache")
            .max_capacity(config.capacity())
            .time_to_idle(config.idle())
            .build();
        Self { inner }
    }

    /// Approximate number of live entries.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

impl Default for MokaUserCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl UserCache for MokaUserCache {
    fn get(&self, username: &str) -> Option<Account> {
        let hit = self.inner.get(username);
        debug!(
            "User {} {} in cache",
            username,
            if hit.is_some() { "found" } else { "not found" }
        );
        hit
    }

    fn put(&self, username: &str, account: Account) {
        debug!("Caching user {}", username);
        self.inner.insert(username.to_string(), account);
    }

    fn invalidate(&self, username: &str) {
        debug!("Evicting user {}", username);
        self.inner.invalidate(username);
    }
}
