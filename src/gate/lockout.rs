//! Brute-force lockout policy.
//!
//! Pure decision logic over an account's counters and the current time:
//!
//! - **Threshold:** the failure that brings `failed_attempts` to
//!   `max_failed_attempts` (default 3) locks the account.
//! - **Duration:** the lock lasts `lock_duration` (default 15 minutes) from that
//!   failure and is not extended by later failures while it is active.
//! - **Expiry:** lazy; an elapsed `locked_until` reads as unlocked, no sweep runs.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::warn;

use super::account::{Account, LockoutState};

pub const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 3;
pub const DEFAULT_LOCK_DURATION: Duration = Duration::from_secs(15 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockoutPolicy {
    max_failed_attempts: u32,
    lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FAILED_ATTEMPTS, DEFAULT_LOCK_DURATION)
    }
}

impl LockoutPolicy {
    /// A threshold of zero is treated as one.
    #[must_use]
    pub fn new(max_failed_attempts: u32, lock_duration: Duration) -> Self {
        Self {
            max_failed_attempts: max_failed_attempts.max(1),
            lock_duration,
        }
    }

    #[must_use]
    pub fn max_failed_attempts(&self) -> u32 {
        self.max_failed_attempts
    }

    #[must_use]
    pub fn lock_duration(&self) -> Duration {
        self.lock_duration
    }

    pub fn is_locked(&self, account: &Account, now: DateTime<Utc>) -> bool {
        let locked = account.lockout().is_locked_at(now);
        if locked {
            warn!(
                "User {} is locked until {:?}",
                account.username, account.locked_until
            );
        }
        locked
    }

    /// Expiry written by a failure at `now` that reaches the threshold.
    #[must_use]
    pub fn lock_until(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.lock_duration)
            .ok()
            .and_then(|duration| now.checked_add_signed(duration))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Counters after one more failed attempt at `now`.
    ///
    /// A locked account keeps its current state.
    #[must_use]
    pub fn on_failure(&self, account: &Account, now: DateTime<Utc>) -> LockoutState {
        let current = account.lockout();
        current
            .after_failure(self.max_failed_attempts, self.lock_until(now), now)
            .unwrap_or(current)
    }

    /// Counters after a successful attempt: always cleared.
    #[must_use]
    pub fn on_success(&self, _account: &Account) -> LockoutState {
        LockoutState::default()
    }

    /// Whether a success needs a write to clear the counters.
    #[must_use]
    pub fn needs_reset(&self, account: &Account) -> bool {
        !account.lockout().is_clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::account::{NewAccount, Role};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn account(failed_attempts: u32, locked_until: Option<DateTime<Utc>>) -> Account {
        NewAccount {
            username: "bob".to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
        }
        .into_account(Uuid::now_v7())
        .with_lockout(LockoutState {
            failed_attempts,
            locked_until,
        })
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn defaults_match_three_strikes_fifteen_minutes() {
        let policy = LockoutPolicy::default();
        assert_eq!(policy.max_failed_attempts(), 3);
        assert_eq!(policy.lock_duration(), Duration::from_secs(900));
    }

    #[test]
    fn zero_threshold_is_clamped() {
        let policy = LockoutPolicy::new(0, DEFAULT_LOCK_DURATION);
        assert_eq!(policy.max_failed_attempts(), 1);
    }

    #[test]
    fn is_locked_only_while_expiry_in_future() {
        let policy = LockoutPolicy::default();
        assert!(!policy.is_locked(&account(0, None), at(0)));
        assert!(policy.is_locked(&account(3, Some(at(15))), at(0)));
        assert!(!policy.is_locked(&account(3, Some(at(15))), at(15)));
        assert!(!policy.is_locked(&account(3, Some(at(15))), at(16)));
    }

    #[test]
    fn single_failure_below_threshold_increments_by_one() {
        let policy = LockoutPolicy::default();
        for start in 0..policy.max_failed_attempts() - 1 {
            let next = policy.on_failure(&account(start, None), at(0));
            assert_eq!(next.failed_attempts, start + 1);
            assert_eq!(next.locked_until, None);
        }
    }

    #[test]
    fn threshold_failure_sets_lock_duration_from_now() {
        let policy = LockoutPolicy::default();
        let next = policy.on_failure(&account(2, None), at(3));
        assert_eq!(next.failed_attempts, 3);
        assert_eq!(next.locked_until, Some(at(18)));
    }

    #[test]
    fn failure_while_locked_does_not_extend() {
        let policy = LockoutPolicy::default();
        let locked = account(3, Some(at(15)));
        let next = policy.on_failure(&locked, at(10));
        assert_eq!(next, locked.lockout());
    }

    #[test]
    fn success_clears_and_reset_is_skipped_when_clean() {
        let policy = LockoutPolicy::default();
        assert!(policy.on_success(&account(2, Some(at(1)))).is_clear());
        assert!(policy.needs_reset(&account(1, None)));
        assert!(policy.needs_reset(&account(0, Some(at(1)))));
        assert!(!policy.needs_reset(&account(0, None)));
    }
}
