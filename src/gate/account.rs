//! Account records as seen by the gate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

pub type AccountId = Uuid;

/// Closed set of roles an account can hold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "USER" => Ok(Self::User),
            "ADMIN" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Lockout counters for one account.
///
/// `failed_attempts` and `locked_until` only move together: both are cleared by a
/// reset, and `locked_until` is only ever written by the failure that reaches the
/// threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LockoutState {
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

impl LockoutState {
    /// True while a lock is set and has not yet expired.
    #[must_use]
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Next state after one failed attempt, or `None` while the account is locked.
    ///
    /// The counter grows by one; reaching `threshold` arms `lock_until`. An
    /// active lock is never extended, so a failure against a locked account is a
    /// no-op.
    #[must_use]
    pub fn after_failure(
        &self,
        threshold: u32,
        lock_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        if self.is_locked_at(now) {
            return None;
        }
        let failed_attempts = self.failed_attempts.saturating_add(1);
        let locked_until = if failed_attempts >= threshold {
            Some(lock_until)
        } else {
            self.locked_until
        };
        Some(Self {
            failed_attempts,
            locked_until,
        })
    }

    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.failed_attempts == 0 && self.locked_until.is_none()
    }
}

/// Durable identity and credential record.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

impl Account {
    #[must_use]
    pub fn lockout(&self) -> LockoutState {
        LockoutState {
            failed_attempts: self.failed_attempts,
            locked_until: self.locked_until,
        }
    }

    #[must_use]
    pub fn with_lockout(mut self, state: LockoutState) -> Self {
        self.failed_attempts = state.failed_attempts;
        self.locked_until = state.locked_until;
        self
    }
}

// The hash never leaves the process through logs.
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"***")
            .field("role", &self.role)
            .field("failed_attempts", &self.failed_attempts)
            .field("locked_until", &self.locked_until)
            .finish()
    }
}

/// Fields supplied when creating an account; the store assigns the id.
#[derive(Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

impl NewAccount {
    #[must_use]
    pub fn into_account(self, id: AccountId) -> Account {
        Account {
            id,
            username: self.username,
            password_hash: self.password_hash,
            role: self.role,
            failed_attempts: 0,
            locked_until: None,
        }
    }
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("password_hash", &"***")
            .field("role", &self.role)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn state(failed_attempts: u32, locked_until: Option<DateTime<Utc>>) -> LockoutState {
        LockoutState {
            failed_attempts,
            locked_until,
        }
    }

    #[test]
    fn role_round_trips_through_text() {
        assert_eq!("USER".parse::<Role>(), Ok(Role::User));
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(Role::User.to_string(), "USER");
        assert!("user".parse::<Role>().is_err());
    }

    #[test]
    fn after_failure_below_threshold_keeps_lock_unset() {
        let now = Utc::now();
        let next = state(1, None).after_failure(3, now + Duration::minutes(15), now);
        assert_eq!(next, Some(state(2, None)));
    }

    #[test]
    fn after_failure_reaching_threshold_arms_lock() {
        let now = Utc::now();
        let lock_until = now + Duration::minutes(15);
        let next = state(2, None).after_failure(3, lock_until, now);
        assert_eq!(next, Some(state(3, Some(lock_until))));
    }

    #[test]
    fn after_failure_is_noop_while_locked() {
        let now = Utc::now();
        let locked = state(3, Some(now + Duration::minutes(5)));
        assert_eq!(locked.after_failure(3, now + Duration::minutes(15), now), None);
    }

    #[test]
    fn after_failure_rearms_once_lock_expired() {
        let now = Utc::now();
        let expired = state(3, Some(now - Duration::seconds(1)));
        let lock_until = now + Duration::minutes(15);
        assert_eq!(
            expired.after_failure(3, lock_until, now),
            Some(state(4, Some(lock_until)))
        );
    }

    #[test]
    fn debug_redacts_password_hash() {
        let account = NewAccount {
            username: "alice".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::User,
        }
        .into_account(Uuid::now_v7());
        let rendered = format!("{account:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("argon2id"));
    }
}
