//! Authentication gate.
//!
//! Turns a `(username, password)` pair into either a signed session token or a
//! rejection, while keeping per-account brute-force lockout state in the
//! credential store and a read-through cache of authenticated accounts.
//!
//! [`AuthGate`] is the entry point for collaborators such as the HTTP layer:
//!
//! - [`AuthGate::signup`] creates accounts.
//! - [`AuthGate::login`] authenticates and issues a token.
//! - [`AuthGate::verify_token`] turns a bearer token back into a [`Principal`].
//! - [`AuthGate::lookup_cached_user`] resolves the account behind a principal.

pub mod account;
pub mod authenticator;
pub mod cache;
pub mod clock;
pub mod error;
pub mod lockout;
pub mod password;
pub mod signup;
pub mod store;
pub mod token;

use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::instrument;

pub use account::{Account, AccountId, LockoutState, NewAccount, Role};
pub use authenticator::{AuthOutcome, Authenticator};
pub use cache::{CacheConfig, MokaUserCache, UserCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::GateError;
pub use lockout::LockoutPolicy;
pub use password::{Argon2Hasher, PasswordHasher};
pub use signup::{SignupHandler, SignupOutcome};
pub use store::{CredentialStore, MemoryCredentialStore, PgCredentialStore, StoreError};
pub use token::{IssuedToken, Principal, TokenError, TokenIssuer};

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct GateConfig {
    jwt_secret: SecretString,
    jwt_issuer: String,
    token_ttl: Duration,
    max_failed_attempts: u32,
    lock_duration: Duration,
    cache: CacheConfig,
    store_timeout: Duration,
}

impl GateConfig {
    #[must_use]
    pub fn new(jwt_secret: SecretString) -> Self {
        Self {
            jwt_secret,
            jwt_issuer: token::DEFAULT_ISSUER.to_string(),
            token_ttl: token::DEFAULT_TOKEN_TTL,
            max_failed_attempts: lockout::DEFAULT_MAX_FAILED_ATTEMPTS,
            lock_duration: lockout::DEFAULT_LOCK_DURATION,
            cache: CacheConfig::default(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_jwt_issuer(mut self, issuer: String) -> Self {
        self.jwt_issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_max_failed_attempts(mut self, attempts: u32) -> Self {
        self.max_failed_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_lock_duration(mut self, duration: Duration) -> Self {
        self.lock_duration = duration;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    #[must_use]
    pub fn jwt_issuer(&self) -> &str {
        &self.jwt_issuer
    }

    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    #[must_use]
    pub fn cache(&self) -> CacheConfig {
        self.cache
    }

    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    #[must_use]
    pub fn lockout_policy(&self) -> LockoutPolicy {
        LockoutPolicy::new(self.max_failed_attempts, self.lock_duration)
    }

    pub(crate) fn jwt_secret(&self) -> &SecretString {
        &self.jwt_secret
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated { token: IssuedToken, account: Account },
    InvalidCredentials,
    AccountLocked,
}

/// Collaborators default to the production ones; tests swap in a manual
/// clock, a cheap hasher, or a custom cache.
pub struct AuthGateBuilder {
    config: GateConfig,
    store: Arc<dyn CredentialStore>,
    cache: Option<Arc<dyn UserCache>>,
    hasher: Option<Arc<dyn PasswordHasher>>,
    clock: Option<Arc<dyn Clock>>,
}

impl AuthGateBuilder {
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn UserCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// # Errors
    /// Returns an error if the signing secret or token ttl is rejected.
    pub fn build(self) -> Result<AuthGate, TokenError> {
        let config = self.config;
        let issuer = TokenIssuer::new(
            config.jwt_secret(),
            config.jwt_issuer().to_string(),
            config.token_ttl(),
        )?;
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MokaUserCache::new(config.cache())));
        let hasher = self
            .hasher
            .unwrap_or_else(|| Arc::new(Argon2Hasher::default()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        Ok(AuthGate {
            authenticator: Authenticator::new(
                Arc::clone(&self.store),
                cache,
                Arc::clone(&hasher),
                config.lockout_policy(),
                config.store_timeout(),
            ),
            signup: SignupHandler::new(Arc::clone(&self.store), hasher, config.store_timeout()),
            issuer,
            store: self.store,
            clock,
            store_timeout: config.store_timeout(),
        })
    }
}

pub struct AuthGate {
    authenticator: Authenticator,
    signup: SignupHandler,
    issuer: TokenIssuer,
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl AuthGate {
    #[must_use]
    pub fn builder(config: GateConfig, store: Arc<dyn CredentialStore>) -> AuthGateBuilder {
        AuthGateBuilder {
            config,
            store,
            cache: None,
            hasher: None,
            clock: None,
        }
    }

    /// # Errors
    /// Returns an error for empty input or an infrastructure failure.
    pub async fn signup(&self, username: &str, password: &str) -> Result<SignupOutcome, GateError> {
        self.signup.signup(username, password).await
    }

    /// Authenticate and, on success, issue a token valid from the same instant.
    ///
    /// # Errors
    /// Returns an error for empty input or an infrastructure failure.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, GateError> {
        let now = self.clock.now();
        match self.authenticator.authenticate(username, password, now).await? {
            AuthOutcome::Authenticated(account) => {
                let token = self.issuer.issue(&account, now)?;
                Ok(LoginOutcome::Authenticated { token, account })
            }
            AuthOutcome::InvalidCredentials => Ok(LoginOutcome::InvalidCredentials),
            AuthOutcome::AccountLocked => Ok(LoginOutcome::AccountLocked),
        }
    }

    /// # Errors
    /// Returns an error on store failure or timeout.
    pub async fn lookup_cached_user(&self, username: &str) -> Result<Option<Account>, GateError> {
        self.authenticator.lookup_cached_user(username).await
    }

    /// # Errors
    /// Returns an error for a malformed, foreign, or expired token.
    pub fn verify_token(&self, token: &str) -> Result<Principal, TokenError> {
        self.issuer.verify(token, self.clock.now())
    }

    /// # Errors
    /// Returns an error if the store is unreachable or slow.
    pub async fn ping_store(&self) -> Result<(), GateError> {
        store::bounded(self.store_timeout, self.store.ping()).await
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("authenticator", &self.authenticator)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::{TimeZone, Utc};

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn gate(clock: Arc<ManualClock>) -> Result<AuthGate> {
        let config = GateConfig::new(SecretString::from(SECRET.to_string()))
            .with_token_ttl(Duration::from_secs(60));
        Ok(
            AuthGate::builder(config, Arc::new(MemoryCredentialStore::new()))
                .with_hasher(Arc::new(Argon2Hasher::with_params(1024, 1, 1)?))
                .with_clock(clock)
                .build()?,
        )
    }

    fn start() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn config_defaults() {
        let config = GateConfig::new(SecretString::from(SECRET.to_string()));
        assert_eq!(config.jwt_issuer(), "notegate");
        assert_eq!(config.token_ttl(), Duration::from_secs(3600));
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
        assert_eq!(config.lockout_policy(), LockoutPolicy::default());
        assert_eq!(config.cache(), CacheConfig::default());
        assert!(!format!("{config:?}").contains(SECRET));
    }

    #[test]
    fn build_rejects_weak_secret() {
        let config = GateConfig::new(SecretString::from("short".to_string()));
        let result = AuthGate::builder(config, Arc::new(MemoryCredentialStore::new())).build();
        assert!(matches!(result, Err(TokenError::WeakSecret)));
    }

    #[tokio::test]
    async fn login_issues_token_from_clock() -> Result<()> {
        let clock = Arc::new(ManualClock::new(start()));
        let gate = gate(clock.clone())?;
        gate.signup("alice", "secret").await?;

        let LoginOutcome::Authenticated { token, account } = gate.login("alice", "secret").await?
        else {
            anyhow::bail!("expected authenticated");
        };
        assert_eq!(account.username, "alice");
        assert_eq!(token.expires_at, start() + chrono::Duration::seconds(60));

        let principal = gate.verify_token(&token.token)?;
        assert_eq!(principal.username, "alice");
        assert_eq!(principal.role, Role::User);

        clock.advance(chrono::Duration::seconds(60));
        assert!(matches!(
            gate.verify_token(&token.token),
            Err(TokenError::Expired)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn login_maps_negative_outcomes() -> Result<()> {
        let gate = gate(Arc::new(ManualClock::new(start())))?;
        gate.signup("bob", "secret").await?;

        assert_eq!(
            gate.login("nobody", "secret").await?,
            LoginOutcome::InvalidCredentials
        );
        for _ in 0..3 {
            assert_eq!(
                gate.login("bob", "wrong").await?,
                LoginOutcome::InvalidCredentials
            );
        }
        assert_eq!(gate.login("bob", "secret").await?, LoginOutcome::AccountLocked);
        gate.ping_store().await?;
        Ok(())
    }
}
