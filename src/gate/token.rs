//! Signed, time-bounded session tokens (HS256 JWT).
//!
//! Issuing is a pure transformation of `(account, signing key, now, ttl)`.
//! Expiry is the only invalidation mechanism; there is no revocation list.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::account::{Account, Role};

pub const MIN_SECRET_LEN: usize = 32;
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_ISSUER: &str = "notegate";

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("signing secret must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,
    #[error("token ttl out of range")]
    InvalidTtl,
    #[error("failed to sign token")]
    Sign(#[source] jsonwebtoken::errors::Error),
    #[error("invalid token")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("token expired")]
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signed token handed to the client after a successful login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Authenticated identity carried explicitly through a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: chrono::Duration,
}

impl TokenIssuer {
    /// Build an issuer from the configured secret.
    ///
    /// # Errors
    /// Returns an error if the secret is shorter than [`MIN_SECRET_LEN`] or the ttl
    /// does not fit a timestamp offset.
    pub fn new(secret: &SecretString, issuer: String, ttl: Duration) -> Result<Self, TokenError> {
        let bytes = secret.expose_secret().as_bytes();
        if bytes.len() < MIN_SECRET_LEN {
            return Err(TokenError::WeakSecret);
        }
        let ttl = chrono::Duration::from_std(ttl).map_err(|_| TokenError::InvalidTtl)?;
        if ttl <= chrono::Duration::zero() {
            return Err(TokenError::InvalidTtl);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            issuer,
            ttl,
        })
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn claims_for(&self, account: &Account, now: DateTime<Utc>) -> Claims {
        let iat = now.timestamp();
        Claims {
            sub: account.username.clone(),
            role: account.role,
            iss: self.issuer.clone(),
            iat,
            exp: iat.saturating_add(self.ttl.num_seconds()),
        }
    }

    /// Sign a token for `account` valid from `now` for the configured ttl.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn issue(&self, account: &Account, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let claims = self.claims_for(account, now);
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Sign)?;
        Ok(IssuedToken {
            token,
            expires_at: timestamp(claims.exp)?,
        })
    }

    /// Check signature, issuer, and expiry against `now`.
    ///
    /// # Errors
    /// Returns an error for a malformed or tampered token, a foreign issuer, or
    /// `exp <= now`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, TokenError> {
        // Expiry is checked against the injected clock below, not the wall clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(TokenError::Invalid)?;
        let claims = data.claims;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(Principal {
            username: claims.sub,
            role: claims.role,
            expires_at: timestamp(claims.exp)?,
        })
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .field("key", &"***")
            .finish()
    }
}

fn timestamp(seconds: i64) -> Result<DateTime<Utc>, TokenError> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or(TokenError::InvalidTtl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::account::NewAccount;
    use anyhow::Result;
    use uuid::Uuid;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn issuer() -> Result<TokenIssuer> {
        Ok(TokenIssuer::new(
            &SecretString::from(SECRET.to_string()),
            DEFAULT_ISSUER.to_string(),
            Duration::from_secs(60),
        )?)
    }

    fn account() -> Account {
        NewAccount {
            username: "alice".to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
        }
        .into_account(Uuid::now_v7())
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default()
    }

    #[test]
    fn rejects_short_secret() {
        let result = TokenIssuer::new(
            &SecretString::from("short".to_string()),
            DEFAULT_ISSUER.to_string(),
            DEFAULT_TOKEN_TTL,
        );
        assert!(matches!(result, Err(TokenError::WeakSecret)));
    }

    #[test]
    fn rejects_zero_ttl() {
        let result = TokenIssuer::new(
            &SecretString::from(SECRET.to_string()),
            DEFAULT_ISSUER.to_string(),
            Duration::ZERO,
        );
        assert!(matches!(result, Err(TokenError::InvalidTtl)));
    }

    #[test]
    fn issue_is_deterministic() -> Result<()> {
        let issuer = issuer()?;
        let first = issuer.issue(&account(), now())?;
        let second = issuer.issue(&account(), now())?;
        assert_eq!(first.token, second.token);
        assert_eq!(first.expires_at, now() + chrono::Duration::seconds(60));
        Ok(())
    }

    #[test]
    fn verify_round_trips_username_and_role() -> Result<()> {
        let issuer = issuer()?;
        let issued = issuer.issue(&account(), now())?;
        let principal = issuer.verify(&issued.token, now() + chrono::Duration::seconds(59))?;
        assert_eq!(principal.username, "alice");
        assert_eq!(principal.role, Role::User);
        assert_eq!(principal.expires_at, issued.expires_at);
        Ok(())
    }

    #[test]
    fn verify_rejects_expired() -> Result<()> {
        let issuer = issuer()?;
        let issued = issuer.issue(&account(), now())?;
        let result = issuer.verify(&issued.token, now() + chrono::Duration::seconds(60));
        assert!(matches!(result, Err(TokenError::Expired)));
        Ok(())
    }

    #[test]
    fn verify_rejects_other_key() -> Result<()> {
        let issued = issuer()?.issue(&account(), now())?;
        let other = TokenIssuer::new(
            &SecretString::from("fedcba9876543210fedcba9876543210".to_string()),
            DEFAULT_ISSUER.to_string(),
            Duration::from_secs(60),
        )?;
        assert!(matches!(
            other.verify(&issued.token, now()),
            Err(TokenError::Invalid(_))
        ));
        Ok(())
    }

    #[test]
    fn verify_rejects_other_issuer() -> Result<()> {
        let issued = issuer()?.issue(&account(), now())?;
        let other = TokenIssuer::new(
            &SecretString::from(SECRET.to_string()),
            "someone-else".to_string(),
            Duration::from_secs(60),
        )?;
        assert!(other.verify(&issued.token, now()).is_err());
        Ok(())
    }

    #[test]
    fn verify_rejects_garbage() -> Result<()> {
        assert!(issuer()?.verify("not.a.jwt", now()).is_err());
        Ok(())
    }
}
