//! Slow, salted one-way password hashing.
//!
//! Digests are argon2id PHC strings (`$argon2id$v=19$...`), so parameters and
//! salt travel with the hash and older digests keep verifying after a
//! parameter change.

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("invalid hashing parameters")]
    Params,
    #[error("failed to hash password")]
    Hash,
    #[error("stored password hash is malformed")]
    MalformedDigest,
}

pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password into a self-describing digest.
    ///
    /// # Errors
    /// Returns an error if the underlying primitive fails.
    fn hash(&self, plain: &str) -> Result<String, HashError>;

    /// Compare a plaintext password against a stored digest.
    ///
    /// # Errors
    /// Returns an error if the digest cannot be parsed; a mismatch is `Ok(false)`.
    fn verify(&self, plain: &str, digest: &str) -> Result<bool, HashError>;
}

#[derive(Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Hasher with the argon2 crate's recommended defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    /// Hasher with explicit memory (KiB), iteration, and lane counts.
    ///
    /// # Errors
    /// Returns an error if argon2 rejects the parameters.
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, HashError> {
        let params = Params::new(m_cost, t_cost, p_cost, None).map_err(|_| HashError::Params)?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Argon2Hasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argon2Hasher")
            .field("m_cost", &self.params.m_cost())
            .field("t_cost", &self.params.t_cost())
            .field("p_cost", &self.params.p_cost())
            .finish()
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| HashError::Hash)
    }

    fn verify(&self, plain: &str, digest: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(digest).map_err(|_| HashError::MalformedDigest)?;
        Ok(self
            .argon2()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }
}
