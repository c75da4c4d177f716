//! # Notegate (authentication gate for the note manager)
//!
//! `notegate` turns a username and password into either a signed session token
//! or a rejection. It keeps per-account brute-force lockout counters in
//! `PostgreSQL` and a bounded cache of recently authenticated accounts.
//!
//! ## Lockout
//!
//! The failure that brings an account to three consecutive failed attempts locks
//! it for fifteen minutes (both configurable). A locked account rejects even the
//! correct password; the lock is lazily lifted once its expiry passes and the
//! next successful login clears the counters. Counter updates are a single
//! conditional `UPDATE` so concurrent attempts never lose an increment.
//!
//! ## Tokens
//!
//! Sessions are HS256 JWTs carrying the username and role. Expiry is the only
//! invalidation mechanism; there is no revocation list.
//!
//! ## Cache
//!
//! The user cache is advisory. It is warmed on successful login, read when
//! resolving the current user of an authenticated request, and evicted on
//! failure. Credential decisions always go to the store.

pub mod api;
pub mod cli;
pub mod gate;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
