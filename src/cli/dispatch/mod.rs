//! Maps validated CLI arguments to an [`Action`].

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, cache, ARG_DB_MAX_CONNECTIONS, ARG_DSN, ARG_PORT};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let db_max_connections = matches
        .get_one::<u32>(ARG_DB_MAX_CONNECTIONS)
        .copied()
        .unwrap_or(5);

    let auth_opts = auth::Options::parse(matches)?;
    let cache_opts = cache::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        dsn,
        db_max_connections,
        jwt_secret: auth_opts.jwt_secret,
        jwt_issuer: auth_opts.jwt_issuer,
        token_ttl_seconds: auth_opts.token_ttl_seconds,
        max_failed_attempts: auth_opts.max_failed_attempts,
        lock_duration_seconds: auth_opts.lock_duration_seconds,
        store_timeout_seconds: auth_opts.store_timeout_seconds,
        cache_capacity: cache_opts.capacity,
        cache_idle_seconds: cache_opts.idle_seconds,
    }))
}
