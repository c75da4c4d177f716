use crate::gate::token::MIN_SECRET_LEN;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_JWT_ISSUER: &str = "jwt-issuer";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";
pub const ARG_MAX_FAILED_ATTEMPTS: &str = "max-failed-attempts";
pub const ARG_LOCK_DURATION_SECONDS: &str = "lock-duration-seconds";
pub const ARG_STORE_TIMEOUT_SECONDS: &str = "store-timeout-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    pub jwt_secret: SecretString,
    pub jwt_issuer: String,
    pub token_ttl_seconds: u64,
    pub max_failed_attempts: u32,
    pub lock_duration_seconds: u64,
    pub store_timeout_seconds: u64,
}

impl Options {
    /// Parse token and lockout arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the signing secret is missing or too short.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let jwt_secret = match matches.get_one::<String>(ARG_JWT_SECRET) {
            Some(value) if !value.trim().is_empty() => value.clone(),
            _ => anyhow::bail!("missing required argument: --{ARG_JWT_SECRET}"),
        };
        if jwt_secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("--{ARG_JWT_SECRET} must be at least {MIN_SECRET_LEN} bytes");
        }

        let jwt_issuer = matches
            .get_one::<String>(ARG_JWT_ISSUER)
            .cloned()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| crate::gate::token::DEFAULT_ISSUER.to_string());

        Ok(Self {
            jwt_secret: SecretString::from(jwt_secret),
            jwt_issuer,
            token_ttl_seconds: matches
                .get_one::<u64>(ARG_TOKEN_TTL_SECONDS)
                .copied()
                .unwrap_or(3600),
            max_failed_attempts: matches
                .get_one::<u32>(ARG_MAX_FAILED_ATTEMPTS)
                .copied()
                .unwrap_or(3),
            lock_duration_seconds: matches
                .get_one::<u64>(ARG_LOCK_DURATION_SECONDS)
                .copied()
                .unwrap_or(900),
            store_timeout_seconds: matches
                .get_one::<u64>(ARG_STORE_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(5),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    with_lockout_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("HS256 signing secret for session tokens (at least 32 bytes)")
                .env("NOTEGATE_JWT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_JWT_ISSUER)
                .long(ARG_JWT_ISSUER)
                .help("Issuer (iss) written to and required in session tokens")
                .env("NOTEGATE_JWT_ISSUER")
                .default_value("notegate"),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long(ARG_TOKEN_TTL_SECONDS)
                .help("Session token TTL in seconds")
                .env("NOTEGATE_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

fn with_lockout_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MAX_FAILED_ATTEMPTS)
                .long(ARG_MAX_FAILED_ATTEMPTS)
                .help("Consecutive failed logins that lock an account")
                .env("NOTEGATE_MAX_FAILED_ATTEMPTS")
                .default_value("3")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_LOCK_DURATION_SECONDS)
                .long(ARG_LOCK_DURATION_SECONDS)
                .help("How long a locked account stays locked, in seconds")
                .env("NOTEGATE_LOCK_DURATION_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_STORE_TIMEOUT_SECONDS)
                .long(ARG_STORE_TIMEOUT_SECONDS)
                .help("Upper bound for each credential store call, in seconds")
                .env("NOTEGATE_STORE_TIMEOUT_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
