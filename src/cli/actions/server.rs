use crate::{
    api,
    gate::{CacheConfig, GateConfig},
};
use anyhow::Result;
use secrecy::SecretString;
use std::time::Duration;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub db_max_connections: u32,
    pub jwt_secret: SecretString,
    pub jwt_issuer: String,
    pub token_ttl_seconds: u64,
    pub max_failed_attempts: u32,
    pub lock_duration_seconds: u64,
    pub store_timeout_seconds: u64,
    pub cache_capacity: u64,
    pub cache_idle_seconds: u64,
}

impl Args {
    #[must_use]
    pub fn gate_config(&self) -> GateConfig {
        let cache = CacheConfig::default()
            .with_capacity(self.cache_capacity)
            .with_idle(Duration::from_secs(self.cache_idle_seconds));

        GateConfig::new(self.jwt_secret.clone())
            .with_jwt_issuer(self.jwt_issuer.clone())
            .with_token_ttl(Duration::from_secs(self.token_ttl_seconds))
            .with_max_failed_attempts(self.max_failed_attempts)
            .with_lock_duration(Duration::from_secs(self.lock_duration_seconds))
            .with_store_timeout(Duration::from_secs(self.store_timeout_seconds))
            .with_cache(cache)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the gate configuration is
/// rejected, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let gate_config = args.gate_config();
    api::new(args.port, &args.dsn, args.db_max_connections, gate_config).await
}
