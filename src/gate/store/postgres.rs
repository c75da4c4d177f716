//! `PostgreSQL` credential store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::{CredentialStore, StoreError};
use crate::gate::account::{Account, AccountId, NewAccount};

pub const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(Clone, Debug)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    let role: String = row.try_get("role")?;
    let failed_attempts: i32 = row.try_get("failed_attempts")?;
    Ok(Account {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        role: role
            .parse()
            .map_err(|err: crate::gate::account::UnknownRole| StoreError::Corrupt(err.to_string()))?,
        failed_attempts: u32::try_from(failed_attempts)
            .map_err(|_| StoreError::Corrupt(format!("negative failed_attempts: {failed_attempts}")))?,
        locked_until: row.try_get("locked_until")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let query = r"
            SELECT id, username, password_hash, role, failed_attempts, locked_until
            FROM users
            WHERE username = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, StoreError> {
        let query = "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1) AS taken";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(username)
            .fetch_one(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.try_get("taken")?)
    }

    async fn save(&self, account: NewAccount) -> Result<Account, StoreError> {
        let query = r"
            INSERT INTO users (id, username, password_hash, role)
            VALUES ($1, $2, $3, $4)
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let id = Uuid::now_v7();
        let result = sqlx::query(query)
            .bind(id)
            .bind(&account.username)
            .bind(&account.password_hash)
            .bind(account.role.as_str())
            .execute(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(_) => Ok(account.into_account(id)),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(err.into()),
        }
    }

    async fn increment_failed_attempts(
        &self,
        id: AccountId,
        threshold: u32,
        lock_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        // Right-hand `failed_attempts` is the pre-update value; the row lock plus
        // the re-checked WHERE clause serialise concurrent failures.
        let query = r"
            UPDATE users
            SET failed_attempts = failed_attempts + 1,
                locked_until = CASE
                    WHEN failed_attempts + 1 >= $2 THEN $3
                    ELSE locked_until
                END
            WHERE id = $1
              AND (locked_until IS NULL OR locked_until <= $4)
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let threshold = i32::try_from(threshold).unwrap_or(i32::MAX);
        sqlx::query(query)
            .bind(id)
            .bind(threshold)
            .bind(lock_until)
            .bind(now)
            .execute(&self.pool)
            .instrument(span)
            .await?;

        Ok(())
    }

    async fn reset_failed_attempts(&self, id: AccountId) -> Result<(), StoreError> {
        let query = "UPDATE users SET failed_attempts = 0, locked_until = NULL WHERE id = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }
}
