//! PostgreSQL store (source of truth)
//!
//! Integrity rules are table constraints (see `migrations/`); the code here
//! translates constraint violations into `StoreError` variants.
mod content;
mod follows;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use super::{StoreResult, UserDirectory};
use crate::config::DatabaseConfig;
use crate::models::UserRef;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let connect_options =
            PgConnectOptions::from_str(&config.url).context("Failed to parse DATABASE_URL")?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect_with(connect_options)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Make sure a referenced user has a row before it is used as a foreign key.
    async fn ensure_user_exists(&self, user: &UserRef) -> StoreResult<()> {
        self.write_user(user, false).await
    }

    /// Insert `user`, or refresh its username when `refresh` is set.
    ///
    /// Usernames are unique: another id still holding `user.username` is a
    /// stale row from a rename at the identity provider and is renamed to
    /// `stale-<id>` in the same transaction.
    async fn write_user(&self, user: &UserRef, refresh: bool) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user.id)
            .fetch_one(&mut *tx)
            .await?;
        if exists && !refresh {
            return Ok(());
        }

        let released = sqlx::query(
            r#"
            UPDATE users
            SET username = 'stale-' || id::text
            WHERE username = $1 AND id <> $2
            "#,
        )
        .bind(&user.username)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;
        if released.rows_affected() > 0 {
            warn!(
                user_id = %user.id,
                username = %user.username,
                "Released username held by a stale user row"
            );
        }

        sqlx::query(
            r#"
            INSERT INTO users (id, username)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn upsert_user(&self, user: &UserRef) -> StoreResult<()> {
        self.write_user(user, true).await?;
        debug!(user_id = %user.id, username = %user.username, "Upserted user");
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRef>> {
        let user = sqlx::query_as::<_, UserRef>("SELECT id, username FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

/// SQLSTATE of a database-side error, if the error came from the server.
fn sqlstate(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code.into_owned())
}

fn is_violation(err: &sqlx::Error, code: &str) -> bool {
    sqlstate(err).as_deref() == Some(code)
}

/// Escape `%`, `_` and `\` so user input is matched literally by `ILIKE`.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("bob"), "%bob%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
