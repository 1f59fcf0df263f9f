use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.db_idle_timeout_seconds))
            .max_lifetime(Duration::from_secs(config.db_max_lifetime_seconds))
            .connect(&config.database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// SQLSTATEs that mean a concurrent writer won: serialization failure,
/// deadlock, unique violation.
const CONFLICT_SQLSTATES: [&str; 3] = ["40001", "40P01", "23505"];

/// foreign_key_violation
const MISSING_REFERENCE_SQLSTATE: &str = "23503";

pub fn is_conflict(err: &anyhow::Error) -> bool {
    sqlstate(err)
        .map(|code| CONFLICT_SQLSTATES.contains(&code.as_str()))
        .unwrap_or(false)
}

/// A write referenced a row that does not exist, typically a token subject
/// with no `users` row.
pub fn is_missing_reference(err: &anyhow::Error) -> bool {
    sqlstate(err).as_deref() == Some(MISSING_REFERENCE_SQLSTATE)
}

fn sqlstate(err: &anyhow::Error) -> Option<String> {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|err| err.as_database_error())
        .and_then(|db_err| db_err.code())
        .map(|code| code.into_owned())
}
