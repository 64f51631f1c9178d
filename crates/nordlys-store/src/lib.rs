//! PostgreSQL store for the Nordlys feed generator.
//!
//! All reads and writes share a single bounded connection pool. The schema
//! is embedded and applied statement-by-statement on startup; every
//! statement is `IF NOT EXISTS` so migration is idempotent.
//!
//! Posts are exclusively owned by this crate: other components hand in
//! [`nordlys_core::Post`] values or compiled [`nordlys_core::BuiltQuery`]
//! queries and get plain row values back.

mod reader;
mod writer;

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use thiserror::Error;

/// PostgreSQL schema (embedded).
const SCHEMA: &str = include_str!("schema.sql");

/// Per-call deadline for write operations. Exceeding it yields a
/// recoverable [`StoreError::Timeout`]; the upstream cursor serves as the
/// durable replay point.
pub(crate) const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Query execution or connection failure, surfaced verbatim.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A write exceeded its deadline. Recoverable; the caller is expected
    /// to rely on cursor replay rather than retrying in place.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Connection parameters for the store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// Handle to the posts database.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Connect to PostgreSQL and size the shared pool.
    ///
    /// The pool is bounded at 20 connections with a one hour lifetime and a
    /// one hour idle timeout so transient upstream connectivity issues
    /// cannot pin stale connections.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let opts = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            user = %config.user,
            "connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .max_lifetime(Duration::from_secs(3600))
            .idle_timeout(Duration::from_secs(3600))
            .connect_with(opts)
            .await?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool; used by tests and tooling.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema.
    ///
    /// PostgreSQL rejects multiple statements in one prepared statement, so
    /// the schema is split and executed one statement at a time.
    pub async fn migrate(&self) -> StoreResult<()> {
        tracing::info!("running migrations");
        for statement in schema_statements(SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("migrations completed");
        Ok(())
    }

    /// Cheap connectivity probe for the health endpoint.
    pub async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the pool, waiting for in-flight queries to finish.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Split an embedded schema into individual non-empty statements.
fn schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}
