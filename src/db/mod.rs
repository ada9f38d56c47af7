//! Storage layer: store abstraction, backends, and the transaction retry
//! executor.
//!
//! The engines consume the [`OlympiadStore`] / [`StoreSession`] traits only;
//! [`PgStore`] backs them with PostgreSQL via sqlx, and [`MemoryStore`] is a
//! versioned in-memory implementation for tests and local tooling. Every
//! mutating engine step runs through [`TxRetryExecutor`], which owns the
//! bounded retry-on-transient-failure policy.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod config;
pub mod memory;
pub mod pg;
pub mod repository;
pub mod retry;

pub use config::DatabaseConfig;
pub use memory::MemoryStore;
pub use pg::PgStore;
pub use repository::{OlympiadStore, StoreError, StoreResult, StoreSession};
pub use retry::{RetryError, RetryOptions, TransientError, TxRetryExecutor};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Arguments
    ///
    /// * `config` - Database configuration
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use olympiad_core::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let config = DatabaseConfig::from_env();
    ///     let db = Database::new(&config).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}
