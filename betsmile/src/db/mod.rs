//! PostgreSQL pool setup and schema migrations for the ledger.

use crate::ledger::PgStore;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod timeouts;

pub use config::DatabaseConfig;

/// Connected pool plus the per-transaction deadline every ledger call gets.
#[derive(Clone)]
pub struct Database {
    pool: Arc<PgPool>,
    transaction_timeout: Duration,
}

impl Database {
    /// Connect, then bring the schema up to date.
    ///
    /// ```no_run
    /// use betsmile::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let config = DatabaseConfig::with_url("postgres://postgres@localhost/betsmile");
    ///     let store = Database::connect(&config).await?.ledger();
    ///     # let _ = store;
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        let db = Self {
            pool: Arc::new(pool),
            transaction_timeout: Duration::from_secs(config.transaction_timeout_secs),
        };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        Ok(())
    }

    /// Ledger store sharing this pool, bounded by the configured transaction timeout.
    pub fn ledger(&self) -> PgStore {
        PgStore::new(self.pool.clone()).with_timeout(self.transaction_timeout)
    }
}
