//! SQLite persistence for Formstead
//!
//! One [`SqliteStore`] owns the connection pool and implements both store
//! capabilities ([`FormStore`] and [`SubmissionStore`]). Callers that only
//! need one side should depend on the trait, not on the concrete store.
//!
//! # Usage
//!
//! ```rust,ignore
//! use formstead_db::{FormStore, SqliteStore, StoreConfig};
//!
//! let store = SqliteStore::open("~/.formstead/formstead.sqlite3", StoreConfig::default()).await?;
//! let form_id = store.create_form(user_id, "Contact", "Site contact form", &fields).await?;
//! let live = store.live_instance(form_id).await?;
//! ```

mod error;
mod forms;
mod schema;
mod store;
mod submissions;
mod types;
mod users;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{FormError, Result};
pub use store::{FormStore, SubmissionStore};
pub use types::*;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Tunables for a [`SqliteStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Upper bound on any single write transaction.
    pub transaction_timeout: Duration,
    pub max_connections: u32,
    /// How long a connection waits on SQLite's write lock before giving up.
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            transaction_timeout: Duration::from_secs(3),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl StoreConfig {
    pub fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }
}

/// Form and submission store backed by a SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    config: StoreConfig,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    ///
    /// Creates all tables if they don't exist.
    pub async fn open(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool, config };
        store.ensure_schema().await?;

        info!(path = %path.display(), "Database opened");

        Ok(store)
    }

    /// Open an existing database (fails if not exists).
    pub async fn open_existing(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(FormError::not_found(format!(
                "Database not found: {}",
                path.display()
            )));
        }

        Self::open(path, config).await
    }

    /// Private in-memory database.
    ///
    /// An in-memory SQLite database lives and dies with its connection, so
    /// the pool is pinned to a single connection that is never recycled.
    pub async fn open_in_memory(config: StoreConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool, config };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Get the underlying connection pool (escape hatch for complex queries).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Close the database connection.
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Run a transactional operation under a time budget.
    ///
    /// On expiry the operation's future is dropped, which drops its open
    /// transaction and rolls it back.
    pub(crate) async fn bounded<T, F>(&self, budget: Duration, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if budget.is_zero() {
            warn!(op, "Deadline already passed, transaction not started");
            return Err(FormError::TransactionTimeout(budget));
        }
        match tokio::time::timeout(budget, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(op, budget_ms = budget.as_millis() as u64, "Transaction timed out, rolled back");
                Err(FormError::TransactionTimeout(budget))
            }
        }
    }
}

// Timestamp utilities
impl SqliteStore {
    /// Current time as milliseconds since Unix epoch.
    pub fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Convert milliseconds to DateTime.
    pub fn millis_to_datetime(millis: i64) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }
}
