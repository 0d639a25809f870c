// src/store/mod.rs
// Embedded relational store: schema, migrations, single-writer transaction
// discipline, concurrent readers. Grounded on examples/ConaryLabs-Mira's
// backend/src/memory/storage/sqlite/core.rs (raw sqlx::query over a shared
// SqlitePool) and backend/src/checkpoint/mod.rs's CREATE TABLE test fixture
// idiom, generalized to spec §4.1's single-writer/multi-reader contract.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{DomainError, DomainResult};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A handle to the embedded store. Cheap to clone; all clones share the
/// same connection pool and writer mutex.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    writer_lock: Arc<Mutex<()>>,
}

impl Store {
    /// Open (creating if absent) the database file at `path` and run
    /// pending migrations. `path` may also be `sqlite::memory:` for tests.
    pub async fn open(path: &str) -> DomainResult<Self> {
        let options: SqliteConnectOptions = path
            .parse::<SqliteConnectOptions>()
            .map_err(|e| DomainError::Invalid(format!("bad database path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            writer_lock: Arc::new(Mutex::new(())),
        };
        store.migrate().await?;
        Ok(store)
    }

    /// Run schema migrations. Idempotent; refuses to proceed if the
    /// database reports a schema newer than this binary knows about.
    pub async fn migrate(&self) -> DomainResult<()> {
        let _guard = self.writer_lock.lock().await;

        if let Some(applied) = self.latest_applied_version().await? {
            let known = MIGRATOR
                .migrations
                .iter()
                .map(|m| m.version)
                .max()
                .unwrap_or(0);
            if applied > known {
                return Err(DomainError::Invalid(format!(
                    "database schema version {applied} is newer than the {known} this binary understands"
                )));
            }
        }

        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(anyhow::Error::new(e)))?;

        info!("store migrations up to date");
        Ok(())
    }

    async fn latest_applied_version(&self) -> DomainResult<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT version FROM _sqlx_migrations ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .unwrap_or(None);
        Ok(row.map(|(v,)| v))
    }

    /// Execute `f` inside a single writer transaction. Only one writer
    /// transaction runs at a time across this process (spec §4.1/§5); if
    /// the lock cannot be acquired within the busy timeout the caller gets
    /// `StoreBusy`.
    pub async fn writer_txn<F, Fut, T>(&self, f: F) -> DomainResult<T>
    where
        F: FnOnce(sqlx::Transaction<'static, sqlx::Sqlite>) -> Fut,
        Fut: Future<Output = DomainResult<(sqlx::Transaction<'static, sqlx::Sqlite>, T)>>,
    {
        let _guard = match tokio::time::timeout(BUSY_TIMEOUT, self.writer_lock.lock()).await {
            Ok(guard) => guard,
            Err(_) => {
                warn!("writer lock unavailable within busy timeout");
                return Err(DomainError::StoreBusy);
            }
        };

        let txn = self.pool.begin().await?;
        let (txn, result) = f(txn).await?;
        txn.commit().await?;
        Ok(result)
    }

    /// Obtain a connection suitable for concurrent reads. Readers never
    /// contend with the writer mutex; SQLite's WAL mode lets them proceed
    /// while a writer transaction is open, observing the last committed
    /// state.
    pub fn reader_conn(&self) -> &SqlitePool {
        &self.pool
    }

    /// Raw pool access for components (like the retention task) that issue
    /// their own write statements through `writer_txn`-equivalent discipline.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_runs_migrations() {
        let store = Store::open("sqlite::memory:").await.unwrap();
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM channels")
            .fetch_one(store.reader_conn())
            .await
            .unwrap();
        assert_eq!(row.0, 0);
    }

    #[tokio::test]
    async fn writer_txn_commits() {
        let store = Store::open("sqlite::memory:").await.unwrap();
        store
            .writer_txn(|mut txn| async move {
                sqlx::query(
                    "INSERT INTO projects (id, path, name, created_at) VALUES (?, ?, ?, ?)",
                )
                .bind("abc")
                .bind("/tmp/abc")
                .bind("abc")
                .bind(0i64)
                .execute(&mut *txn)
                .await?;
                Ok((txn, ()))
            })
            .await
            .unwrap();

        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects")
            .fetch_one(store.reader_conn())
            .await
            .unwrap();
        assert_eq!(row.0, 1);
    }

    #[tokio::test]
    async fn writer_txn_rolls_back_on_error() {
        let store = Store::open("sqlite::memory:").await.unwrap();
        let result: DomainResult<()> = store
            .writer_txn(|mut txn| async move {
                sqlx::query(
                    "INSERT INTO projects (id, path, name, created_at) VALUES (?, ?, ?, ?)",
                )
                .bind("abc")
                .bind("/tmp/abc")
                .bind("abc")
                .bind(0i64)
                .execute(&mut *txn)
                .await?;
                Err(DomainError::Invalid("deliberate".into()))
            })
            .await;
        assert!(result.is_err());

        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects")
            .fetch_one(store.reader_conn())
            .await
            .unwrap();
        assert_eq!(row.0, 0);
    }
}
