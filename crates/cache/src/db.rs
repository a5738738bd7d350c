//! Database connection and pool management.

use exn::ResultExt;
use sqlx::{Sqlite, SqliteConnection};
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// Concurrent ingests each hold one connection for the length of a unit of work.
const MAX_CONNECTIONS: u32 = 5;

/// A transaction on a pooled connection, as returned by [`Database::begin`].
pub type SqliteTransaction = sqlx::Transaction<'static, Sqlite>;

/// Database connection pool for upload metadata.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions, max: Option<u32>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Query-based PRAGMAs are per connection, not per pool.
            .after_connect(|conn, meta| Box::pin(async move {
                Self::apply_pragmas(conn, meta).await
            }))
            .max_connections(max.unwrap_or(MAX_CONNECTIONS))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Connect to the metadata database at the given path.
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = Self::base_options().filename(path).create_if_missing(true);
        Self::new(options, None).await
    }

    /// Connect to an in-memory database.
    ///
    /// Not gated behind `#[cfg(test)]` so that dependent crates can use it in
    /// their own tests. The data is gone once the connection closes.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        // Every connection to ":memory:" is a separate database.
        Self::new(options, Some(1)).await
    }

    /// Base connection options shared between file and in-memory databases.
    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // Readers of upload rows never block the single writer.
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            // Stored files are synced before their row is written; losing the
            // last row on power loss only leaves an unreferenced file.
            .synchronous(SqliteSynchronous::Normal)
            // WAL allows a single writer; a batch of concurrent uploads queues
            // behind it while each one holds its transaction open.
            .busy_timeout(std::time::Duration::from_millis(1500))
    }

    /// Apply PRAGMA settings that aren't exposed via SqliteConnectOptions.
    ///
    /// - `wal_autocheckpoint` below the default 1000 pages keeps the WAL short
    ///   between bursts of uploads.
    /// - `analysis_limit` bounds the `PRAGMA optimize` run by [`close`](Self::close).
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA wal_autocheckpoint = 800;
                PRAGMA analysis_limit = 1000;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Run database migrations. Called by both constructors.
    #[instrument("performing database migrations")]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin a transaction on a pooled connection.
    ///
    /// The returned transaction implements [`crate::Transaction`] and is meant
    /// to be handed to [`crate::finalize`] or [`crate::unit_of_work`]. Dropping
    /// it without settling rolls back, but silently.
    pub async fn begin(&self) -> Result<SqliteTransaction> {
        self.pool.begin().await.or_raise(|| ErrorKind::Database)
    }

    /// Close the pool once every connection has been returned to it.
    pub async fn close(&self) {
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}
