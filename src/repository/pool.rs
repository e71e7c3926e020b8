//! Unified database connection pool supporting SQLite and PostgreSQL.
//!
//! The backend is picked at runtime from the database URL. Repositories
//! hold a cloned `DbPool` and dispatch through [`with_conn!`].

use std::path::Path;

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, SimpleAsyncConnection};

#[cfg(feature = "postgres")]
use diesel_async::pooled_connection::deadpool::Pool as DeadPool;
#[cfg(feature = "postgres")]
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
#[cfg(feature = "postgres")]
use diesel_async::AsyncPgConnection;

use super::util::to_diesel_error;

/// Diesel error type alias.
pub type DieselError = diesel::result::Error;

/// Async SQLite connection type.
pub type SqliteConn = SyncConnectionWrapper<SqliteConnection>;

/// Async PostgreSQL connection type.
#[cfg(feature = "postgres")]
pub type PgConn = deadpool::managed::Object<AsyncDieselConnectionManager<AsyncPgConnection>>;

/// Default maximum number of pooled PostgreSQL connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 10;

/// Per-connection SQLite settings. Workers write concurrently, so lock
/// contention waits instead of failing immediately.
const SQLITE_CONNECTION_PRAGMAS: &str = "PRAGMA busy_timeout = 30000; PRAGMA foreign_keys = ON;";

/// SQLite connection pool (lightweight - creates connections on demand).
#[derive(Clone)]
pub struct SqlitePool {
    database_url: String,
}

impl SqlitePool {
    /// Create a new SQLite pool.
    pub fn new(database_url: &str) -> Self {
        // Strip sqlite: prefix if present
        let url = database_url.strip_prefix("sqlite:").unwrap_or(database_url);
        Self {
            database_url: url.to_string(),
        }
    }

    /// Create pool from a file path.
    pub fn from_path(path: &Path) -> Self {
        Self::new(&path.display().to_string())
    }

    /// Get a connection.
    pub async fn get(&self) -> Result<SqliteConn, DieselError> {
        let mut conn = SqliteConn::establish(&self.database_url)
            .await
            .map_err(to_diesel_error)?;
        conn.batch_execute(SQLITE_CONNECTION_PRAGMAS).await?;
        Ok(conn)
    }

    /// Get the database path.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// PostgreSQL connection pool.
#[cfg(feature = "postgres")]
#[derive(Clone)]
pub struct PgPool {
    pool: DeadPool<AsyncPgConnection>,
}

#[cfg(feature = "postgres")]
impl PgPool {
    /// Create a new PostgreSQL pool.
    pub fn new(database_url: &str, max_size: usize) -> Result<Self, DieselError> {
        let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = DeadPool::builder(config)
            .max_size(max_size)
            .build()
            .map_err(to_diesel_error)?;
        Ok(Self { pool })
    }

    /// Get a connection.
    pub async fn get(&self) -> Result<PgConn, DieselError> {
        self.pool.get().await.map_err(to_diesel_error)
    }
}

/// Unified database pool that supports both SQLite and PostgreSQL.
#[derive(Clone)]
pub enum DbPool {
    Sqlite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

impl DbPool {
    /// Create a pool from a database URL.
    ///
    /// Detects the backend from the URL:
    /// - `postgres://` or `postgresql://` → PostgreSQL (requires the `postgres` feature)
    /// - Everything else → SQLite
    pub fn from_url(url: &str) -> Result<Self, DieselError> {
        Self::from_url_with_size(url, DEFAULT_MAX_CONNECTIONS)
    }

    /// Like [`DbPool::from_url`] with an explicit PostgreSQL pool size.
    pub fn from_url_with_size(url: &str, max_size: usize) -> Result<Self, DieselError> {
        if is_postgres_url(url) {
            #[cfg(feature = "postgres")]
            return Ok(DbPool::Postgres(PgPool::new(url, max_size)?));

            #[cfg(not(feature = "postgres"))]
            {
                let _ = max_size;
                return Err(to_diesel_error(
                    "PostgreSQL URL given but this build lacks the 'postgres' feature",
                ));
            }
        }

        Ok(DbPool::Sqlite(SqlitePool::new(url)))
    }

    /// Create a SQLite pool from a file path.
    pub fn sqlite_from_path(path: &Path) -> Self {
        DbPool::Sqlite(SqlitePool::from_path(path))
    }

    /// Check if this is a SQLite backend.
    pub fn is_sqlite(&self) -> bool {
        matches!(self, DbPool::Sqlite(_))
    }

    /// Check if this is a PostgreSQL backend.
    #[cfg(feature = "postgres")]
    pub fn is_postgres(&self) -> bool {
        matches!(self, DbPool::Postgres(_))
    }
}

/// Check whether a database URL targets PostgreSQL.
pub fn is_postgres_url(url: &str) -> bool {
    url.starts_with("postgres://") || url.starts_with("postgresql://")
}

/// Macro for running database operations on either backend.
///
/// This macro handles the connection dispatch, allowing the same Diesel DSL
/// code to run on both SQLite and PostgreSQL.
///
/// # Example
/// ```ignore
/// with_conn!(self.pool, conn => {
///     gazettes::table.load::<GazetteRecord>(&mut conn).await
/// })
/// ```
#[macro_export]
macro_rules! with_conn {
    ($pool:expr, $conn:ident => $body:expr) => {{
        match &$pool {
            $crate::repository::pool::DbPool::Sqlite(pool) => {
                let mut $conn = pool.get().await?;
                $body
            }
            #[cfg(feature = "postgres")]
            $crate::repository::pool::DbPool::Postgres(pool) => {
                let mut $conn = pool.get().await?;
                $body
            }
        }
    }};
}

/// Macro for running database operations that need different SQL per backend.
///
/// # Example
/// ```ignore
/// with_conn_split!(self.pool,
///     sqlite: conn => { Self::init_sqlite_schema(&mut conn).await },
///     postgres: conn => { Self::init_postgres_schema(&mut conn).await }
/// )
/// ```
#[macro_export]
macro_rules! with_conn_split {
    ($pool:expr, sqlite: $sqlite_conn:ident => $sqlite_body:expr, postgres: $pg_conn:ident => $pg_body:expr) => {{
        match &$pool {
            $crate::repository::pool::DbPool::Sqlite(pool) => {
                let mut $sqlite_conn = pool.get().await?;
                $sqlite_body
            }
            #[cfg(feature = "postgres")]
            $crate::repository::pool::DbPool::Postgres(pool) => {
                let mut $pg_conn = pool.get().await?;
                $pg_body
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_detection() {
        assert!(DbPool::from_url("/path/to/db.sqlite").unwrap().is_sqlite());
        assert!(DbPool::from_url("sqlite:/path/to/db").unwrap().is_sqlite());

        #[cfg(not(feature = "postgres"))]
        assert!(DbPool::from_url("postgres://localhost/radar").is_err());

        #[cfg(feature = "postgres")]
        assert!(DbPool::from_url("postgresql://localhost/radar")
            .unwrap()
            .is_postgres());
    }

    #[test]
    fn test_sqlite_prefix_stripped() {
        let pool = SqlitePool::new("sqlite:/tmp/radar.db");
        assert_eq!(pool.database_url(), "/tmp/radar.db");
    }
}
