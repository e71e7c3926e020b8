//! Database context for managing connections and repository access.
//!
//! The DbContext is the primary entry point for all database operations.
//! It holds the connection pool and hands out repositories that share it.

use std::path::Path;

use diesel_async::SimpleAsyncConnection;
use tracing::debug;

use super::gazette::GazetteRepository;
use super::institution::InstitutionRepository;
use super::job::JobRepository;
use super::pool::{DbPool, DieselError, SqliteConn};
use super::util::to_diesel_error;
use crate::with_conn_split;

#[cfg(feature = "postgres")]
use diesel_async::AsyncPgConnection;

/// Tables the worker refuses to start without.
pub const REQUIRED_TABLES: &[&str] = &["gazettes", "institutions", "jobs"];

/// Database context that manages the connection pool and provides repository access.
///
/// Build one at process start and pass clones to the components that need it.
///
/// # Example
/// ```ignore
/// let ctx = DbContext::from_url("sqlite:radaroficial.db")?;
/// ctx.init_schema().await?;
/// let pending = ctx.gazettes().get_pending_indexing().await?;
/// ```
#[derive(Clone)]
pub struct DbContext {
    pool: DbPool,
}

impl DbContext {
    /// Create a context from a database file path (SQLite only).
    pub fn new(db_path: &Path) -> Self {
        Self {
            pool: DbPool::sqlite_from_path(db_path),
        }
    }

    /// Create a context from a database URL.
    ///
    /// Supports:
    /// - SQLite: file paths or `sqlite:` URLs
    /// - PostgreSQL: `postgres://` or `postgresql://` URLs
    pub fn from_url(url: &str) -> Result<Self, DieselError> {
        Ok(Self {
            pool: DbPool::from_url(url)?,
        })
    }

    /// Create a context from a database URL with an explicit pool size.
    pub fn from_url_with_size(url: &str, max_connections: usize) -> Result<Self, DieselError> {
        Ok(Self {
            pool: DbPool::from_url_with_size(url, max_connections)?,
        })
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Get a gazette repository.
    pub fn gazettes(&self) -> GazetteRepository {
        GazetteRepository::new(self.pool.clone())
    }

    /// Get an institution repository.
    pub fn institutions(&self) -> InstitutionRepository {
        InstitutionRepository::new(self.pool.clone())
    }

    /// Get a job queue repository.
    pub fn jobs(&self) -> JobRepository {
        JobRepository::new(self.pool.clone())
    }

    /// Create all tables if they don't exist and seed the known institutions.
    pub async fn init_schema(&self) -> Result<(), DieselError> {
        with_conn_split!(self.pool,
            sqlite: conn => {
                Self::init_sqlite_schema(&mut conn).await?
            },
            postgres: conn => {
                Self::init_postgres_schema(&mut conn).await?
            }
        );

        let seeded = self.institutions().seed_known().await?;
        debug!("Schema ready, {} institution(s) seeded", seeded);
        Ok(())
    }

    async fn init_sqlite_schema(conn: &mut SqliteConn) -> Result<(), DieselError> {
        conn.batch_execute(
            r#"
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS institutions (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                institution_type TEXT NOT NULL,
                state TEXT NOT NULL,
                city TEXT,
                source_url TEXT,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS gazettes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                institution_id INTEGER NOT NULL REFERENCES institutions(id),
                description TEXT NOT NULL,
                source_url TEXT NOT NULL,
                published_at TEXT,
                last_modified_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                indexing_submitted_at TEXT,
                UNIQUE(institution_id, description)
            );

            CREATE INDEX IF NOT EXISTS idx_gazettes_pending
                ON gazettes(indexing_submitted_at, institution_id);

            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                args TEXT NOT NULL DEFAULT '{}',
                state TEXT NOT NULL DEFAULT 'scheduled',
                attempt INTEGER NOT NULL DEFAULT 0,
                max_attempts INTEGER NOT NULL,
                scheduled_at TEXT NOT NULL,
                attempted_at TEXT,
                finished_at TEXT,
                last_error TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_fetchable ON jobs(state, scheduled_at);
            CREATE INDEX IF NOT EXISTS idx_jobs_finished ON jobs(state, finished_at);
            "#,
        )
        .await
    }

    #[cfg(feature = "postgres")]
    async fn init_postgres_schema(conn: &mut AsyncPgConnection) -> Result<(), DieselError> {
        use diesel_async::RunQueryDsl;

        // PostgreSQL requires separate statements
        let statements = [
            r#"CREATE TABLE IF NOT EXISTS institutions (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                institution_type TEXT NOT NULL,
                state TEXT NOT NULL,
                city TEXT,
                source_url TEXT,
                active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )"#,
            r#"CREATE TABLE IF NOT EXISTS gazettes (
                id SERIAL PRIMARY KEY,
                institution_id INTEGER NOT NULL REFERENCES institutions(id),
                description TEXT NOT NULL,
                source_url TEXT NOT NULL,
                published_at TEXT,
                last_modified_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                indexing_submitted_at TEXT,
                UNIQUE(institution_id, description)
            )"#,
            "CREATE INDEX IF NOT EXISTS idx_gazettes_pending ON gazettes(indexing_submitted_at, institution_id)",
            r#"CREATE TABLE IF NOT EXISTS jobs (
                id SERIAL PRIMARY KEY,
                kind TEXT NOT NULL,
                args TEXT NOT NULL DEFAULT '{}',
                state TEXT NOT NULL DEFAULT 'scheduled',
                attempt INTEGER NOT NULL DEFAULT 0,
                max_attempts INTEGER NOT NULL,
                scheduled_at TEXT NOT NULL,
                attempted_at TEXT,
                finished_at TEXT,
                last_error TEXT,
                created_at TEXT NOT NULL
            )"#,
            "CREATE INDEX IF NOT EXISTS idx_jobs_fetchable ON jobs(state, scheduled_at)",
            "CREATE INDEX IF NOT EXISTS idx_jobs_finished ON jobs(state, finished_at)",
        ];

        for stmt in statements {
            diesel::sql_query(stmt).execute(conn).await?;
        }

        Ok(())
    }

    /// Verify the connection works.
    pub async fn test_connection(&self) -> Result<(), DieselError> {
        with_conn_split!(self.pool,
            sqlite: conn => {
                conn.batch_execute("SELECT 1").await
            },
            postgres: conn => {
                conn.batch_execute("SELECT 1").await
            }
        )
    }

    /// Get list of all tables in the database.
    pub async fn list_tables(&self) -> Result<Vec<String>, DieselError> {
        with_conn_split!(self.pool,
            sqlite: conn => {
                let rows: Vec<TableName> = diesel_async::RunQueryDsl::load(
                    diesel::sql_query(
                        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                    ),
                    &mut conn,
                )
                .await?;
                Ok(rows.into_iter().map(|r| r.name).collect())
            },
            postgres: conn => {
                use diesel_async::RunQueryDsl;
                let rows: Vec<TableName> = diesel::sql_query(
                    "SELECT tablename as name FROM pg_tables WHERE schemaname = 'public' ORDER BY tablename",
                )
                .load(&mut conn)
                .await?;
                Ok(rows.into_iter().map(|r| r.name).collect())
            }
        )
    }

    /// Fail if any table the pipeline depends on is missing.
    pub async fn verify_tables(&self) -> Result<(), DieselError> {
        let tables = self.list_tables().await?;
        let missing: Vec<&str> = REQUIRED_TABLES
            .iter()
            .copied()
            .filter(|t| !tables.iter().any(|existing| existing == t))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(to_diesel_error(format!(
                "missing required table(s): {} (run 'radar init')",
                missing.join(", ")
            )))
        }
    }
}

#[derive(diesel::QueryableByName)]
struct TableName {
    #[diesel(sql_type = diesel::sql_types::Text)]
    name: String,
}
