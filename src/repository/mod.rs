//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM with compile-time query checking.
//! Supports both SQLite and PostgreSQL backends.

pub mod context;
pub mod models;
pub mod pool;
pub mod util;

mod gazette;
mod institution;
mod job;

pub use context::DbContext;
pub use gazette::GazetteRepository;
pub use institution::InstitutionRepository;
pub use job::{JobRepository, PurgeCounts};
pub use pool::{DbPool, DieselError};

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp for storage.
///
/// Fixed precision and a `Z` suffix keep stored values lexicographically
/// ordered, which the queue and retention queries rely on.
pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use tempfile::TempDir;

    use super::DbContext;

    /// Fresh SQLite database with the full schema.
    pub async fn setup_test_db() -> (DbContext, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let ctx = DbContext::new(&db_path);
        ctx.init_schema().await.unwrap();
        (ctx, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_format_datetime_orders_lexicographically() {
        let base = Utc.with_ymd_and_hms(2025, 4, 16, 10, 0, 0).unwrap();
        let later = base + Duration::milliseconds(5);
        assert!(format_datetime(base) < format_datetime(later));
        assert_eq!(format_datetime(base), "2025-04-16T10:00:00.000000Z");
    }

    #[test]
    fn test_parse_datetime_roundtrip() {
        let now = Utc::now();
        let parsed = parse_datetime(&format_datetime(now));
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
        assert_eq!(parse_datetime("garbage"), DateTime::UNIX_EPOCH);
        assert!(parse_datetime_opt(None).is_none());
    }
}
