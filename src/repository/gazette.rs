//! Gazette repository.
//!
//! Owns the dedup invariant: at most one row per `(institution_id, description)`,
//! enforced by a unique constraint and an insert that ignores conflicts.

use chrono::Utc;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{GazetteRecord, NewGazetteRecord};
use super::pool::{DbPool, DieselError};
use super::{format_datetime, parse_datetime, parse_datetime_opt};
use crate::models::{Gazette, NewGazette};
use crate::schema::gazettes;
use crate::with_conn;

impl From<GazetteRecord> for Gazette {
    fn from(record: GazetteRecord) -> Self {
        Gazette {
            id: record.id,
            institution_id: record.institution_id,
            description: record.description,
            source_url: record.source_url,
            published_at: parse_datetime_opt(record.published_at),
            last_modified_at: parse_datetime_opt(record.last_modified_at),
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
            indexing_submitted_at: parse_datetime_opt(record.indexing_submitted_at),
        }
    }
}

/// Gazette persistence.
#[derive(Clone)]
pub struct GazetteRepository {
    pool: DbPool,
}

impl GazetteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Check whether a gazette with this natural key is already stored.
    pub async fn exists(&self, institution_id: i32, description: &str) -> Result<bool, DieselError> {
        let count: i64 = with_conn!(self.pool, conn => {
            gazettes::table
                .filter(gazettes::institution_id.eq(institution_id))
                .filter(gazettes::description.eq(description))
                .select(count_star())
                .first(&mut conn)
                .await?
        });

        Ok(count > 0)
    }

    /// Insert a gazette, silently ignoring a natural-key conflict.
    ///
    /// Returns `true` when a new row was written and `false` when another
    /// run already stored the same gazette.
    pub async fn insert(&self, gazette: &NewGazette) -> Result<bool, DieselError> {
        let now = format_datetime(Utc::now());
        let record = NewGazetteRecord {
            institution_id: gazette.institution_id,
            description: &gazette.description,
            source_url: &gazette.source_url,
            published_at: gazette.published_at.map(format_datetime),
            last_modified_at: gazette.last_modified_at.map(format_datetime),
            created_at: &now,
            updated_at: &now,
        };

        let rows = with_conn!(self.pool, conn => {
            diesel::insert_into(gazettes::table)
                .values(&record)
                .on_conflict((gazettes::institution_id, gazettes::description))
                .do_nothing()
                .execute(&mut conn)
                .await?
        });

        Ok(rows > 0)
    }

    /// Get a gazette by id.
    pub async fn get(&self, id: i32) -> Result<Option<Gazette>, DieselError> {
        with_conn!(self.pool, conn => {
            gazettes::table
                .find(id)
                .first::<GazetteRecord>(&mut conn)
                .await
                .optional()
                .map(|opt| opt.map(Gazette::from))
        })
    }

    /// Gazettes still awaiting a reindex trigger, oldest first.
    pub async fn get_pending_indexing(&self) -> Result<Vec<Gazette>, DieselError> {
        with_conn!(self.pool, conn => {
            gazettes::table
                .filter(gazettes::indexing_submitted_at.is_null())
                .order(gazettes::id.asc())
                .load::<GazetteRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(Gazette::from).collect())
        })
    }

    /// Stamp `indexing_submitted_at` on every pending gazette of the given
    /// institutions. Already-submitted rows are left untouched.
    ///
    /// Returns the number of rows updated.
    pub async fn mark_indexing_submitted(&self, institution_ids: &[i32]) -> Result<usize, DieselError> {
        if institution_ids.is_empty() {
            return Ok(0);
        }

        let now = format_datetime(Utc::now());
        let ids = institution_ids.to_vec();

        with_conn!(self.pool, conn => {
            diesel::update(
                gazettes::table
                    .filter(gazettes::institution_id.eq_any(ids))
                    .filter(gazettes::indexing_submitted_at.is_null()),
            )
            .set((
                gazettes::indexing_submitted_at.eq(Some(&now)),
                gazettes::updated_at.eq(&now),
            ))
            .execute(&mut conn)
            .await
        })
    }

    /// Most recently ingested gazettes, optionally for one institution.
    pub async fn list_recent(
        &self,
        institution_id: Option<i32>,
        limit: i64,
    ) -> Result<Vec<Gazette>, DieselError> {
        with_conn!(self.pool, conn => {
            let mut query = gazettes::table
                .order(gazettes::id.desc())
                .limit(limit)
                .into_boxed();
            if let Some(id) = institution_id {
                query = query.filter(gazettes::institution_id.eq(id));
            }
            query
                .load::<GazetteRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(Gazette::from).collect())
        })
    }

    /// Total number of stored gazettes.
    pub async fn count(&self) -> Result<u64, DieselError> {
        let count: i64 = with_conn!(self.pool, conn => {
            gazettes::table.select(count_star()).first(&mut conn).await?
        });
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::setup_test_db;

    fn new_gazette(institution_id: i32, description: &str) -> NewGazette {
        NewGazette {
            institution_id,
            description: description.to_string(),
            source_url: format!(
                "https://bucket.nyc3.digitaloceanspaces.com/governo-pi/2025/04/{}.pdf",
                description.replace(' ', "_")
            ),
            published_at: None,
            last_modified_at: None,
        }
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let (ctx, _dir) = setup_test_db().await;
        let repo = ctx.gazettes();
        let gazette = new_gazette(1, "DOEPI Nº 71/2025");

        assert!(!repo.exists(1, "DOEPI Nº 71/2025").await.unwrap());
        assert!(repo.insert(&gazette).await.unwrap());
        assert!(repo.exists(1, "DOEPI Nº 71/2025").await.unwrap());

        // Conflict is a silent no-op
        assert!(!repo.insert(&gazette).await.unwrap());
        assert!(!repo.insert(&gazette).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 1);

        // Same description under another institution is a different gazette
        assert!(repo.insert(&new_gazette(2, "DOEPI Nº 71/2025")).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_dates_survive_roundtrip() {
        let (ctx, _dir) = setup_test_db().await;
        let repo = ctx.gazettes();

        let published = NewGazette::date_to_utc(chrono::NaiveDate::from_ymd_opt(2025, 4, 16).unwrap());
        let mut gazette = new_gazette(1, "DOEPI Nº 72/2025");
        gazette.published_at = published;
        repo.insert(&gazette).await.unwrap();

        let stored = repo.list_recent(Some(1), 10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].published_at, published);
        assert!(stored[0].last_modified_at.is_none());
        assert!(stored[0].is_pending_indexing());
    }

    #[tokio::test]
    async fn test_pending_indexing_and_marking() {
        let (ctx, _dir) = setup_test_db().await;
        let repo = ctx.gazettes();

        repo.insert(&new_gazette(1, "a")).await.unwrap();
        repo.insert(&new_gazette(2, "b")).await.unwrap();
        repo.insert(&new_gazette(1, "c")).await.unwrap();

        let pending = repo.get_pending_indexing().await.unwrap();
        let ids: Vec<i32> = pending.iter().map(|g| g.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(pending.len(), 3);

        // Only the listed institution is marked
        assert_eq!(repo.mark_indexing_submitted(&[1]).await.unwrap(), 2);
        let pending = repo.get_pending_indexing().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].institution_id, 2);

        // Already-submitted rows keep their original timestamp
        let first = repo.get(ids[0]).await.unwrap().unwrap();
        let stamped = first.indexing_submitted_at.unwrap();
        assert_eq!(repo.mark_indexing_submitted(&[1, 2]).await.unwrap(), 1);
        let first = repo.get(ids[0]).await.unwrap().unwrap();
        assert_eq!(first.indexing_submitted_at.unwrap(), stamped);

        assert_eq!(repo.mark_indexing_submitted(&[]).await.unwrap(), 0);
        assert!(repo.get_pending_indexing().await.unwrap().is_empty());
    }
}
