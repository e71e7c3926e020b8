//! Institution repository.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{InstitutionRecord, NewInstitutionRecord};
use super::pool::{DbPool, DieselError};
use super::{format_datetime, parse_datetime};
use crate::models::{Institution, InstitutionType, KnownInstitution};
use crate::schema::institutions;
use crate::with_conn;

impl From<InstitutionRecord> for Institution {
    fn from(record: InstitutionRecord) -> Self {
        Institution {
            id: record.id,
            name: record.name,
            slug: record.slug,
            institution_type: InstitutionType::from_str(&record.institution_type)
                .unwrap_or(InstitutionType::State),
            state: record.state,
            city: record.city,
            source_url: record.source_url,
            active: record.active,
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
        }
    }
}

/// Publishing institutions.
#[derive(Clone)]
pub struct InstitutionRepository {
    pool: DbPool,
}

impl InstitutionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get an institution by id.
    pub async fn get(&self, id: i32) -> Result<Option<Institution>, DieselError> {
        with_conn!(self.pool, conn => {
            institutions::table
                .find(id)
                .first::<InstitutionRecord>(&mut conn)
                .await
                .optional()
                .map(|opt| opt.map(Institution::from))
        })
    }

    /// Get an institution by slug.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Institution>, DieselError> {
        with_conn!(self.pool, conn => {
            institutions::table
                .filter(institutions::slug.eq(slug))
                .first::<InstitutionRecord>(&mut conn)
                .await
                .optional()
                .map(|opt| opt.map(Institution::from))
        })
    }

    /// All institutions ordered by id.
    pub async fn get_all(&self) -> Result<Vec<Institution>, DieselError> {
        with_conn!(self.pool, conn => {
            institutions::table
                .order(institutions::id.asc())
                .load::<InstitutionRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(Institution::from).collect())
        })
    }

    /// Insert an institution unless its id is already taken.
    ///
    /// Returns whether a row was inserted.
    pub async fn insert_if_missing(&self, institution: &Institution) -> Result<bool, DieselError> {
        let created_at = format_datetime(institution.created_at);
        let updated_at = format_datetime(institution.updated_at);
        let record = NewInstitutionRecord {
            id: institution.id,
            name: &institution.name,
            slug: &institution.slug,
            institution_type: institution.institution_type.as_str(),
            state: &institution.state,
            city: institution.city.as_deref(),
            source_url: institution.source_url.as_deref(),
            active: institution.active,
            created_at: &created_at,
            updated_at: &updated_at,
        };

        let rows = with_conn!(self.pool, conn => {
            diesel::insert_into(institutions::table)
                .values(&record)
                .on_conflict(institutions::id)
                .do_nothing()
                .execute(&mut conn)
                .await?
        });

        Ok(rows > 0)
    }

    /// Seed the publishers that have a built-in adapter. Idempotent.
    pub async fn seed_known(&self) -> Result<usize, DieselError> {
        let now = Utc::now();
        let mut inserted = 0;
        for known in KnownInstitution::ALL {
            if self.insert_if_missing(&known.to_institution(now)).await? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}
