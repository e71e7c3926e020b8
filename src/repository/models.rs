//! Diesel ORM models for database tables.
//!
//! Timestamps are stored as RFC 3339 text so the same records work on
//! SQLite and PostgreSQL.

use diesel::prelude::*;

use crate::schema;

/// Institution record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::institutions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InstitutionRecord {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub institution_type: String,
    pub state: String,
    pub city: Option<String>,
    pub source_url: Option<String>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// New institution for insertion (ids are fixed, not generated).
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::institutions)]
pub struct NewInstitutionRecord<'a> {
    pub id: i32,
    pub name: &'a str,
    pub slug: &'a str,
    pub institution_type: &'a str,
    pub state: &'a str,
    pub city: Option<&'a str>,
    pub source_url: Option<&'a str>,
    pub active: bool,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Gazette record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::gazettes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GazetteRecord {
    pub id: i32,
    pub institution_id: i32,
    pub description: String,
    pub source_url: String,
    pub published_at: Option<String>,
    pub last_modified_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub indexing_submitted_at: Option<String>,
}

/// New gazette for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::gazettes)]
pub struct NewGazetteRecord<'a> {
    pub institution_id: i32,
    pub description: &'a str,
    pub source_url: &'a str,
    pub published_at: Option<String>,
    pub last_modified_at: Option<String>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Job record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct JobRecord {
    pub id: i32,
    pub kind: String,
    pub args: String,
    pub state: String,
    pub attempt: i32,
    pub max_attempts: i32,
    pub scheduled_at: String,
    pub attempted_at: Option<String>,
    pub finished_at: Option<String>,
    pub last_error: Option<String>,
    pub created_at: String,
}

/// New job for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::jobs)]
pub struct NewJobRecord<'a> {
    pub kind: &'a str,
    pub args: &'a str,
    pub state: &'a str,
    pub attempt: i32,
    pub max_attempts: i32,
    pub scheduled_at: &'a str,
    pub created_at: &'a str,
}
