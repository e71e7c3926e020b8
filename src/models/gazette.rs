//! Gazette (diário) models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One ingested official-publication document.
///
/// `(institution_id, description)` is the natural key; the repository
/// guarantees at most one row per pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gazette {
    pub id: i32,
    pub institution_id: i32,
    pub description: String,
    /// Public URL of the stored artifact (not the publisher URL).
    pub source_url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub last_modified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `None` while the gazette still awaits a reindex trigger.
    pub indexing_submitted_at: Option<DateTime<Utc>>,
}

impl Gazette {
    pub fn is_pending_indexing(&self) -> bool {
        self.indexing_submitted_at.is_none()
    }
}

/// Gazette row ready for insertion, built after a successful upload.
#[derive(Debug, Clone)]
pub struct NewGazette {
    pub institution_id: i32,
    pub description: String,
    pub source_url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl NewGazette {
    /// Convenience for dates that carry no time of day.
    pub fn date_to_utc(date: NaiveDate) -> Option<DateTime<Utc>> {
        date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
    }
}
