//! Durable job queue.
//!
//! Jobs live in the `jobs` table so that queue state survives restarts.
//! [`JobScheduler`] claims due jobs, runs them through the registered
//! [`JobHandler`] under a timeout, and applies the retry policy.

mod handlers;
mod scheduler;

pub use handlers::{parse_job_date, FetchHandler, ReindexHandler};
pub use scheduler::{retry_backoff, JobScheduler, PeriodicJob};

use async_trait::async_trait;
use std::time::Duration;

use crate::config::JobPolicyConfig;
use crate::models::{Job, JobKind};
use crate::repository::DieselError;
use crate::scrapers::ScraperError;
use crate::services::{IngestError, ReindexError};

/// Errors raised while enqueueing or running jobs.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("unknown job kind: {0}")]
    UnknownKind(String),

    #[error("no handler registered for {0}")]
    NoHandler(JobKind),

    #[error("invalid job arguments: {0}")]
    InvalidArgs(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Reindex(#[from] ReindexError),

    #[error(transparent)]
    Scraper(#[from] ScraperError),

    #[error("job timed out after {0:?}")]
    Timeout(Duration),

    #[error("database error: {0}")]
    Database(#[from] DieselError),
}

impl JobError {
    /// Failures that no retry can fix.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::UnknownKind(_) | Self::NoHandler(_) | Self::InvalidArgs(_)
        )
    }
}

/// Retry and timeout policy declared by a job kind.
///
/// Unset fields fall back to the scheduler-wide defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobPolicy {
    pub max_retries: Option<u32>,
    pub timeout: Option<Duration>,
}

impl From<&JobPolicyConfig> for JobPolicy {
    fn from(config: &JobPolicyConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            timeout: config.timeout.map(Duration::from_secs),
        }
    }
}

/// Runs one kind of job.
#[async_trait]
pub trait JobHandler: Send + Sync {
    fn kind(&self) -> JobKind;

    /// Retries after the first attempt.
    fn max_retries(&self) -> Option<u32> {
        None
    }

    /// Limit on a single attempt.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    async fn run(&self, job: &Job) -> Result<(), JobError>;
}
