//! Handlers for the built-in job kinds.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{info, warn};

use super::{JobError, JobHandler, JobPolicy};
use crate::models::{Job, JobKind};
use crate::scrapers::{FetchSelector, SourceAdapter};
use crate::services::{IngestionPipeline, ReindexBatcher};

/// Parse an ISO `YYYY-MM-DD` job date.
pub fn parse_job_date(value: &str) -> Result<NaiveDate, JobError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| JobError::InvalidArgs(format!("invalid date {:?}, expected YYYY-MM-DD", value)))
}

/// Runs one source adapter through the ingestion pipeline.
pub struct FetchHandler {
    kind: JobKind,
    adapter: Arc<dyn SourceAdapter>,
    pipeline: IngestionPipeline,
    policy: JobPolicy,
}

impl FetchHandler {
    pub fn new(kind: JobKind, adapter: Arc<dyn SourceAdapter>, pipeline: IngestionPipeline) -> Self {
        Self {
            kind,
            adapter,
            pipeline,
            policy: JobPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: JobPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn selector(&self, job: &Job) -> Result<FetchSelector, JobError> {
        if !self.kind.accepts_date() {
            if let Some(date) = job.date_arg() {
                warn!("Job {} ({}) ignores date argument {}", job.id, self.kind, date);
            }
            return Ok(FetchSelector::CurrentEdition);
        }

        Ok(match job.date_arg() {
            Some(date) => FetchSelector::Date(parse_job_date(date)?),
            None => FetchSelector::Date(chrono::Local::now().date_naive()),
        })
    }
}

#[async_trait]
impl JobHandler for FetchHandler {
    fn kind(&self) -> JobKind {
        self.kind
    }

    fn max_retries(&self) -> Option<u32> {
        self.policy.max_retries
    }

    fn timeout(&self) -> Option<Duration> {
        self.policy.timeout
    }

    async fn run(&self, job: &Job) -> Result<(), JobError> {
        let selector = self.selector(job)?;
        let report = self.pipeline.run(self.adapter.as_ref(), selector).await?;
        info!(
            "Job {} ({}) ingested {} new gazette(s) from {}",
            job.id,
            self.kind,
            report.inserted,
            self.adapter.slug()
        );
        Ok(())
    }
}

/// Runs the reindex batcher.
pub struct ReindexHandler {
    batcher: ReindexBatcher,
    policy: JobPolicy,
}

impl ReindexHandler {
    pub fn new(batcher: ReindexBatcher) -> Self {
        Self {
            batcher,
            policy: JobPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: JobPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait]
impl JobHandler for ReindexHandler {
    fn kind(&self) -> JobKind {
        JobKind::ReindexKnowledgeBases
    }

    fn max_retries(&self) -> Option<u32> {
        self.policy.max_retries
    }

    fn timeout(&self) -> Option<Duration> {
        self.policy.timeout
    }

    async fn run(&self, job: &Job) -> Result<(), JobError> {
        let report = self.batcher.run().await?;
        info!(
            "Job {} triggered {} knowledge base(s), {} failed, {} gazette(s) marked",
            job.id,
            report.triggered.len(),
            report.failed.len(),
            report.marked
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_job_date() {
        assert_eq!(
            parse_job_date("2025-04-16").unwrap(),
            NaiveDate::from_ymd_opt(2025, 4, 16).unwrap()
        );
        assert!(matches!(
            parse_job_date("16/04/2025"),
            Err(JobError::InvalidArgs(_))
        ));
        assert!(parse_job_date("2025-02-30").is_err());
    }
}
