//! Reindex trigger and batcher.
//!
//! Gazettes are indexed per knowledge base, not per document: one trigger
//! call re-reads every artifact that feeds the knowledge base. The batcher
//! therefore triggers each knowledge base at most once per run and clears
//! all of its institutions together.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{KnowledgeBaseConfig, ReindexConfig};
use crate::repository::{DieselError, GazetteRepository};

/// Errors from the reindex service or the batcher's bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum ReindexError {
    #[error("reindex token not configured (set DO_API_KEY)")]
    MissingToken,

    #[error("reindex request for {knowledge_base} failed: {source}")]
    Request {
        knowledge_base: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("reindex request for {knowledge_base} returned HTTP {status}")]
    Status { knowledge_base: String, status: u16 },

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("database error: {0}")]
    Database(#[from] DieselError),
}

/// A knowledge base and the institutions feeding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBase {
    pub uuid: String,
    pub institution_ids: Vec<i32>,
}

impl KnowledgeBase {
    pub fn new(uuid: impl Into<String>, institution_ids: Vec<i32>) -> Self {
        Self {
            uuid: uuid.into(),
            institution_ids,
        }
    }
}

impl From<&KnowledgeBaseConfig> for KnowledgeBase {
    fn from(config: &KnowledgeBaseConfig) -> Self {
        Self::new(config.uuid.clone(), config.institution_ids.clone())
    }
}

/// Starts an indexing job for one knowledge base.
#[async_trait]
pub trait ReindexTrigger: Send + Sync {
    async fn trigger(&self, knowledge_base: &str) -> Result<(), ReindexError>;
}

#[derive(Serialize)]
struct IndexingJobRequest<'a> {
    knowledge_base_uuid: &'a str,
}

/// Reindex trigger calling the hosted indexing-jobs endpoint.
pub struct HttpReindexTrigger {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpReindexTrigger {
    pub fn new(config: &ReindexConfig, token: Option<String>) -> Result<Self, ReindexError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| ReindexError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            token,
        })
    }
}

#[async_trait]
impl ReindexTrigger for HttpReindexTrigger {
    async fn trigger(&self, knowledge_base: &str) -> Result<(), ReindexError> {
        let token = self.token.as_deref().ok_or(ReindexError::MissingToken)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&IndexingJobRequest {
                knowledge_base_uuid: knowledge_base,
            })
            .send()
            .await
            .map_err(|source| ReindexError::Request {
                knowledge_base: knowledge_base.to_string(),
                source,
            })?;

        let status = response.status();
        if status.as_u16() >= 300 {
            return Err(ReindexError::Status {
                knowledge_base: knowledge_base.to_string(),
                status: status.as_u16(),
            });
        }

        debug!("Indexing job accepted for {} ({})", knowledge_base, status);
        Ok(())
    }
}

/// Outcome of one batcher run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReindexReport {
    /// Gazettes pending when the run started.
    pub pending: usize,
    /// Knowledge bases whose trigger succeeded.
    pub triggered: Vec<String>,
    /// Knowledge bases whose trigger failed.
    pub failed: Vec<String>,
    /// Gazette rows stamped as submitted.
    pub marked: usize,
    /// Pending institutions no knowledge base covers.
    pub unmapped: Vec<i32>,
}

/// Groups pending gazettes by knowledge base and triggers each once.
#[derive(Clone)]
pub struct ReindexBatcher {
    gazettes: GazetteRepository,
    trigger: Arc<dyn ReindexTrigger>,
    knowledge_bases: Vec<KnowledgeBase>,
}

impl ReindexBatcher {
    pub fn new(
        gazettes: GazetteRepository,
        trigger: Arc<dyn ReindexTrigger>,
        knowledge_bases: Vec<KnowledgeBase>,
    ) -> Self {
        Self {
            gazettes,
            trigger,
            knowledge_bases,
        }
    }

    /// Build a batcher from the configured mapping.
    pub fn from_config(
        gazettes: GazetteRepository,
        trigger: Arc<dyn ReindexTrigger>,
        config: &ReindexConfig,
    ) -> Self {
        let knowledge_bases = config.knowledge_bases.iter().map(KnowledgeBase::from).collect();
        Self::new(gazettes, trigger, knowledge_bases)
    }

    /// Run one batch.
    ///
    /// Trigger failures are logged and left for the next run; only
    /// repository errors fail the run.
    pub async fn run(&self) -> Result<ReindexReport, ReindexError> {
        let pending = self.gazettes.get_pending_indexing().await?;
        if pending.is_empty() {
            info!("No gazettes pending indexing");
            return Ok(ReindexReport::default());
        }

        let institutions: BTreeSet<i32> = pending.iter().map(|g| g.institution_id).collect();
        let mut report = ReindexReport {
            pending: pending.len(),
            ..Default::default()
        };
        info!(
            "{} gazette(s) pending indexing across institution(s) {:?}",
            pending.len(),
            institutions
        );

        report.unmapped = institutions
            .iter()
            .copied()
            .filter(|id| {
                !self
                    .knowledge_bases
                    .iter()
                    .any(|kb| kb.institution_ids.contains(id))
            })
            .collect();
        for id in &report.unmapped {
            warn!(
                "Institution {} has pending gazettes but no knowledge base; they stay pending",
                id
            );
        }

        for kb in &self.knowledge_bases {
            // A mapping may list the same knowledge base twice
            if report.triggered.contains(&kb.uuid) || report.failed.contains(&kb.uuid) {
                continue;
            }
            if !kb.institution_ids.iter().any(|id| institutions.contains(id)) {
                continue;
            }

            match self.trigger.trigger(&kb.uuid).await {
                Ok(()) => {
                    info!("Reindex triggered for knowledge base {}", kb.uuid);
                    report.triggered.push(kb.uuid.clone());
                    let marked = self
                        .gazettes
                        .mark_indexing_submitted(&kb.institution_ids)
                        .await?;
                    debug!(
                        "Marked {} gazette(s) of institutions {:?} as submitted",
                        marked, kb.institution_ids
                    );
                    report.marked += marked;
                }
                Err(e) => {
                    warn!("Failed to trigger reindex for knowledge base {}: {}", kb.uuid, e);
                    report.failed.push(kb.uuid.clone());
                }
            }
        }

        Ok(report)
    }
}
