//! Durable job queue models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Units of work the scheduler knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Structured-API listing of the state gazette for a date.
    FetchGovernoPiaui,
    /// Current edition of the municipal association gazette.
    FetchDiarioDosMunicipios,
    /// Reindex Batcher run.
    ReindexKnowledgeBases,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [
        Self::FetchGovernoPiaui,
        Self::FetchDiarioDosMunicipios,
        Self::ReindexKnowledgeBases,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchGovernoPiaui => "fetch_governo_piaui",
            Self::FetchDiarioDosMunicipios => "fetch_diario_dos_municipios",
            Self::ReindexKnowledgeBases => "reindex_knowledge_bases",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// Whether the kind accepts an explicit target date.
    pub fn accepts_date(&self) -> bool {
        matches!(self, Self::FetchGovernoPiaui)
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a queued job.
///
/// `scheduled -> running -> completed | retryable | discarded`;
/// `retryable` jobs go back to `running` once their backoff has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Scheduled,
    Running,
    Completed,
    Retryable,
    Discarded,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Retryable => "retryable",
            Self::Discarded => "discarded",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "retryable" => Some(Self::Retryable),
            "discarded" => Some(Self::Discarded),
            _ => None,
        }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self, Self::Completed | Self::Discarded)
    }
}

/// A job row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i32,
    pub kind: String,
    pub args: serde_json::Value,
    pub state: JobState,
    /// Attempts started so far (incremented on claim).
    pub attempt: i32,
    pub max_attempts: i32,
    pub scheduled_at: DateTime<Utc>,
    pub attempted_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn job_kind(&self) -> Option<JobKind> {
        JobKind::from_str(&self.kind)
    }

    pub fn has_attempts_left(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// Optional `date` argument used by on-demand fetch jobs.
    pub fn date_arg(&self) -> Option<&str> {
        self.args
            .get("date")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}
