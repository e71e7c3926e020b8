//! Source adapters for official gazette publishers.
//!
//! Each adapter turns one publisher's listing (JSON table or rendered
//! page) into [`GazetteCandidate`]s. Adapters never touch storage or the
//! database; the ingestion pipeline owns that.

pub mod browser;
pub mod governo_pi;
mod http_client;
pub mod municipios_pi;

pub use browser::{BrowserEngineConfig, BrowserFetcher, RenderedPage};
pub use governo_pi::GovernoPiauiAdapter;
pub use http_client::{
    random_user_agent, resolve_user_agent, HttpClient, HttpResponse, IMPERSONATE_USER_AGENTS,
};
pub use municipios_pi::MunicipiosPiauiAdapter;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};

/// Errors raised while listing or downloading from a publisher.
#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to parse {what}: {message}")]
    Parse { what: &'static str, message: String },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("no download link found on {0}")]
    MissingLink(String),

    #[error("{slug} does not support {selector}")]
    UnsupportedSelector {
        slug: &'static str,
        selector: FetchSelector,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl ScraperError {
    pub fn parse(what: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            what,
            message: message.to_string(),
        }
    }
}

/// Which edition(s) an adapter run should target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSelector {
    /// Gazettes published on a specific day.
    Date(NaiveDate),
    /// Whatever edition the publisher currently shows.
    CurrentEdition,
}

impl FetchSelector {
    /// Date to use for listings and key buckets; "current" means today.
    pub fn date_or_today(&self) -> NaiveDate {
        match self {
            Self::Date(date) => *date,
            Self::CurrentEdition => Local::now().date_naive(),
        }
    }
}

impl std::fmt::Display for FetchSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Date(date) => write!(f, "date {}", date.format("%Y-%m-%d")),
            Self::CurrentEdition => f.write_str("current edition"),
        }
    }
}

/// Where a candidate's bytes come from.
#[derive(Debug, Clone)]
pub enum CandidateContent {
    /// Downloaded on demand by the adapter.
    Remote { url: String },
    /// Already in memory.
    Inline(Vec<u8>),
}

/// A gazette discovered during one adapter run, not yet stored.
#[derive(Debug, Clone)]
pub struct GazetteCandidate {
    pub institution_id: i32,
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
    pub last_modified_at: Option<DateTime<Utc>>,
    /// Last segment of the artifact key, e.g. `DOEPI_71_2025.pdf`.
    pub filename: String,
    pub content_type: String,
    /// Year/month bucket of the artifact key.
    pub key_date: NaiveDate,
    pub content: CandidateContent,
}

impl GazetteCandidate {
    /// Publisher URL for remote content, for logging.
    pub fn remote_url(&self) -> Option<&str> {
        match &self.content {
            CandidateContent::Remote { url } => Some(url),
            CandidateContent::Inline(_) => None,
        }
    }
}

/// A publisher that can list and download gazettes.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier, also the first segment of artifact keys.
    fn slug(&self) -> &'static str;

    /// List candidates for the selector.
    ///
    /// An error here aborts the whole run; per-row problems are skipped
    /// inside the adapter.
    async fn list(&self, selector: FetchSelector) -> Result<Vec<GazetteCandidate>, ScraperError>;

    /// Download the bytes of a remote candidate.
    async fn download(&self, url: &str) -> Result<Vec<u8>, ScraperError>;

    /// Resolve a candidate's bytes, downloading only when needed.
    async fn resolve_content(&self, candidate: &GazetteCandidate) -> Result<Vec<u8>, ScraperError> {
        match &candidate.content {
            CandidateContent::Remote { url } => self.download(url).await,
            CandidateContent::Inline(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Last path segment of a URL or path, without query string.
pub fn filename_from_path(path: &str) -> Option<&str> {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.rsplit('/').next().filter(|name| !name.is_empty())
}
