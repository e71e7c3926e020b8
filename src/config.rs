//! Configuration management for Radar Oficial using the prefer crate.
//!
//! Precedence, lowest to highest: built-in defaults, config file
//! (discovered by `prefer` or given with `--config`), environment variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::repository::pool::is_postgres_url;
use crate::repository::DbContext;
use crate::scrapers::BrowserEngineConfig;

/// Default database URL (SQLite file in the working directory).
pub const DEFAULT_DATABASE_URL: &str = "sqlite:radaroficial.db";

/// Default Spaces bucket holding gazette artifacts.
pub const DEFAULT_BUCKET: &str = "radar-oficial-diarios-piaui";

/// Default Spaces region. Spaces ignores it but the S3 signer requires one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default endpoint that starts knowledge-base indexing jobs.
pub const DEFAULT_REINDEX_ENDPOINT: &str = "https://api.digitalocean.com/v2/gen-ai/indexing_jobs";

/// Knowledge base fed by both Piauí gazettes.
pub const DEFAULT_KNOWLEDGE_BASE_UUID: &str = "a4fc4135-1a22-11f0-bf8f-4e013e2ddde4";

/// Object storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, prefer::FromValue)]
pub struct StorageConfig {
    /// Spaces endpoint host, e.g. `nyc3.digitaloceanspaces.com`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default = "default_bucket")]
    #[prefer(default = "radar-oficial-diarios-piaui")]
    pub bucket: String,
    #[serde(default = "default_region")]
    #[prefer(default = "us-east-1")]
    pub region: String,
    /// Canned ACL applied to uploads.
    #[serde(default = "default_acl")]
    #[prefer(default = "public-read")]
    pub acl: String,
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_acl() -> String {
    "public-read".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            bucket: default_bucket(),
            region: default_region(),
            acl: default_acl(),
        }
    }
}

impl StorageConfig {
    /// Overlay `DO_SPACES_*` environment variables.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(endpoint) = env_var("DO_SPACES_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
        if let Some(bucket) = env_var("DO_SPACES_BUCKET") {
            self.bucket = bucket;
        }
        if let Some(region) = env_var("DO_SPACES_REGION") {
            self.region = region;
        }
        self
    }
}

/// A knowledge base and the institutions whose gazettes feed it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, prefer::FromValue)]
pub struct KnowledgeBaseConfig {
    pub uuid: String,
    #[serde(default)]
    #[prefer(default)]
    pub institution_ids: Vec<i32>,
}

/// Reindex service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, prefer::FromValue)]
pub struct ReindexConfig {
    #[serde(default = "default_reindex_endpoint")]
    #[prefer(default = "https://api.digitalocean.com/v2/gen-ai/indexing_jobs")]
    pub endpoint: String,
    /// Request timeout in seconds.
    #[serde(default = "default_reindex_timeout")]
    #[prefer(default = "30")]
    pub timeout: u64,
    /// Ordered mapping; iteration order is trigger order.
    #[serde(default = "default_knowledge_bases")]
    #[prefer(default)]
    pub knowledge_bases: Vec<KnowledgeBaseConfig>,
}

fn default_reindex_endpoint() -> String {
    DEFAULT_REINDEX_ENDPOINT.to_string()
}

fn default_reindex_timeout() -> u64 {
    30
}

fn default_knowledge_bases() -> Vec<KnowledgeBaseConfig> {
    vec![KnowledgeBaseConfig {
        uuid: DEFAULT_KNOWLEDGE_BASE_UUID.to_string(),
        institution_ids: vec![1, 2],
    }]
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self {
            endpoint: default_reindex_endpoint(),
            timeout: default_reindex_timeout(),
            knowledge_bases: default_knowledge_bases(),
        }
    }
}

/// Retry and timeout overrides for one job kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, prefer::FromValue)]
pub struct JobPolicyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    /// Per-attempt timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Job scheduler configuration. Durations are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, prefer::FromValue)]
pub struct SchedulerConfig {
    #[serde(default = "default_workers")]
    #[prefer(default = "5")]
    pub workers: u32,
    /// Queue poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    #[prefer(default = "1000")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_retries")]
    #[prefer(default = "3")]
    pub max_retries: u32,
    #[serde(default = "default_job_timeout")]
    #[prefer(default = "600")]
    pub job_timeout: u64,
    #[serde(default = "default_periodic_interval")]
    #[prefer(default = "3600")]
    pub fetch_interval: u64,
    #[serde(default = "default_periodic_interval")]
    #[prefer(default = "3600")]
    pub reindex_interval: u64,
    #[serde(default = "default_completed_retention_days")]
    #[prefer(default = "7")]
    pub completed_retention_days: u64,
    #[serde(default = "default_discarded_retention_days")]
    #[prefer(default = "30")]
    pub discarded_retention_days: u64,
    #[serde(default = "default_periodic_interval")]
    #[prefer(default = "3600")]
    pub purge_interval: u64,
    #[serde(default = "default_shutdown_grace")]
    #[prefer(default = "30")]
    pub shutdown_grace: u64,
    /// Overrides keyed by job kind name, e.g. `fetch_diario_dos_municipios`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    #[prefer(default)]
    pub kinds: HashMap<String, JobPolicyConfig>,
}

fn default_workers() -> u32 {
    5
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_job_timeout() -> u64 {
    600
}

fn default_periodic_interval() -> u64 {
    3600
}

fn default_completed_retention_days() -> u64 {
    7
}

fn default_discarded_retention_days() -> u64 {
    30
}

fn default_shutdown_grace() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            poll_interval_ms: default_poll_interval_ms(),
            max_retries: default_max_retries(),
            job_timeout: default_job_timeout(),
            fetch_interval: default_periodic_interval(),
            reindex_interval: default_periodic_interval(),
            completed_retention_days: default_completed_retention_days(),
            discarded_retention_days: default_discarded_retention_days(),
            purge_interval: default_periodic_interval(),
            shutdown_grace: default_shutdown_grace(),
            kinds: HashMap::new(),
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace)
    }

    /// Overrides for a job kind; empty when none are configured.
    pub fn policy(&self, kind: &str) -> JobPolicyConfig {
        self.kinds.get(kind).cloned().unwrap_or_default()
    }

    pub fn completed_retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.completed_retention_days as i64)
    }

    pub fn discarded_retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.discarded_retention_days as i64)
    }
}

/// Outbound HTTP configuration. Timeouts are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, prefer::FromValue)]
pub struct HttpConfig {
    /// User agent: unset for a random browser agent, or a literal string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default = "default_listing_timeout")]
    #[prefer(default = "20")]
    pub listing_timeout: u64,
    #[serde(default = "default_state_download_timeout")]
    #[prefer(default = "300")]
    pub state_download_timeout: u64,
    #[serde(default = "default_municipal_download_timeout")]
    #[prefer(default = "3600")]
    pub municipal_download_timeout: u64,
}

fn default_listing_timeout() -> u64 {
    20
}

fn default_state_download_timeout() -> u64 {
    300
}

fn default_municipal_download_timeout() -> u64 {
    3600
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            listing_timeout: default_listing_timeout(),
            state_download_timeout: default_state_download_timeout(),
            municipal_download_timeout: default_municipal_download_timeout(),
        }
    }
}

/// Configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct Config {
    /// Database URL (`sqlite:` path or `postgres://`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    #[serde(default)]
    #[prefer(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    #[prefer(default)]
    pub reindex: ReindexConfig,

    #[serde(default)]
    #[prefer(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    #[prefer(default)]
    pub http: HttpConfig,

    /// Headless browser used by the municipal gazette adapter.
    #[serde(default)]
    #[prefer(skip)]
    pub browser: BrowserEngineConfig,

    /// Path the config was loaded from.
    #[serde(skip)]
    #[prefer(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers radaroficial config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("radaroficial").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config file {}: {}", path.display(), e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse config text in the given format (`toml`, `yaml`/`yml`, otherwise JSON).
    pub fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "toml" => {
                toml::from_str(contents).map_err(|e| format!("Failed to parse TOML config: {}", e))
            }
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }
}

/// Runtime settings resolved from config file and environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub storage: StorageConfig,
    pub reindex: ReindexConfig,
    /// Bearer token for the reindex service (`DO_API_KEY`).
    pub reindex_token: Option<String>,
    pub scheduler: SchedulerConfig,
    pub http: HttpConfig,
    pub browser: BrowserEngineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Settings {
    /// Build settings from file config, before environment overrides.
    pub fn from_config(config: &Config) -> Self {
        Self {
            database_url: config
                .database_url
                .clone()
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            storage: config.storage.clone(),
            reindex: config.reindex.clone(),
            reindex_token: None,
            scheduler: config.scheduler.clone(),
            http: config.http.clone(),
            browser: config.browser.clone(),
        }
    }

    /// Overlay environment variables (highest precedence).
    pub fn apply_env(&mut self) {
        if let Some(url) = env_var("DATABASE_URL") {
            tracing::debug!(
                "Using DATABASE_URL from environment: {}",
                crate::repository::util::redact_url_password(&url)
            );
            self.database_url = url;
        }
        self.storage = self.storage.clone().with_env_overrides();
        if let Some(token) = env_var("DO_API_KEY") {
            self.reindex_token = Some(token);
        }
        if let Some(chrome) = env_var("CHROME_PATH") {
            self.browser.chrome_path = Some(PathBuf::from(chrome));
        }
    }

    /// Check if using PostgreSQL.
    pub fn is_postgres(&self) -> bool {
        is_postgres_url(&self.database_url)
    }

    /// Create a database context from the configured URL.
    pub fn create_db_context(&self) -> Result<DbContext, diesel::result::Error> {
        DbContext::from_url(&self.database_url)
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(
    options: LoadOptions,
) -> Result<(Settings, Config), String> {
    let config = match options.config_path {
        Some(ref path) => {
            let expanded = shellexpand::tilde(&path.to_string_lossy()).to_string();
            Config::load_from_path(Path::new(&expanded)).await?
        }
        None => Config::load().await,
    };

    let mut settings = Settings::from_config(&config);
    settings.apply_env();

    Ok((settings, config))
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(settings.storage.bucket, DEFAULT_BUCKET);
        assert_eq!(settings.storage.acl, "public-read");
        assert_eq!(settings.scheduler.workers, 5);
        assert_eq!(settings.scheduler.max_retries, 3);
        assert_eq!(settings.scheduler.job_timeout(), Duration::from_secs(600));
        assert_eq!(settings.http.listing_timeout, 20);
        assert_eq!(settings.reindex.knowledge_bases.len(), 1);
        assert_eq!(settings.reindex.knowledge_bases[0].institution_ids, vec![1, 2]);
        assert!(!settings.is_postgres());
    }

    #[test]
    fn test_parse_toml() {
        let config = Config::parse(
            r#"
            database_url = "sqlite:/var/lib/radar/radar.db"

            [storage]
            endpoint = "nyc3.digitaloceanspaces.com"

            [scheduler]
            workers = 2
            job_timeout = 120

            [scheduler.kinds.fetch_diario_dos_municipios]
            max_retries = 5
            timeout = 1200

            [[reindex.knowledge_bases]]
            uuid = "kb-state"
            institution_ids = [1]

            [[reindex.knowledge_bases]]
            uuid = "kb-municipal"
            institution_ids = [2]
            "#,
            "toml",
        )
        .unwrap();

        let settings = Settings::from_config(&config);
        assert_eq!(settings.database_url, "sqlite:/var/lib/radar/radar.db");
        assert_eq!(
            settings.storage.endpoint.as_deref(),
            Some("nyc3.digitaloceanspaces.com")
        );
        assert_eq!(settings.storage.bucket, DEFAULT_BUCKET);
        assert_eq!(settings.scheduler.workers, 2);
        assert_eq!(settings.scheduler.job_timeout, 120);
        assert_eq!(settings.scheduler.max_retries, 3);
        let municipal = settings.scheduler.policy("fetch_diario_dos_municipios");
        assert_eq!(municipal.max_retries, Some(5));
        assert_eq!(municipal.timeout, Some(1200));
        assert_eq!(settings.scheduler.policy("fetch_governo_piaui"), JobPolicyConfig::default());
        let uuids: Vec<&str> = settings
            .reindex
            .knowledge_bases
            .iter()
            .map(|kb| kb.uuid.as_str())
            .collect();
        assert_eq!(uuids, vec!["kb-state", "kb-municipal"]);
    }

    #[test]
    fn test_parse_yaml_and_json() {
        let yaml = Config::parse("scheduler:\n  workers: 9\n", "yml").unwrap();
        assert_eq!(yaml.scheduler.workers, 9);

        let json = Config::parse(r#"{"http": {"listing_timeout": 5}}"#, "json").unwrap();
        assert_eq!(json.http.listing_timeout, 5);
        assert_eq!(json.http.municipal_download_timeout, 3600);

        assert!(Config::parse("not = [valid", "toml").is_err());
    }

    #[tokio::test]
    async fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radaroficial.toml");
        std::fs::write(&path, "[storage]\nbucket = \"test-bucket\"\n").unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.storage.bucket, "test-bucket");
        assert_eq!(config.source_path.as_deref(), Some(path.as_path()));

        assert!(Config::load_from_path(&dir.path().join("missing.toml"))
            .await
            .is_err());
    }
}
