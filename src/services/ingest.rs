//! Ingestion pipeline.
//!
//! Drives one adapter run: list candidates, skip what is already stored,
//! download and upload the rest, then record each gazette. Candidates are
//! processed one at a time so a single slow publisher never sees parallel
//! requests from us.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::models::NewGazette;
use crate::repository::GazetteRepository;
use crate::scrapers::{FetchSelector, GazetteCandidate, ScraperError, SourceAdapter};
use crate::storage::{artifact_key, ArtifactStore};

/// Run-level ingestion failure.
///
/// Per-candidate problems never surface here; they are logged and counted
/// in [`IngestReport::failed`].
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("listing {slug} ({selector}) failed: {source}")]
    Listing {
        slug: &'static str,
        selector: FetchSelector,
        #[source]
        source: ScraperError,
    },
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Candidates returned by the adapter.
    pub listed: usize,
    /// New gazette rows written.
    pub inserted: usize,
    /// Candidates already stored before this run looked at them.
    pub skipped_existing: usize,
    /// Uploaded, but another run inserted the same gazette first.
    pub raced: usize,
    /// Candidates dropped after a download, upload or insert failure.
    pub failed: usize,
}

enum Outcome {
    Inserted,
    Existing,
    Raced,
    Failed,
}

/// Orchestrates adapter runs against the repository and artifact store.
#[derive(Clone)]
pub struct IngestionPipeline {
    gazettes: GazetteRepository,
    store: Arc<dyn ArtifactStore>,
}

impl IngestionPipeline {
    pub fn new(gazettes: GazetteRepository, store: Arc<dyn ArtifactStore>) -> Self {
        Self { gazettes, store }
    }

    /// Run one adapter for the selector.
    ///
    /// Safe to repeat: existing gazettes are skipped before download and
    /// the final insert ignores natural-key conflicts.
    pub async fn run(
        &self,
        adapter: &dyn SourceAdapter,
        selector: FetchSelector,
    ) -> Result<IngestReport, IngestError> {
        let slug = adapter.slug();
        let candidates = adapter
            .list(selector)
            .await
            .map_err(|source| IngestError::Listing {
                slug,
                selector,
                source,
            })?;

        let mut report = IngestReport {
            listed: candidates.len(),
            ..Default::default()
        };
        info!("{}: {} candidate(s) for {}", slug, candidates.len(), selector);

        for candidate in candidates {
            match self.ingest_one(adapter, &candidate).await {
                Outcome::Inserted => report.inserted += 1,
                Outcome::Existing => report.skipped_existing += 1,
                Outcome::Raced => report.raced += 1,
                Outcome::Failed => report.failed += 1,
            }
        }

        info!(
            "{}: {} inserted, {} already stored, {} failed",
            slug, report.inserted, report.skipped_existing, report.failed
        );
        Ok(report)
    }

    async fn ingest_one(&self, adapter: &dyn SourceAdapter, candidate: &GazetteCandidate) -> Outcome {
        let slug = adapter.slug();
        let institution_id = candidate.institution_id;
        let description = candidate.description.as_str();

        match self.gazettes.exists(institution_id, description).await {
            Ok(true) => {
                debug!("{}: {:?} already stored", slug, description);
                return Outcome::Existing;
            }
            Ok(false) => {}
            // The insert below is idempotent, so carrying on is safe
            Err(e) => warn!(
                "{}: existence check failed for institution {} {:?}, ingesting anyway: {}",
                slug, institution_id, description, e
            ),
        }

        let bytes = match adapter.resolve_content(candidate).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    "{}: download failed for institution {} {:?}: {}",
                    slug, institution_id, description, e
                );
                return Outcome::Failed;
            }
        };

        let key = artifact_key(slug, candidate.key_date, description, &candidate.filename);
        let size = bytes.len();
        let source_url = match self.store.put(&key, bytes, &candidate.content_type).await {
            Ok(url) => url,
            Err(e) => {
                warn!(
                    "{}: upload failed for institution {} {:?}: {}",
                    slug, institution_id, description, e
                );
                return Outcome::Failed;
            }
        };
        debug!("{}: stored {} bytes at {}", slug, size, key);

        let gazette = NewGazette {
            institution_id,
            description: candidate.description.clone(),
            source_url,
            published_at: candidate.published_at,
            last_modified_at: candidate.last_modified_at,
        };

        match self.gazettes.insert(&gazette).await {
            Ok(true) => {
                info!("{}: ingested {:?}", slug, description);
                Outcome::Inserted
            }
            Ok(false) => {
                debug!("{}: {:?} was inserted concurrently", slug, description);
                Outcome::Raced
            }
            Err(e) => {
                warn!(
                    "{}: insert failed for institution {} {:?}: {}",
                    slug, institution_id, description, e
                );
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::setup_test_db;
    use crate::scrapers::governo_pi::{parse_listing, BASE_URL};
    use crate::scrapers::CandidateContent;
    use crate::storage::MemoryArtifactStore;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 16).unwrap()
    }

    fn candidate(description: &str, url: &str) -> GazetteCandidate {
        GazetteCandidate {
            institution_id: 1,
            description: description.to_string(),
            published_at: NewGazette::date_to_utc(day()),
            last_modified_at: None,
            filename: "diario.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            key_date: day(),
            content: CandidateContent::Remote {
                url: url.to_string(),
            },
        }
    }

    /// Adapter serving a fixed listing; URLs containing "broken" fail to download.
    struct FakeAdapter {
        listing: Result<Vec<GazetteCandidate>, &'static str>,
        downloads: AtomicUsize,
    }

    impl FakeAdapter {
        fn new(candidates: Vec<GazetteCandidate>) -> Self {
            Self {
                listing: Ok(candidates),
                downloads: AtomicUsize::new(0),
            }
        }

        fn with_listing_body(body: &'static str) -> Self {
            Self {
                listing: Err(body),
                downloads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SourceAdapter for FakeAdapter {
        fn slug(&self) -> &'static str {
            "governo-pi"
        }

        async fn list(&self, selector: FetchSelector) -> Result<Vec<GazetteCandidate>, ScraperError> {
            match &self.listing {
                Ok(candidates) => Ok(candidates.clone()),
                Err(body) => parse_listing(body, selector.date_or_today(), BASE_URL),
            }
        }

        async fn download(&self, url: &str) -> Result<Vec<u8>, ScraperError> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            if url.contains("broken") {
                return Err(ScraperError::Status {
                    url: url.to_string(),
                    status: 502,
                });
            }
            Ok(format!("%PDF {}", url).into_bytes())
        }
    }

    /// Adapter whose download lets another writer store the same gazette first.
    struct RacingAdapter {
        candidate: GazetteCandidate,
        gazettes: GazetteRepository,
    }

    #[async_trait]
    impl SourceAdapter for RacingAdapter {
        fn slug(&self) -> &'static str {
            "governo-pi"
        }

        async fn list(&self, _selector: FetchSelector) -> Result<Vec<GazetteCandidate>, ScraperError> {
            Ok(vec![self.candidate.clone()])
        }

        async fn download(&self, url: &str) -> Result<Vec<u8>, ScraperError> {
            let other = NewGazette {
                institution_id: self.candidate.institution_id,
                description: self.candidate.description.clone(),
                source_url: "https://bucket.example/other-worker.pdf".to_string(),
                published_at: None,
                last_modified_at: None,
            };
            assert!(self.gazettes.insert(&other).await.unwrap());
            Ok(format!("%PDF {}", url).into_bytes())
        }
    }

    #[tokio::test]
    async fn test_concurrent_insert_counts_as_raced() {
        let (ctx, _dir) = setup_test_db().await;
        let store = Arc::new(MemoryArtifactStore::new("https://bucket.example"));
        let pipeline = IngestionPipeline::new(ctx.gazettes(), store.clone());
        let adapter = RacingAdapter {
            candidate: candidate("DOEPI Nº 71/2025", "https://pub/a.pdf"),
            gazettes: ctx.gazettes(),
        };

        let report = pipeline.run(&adapter, FetchSelector::Date(day())).await.unwrap();
        assert_eq!(report.raced, 1);
        assert_eq!(report.inserted, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(ctx.gazettes().count().await.unwrap(), 1);

        // The first writer's row is kept
        let stored = ctx.gazettes().get_pending_indexing().await.unwrap();
        assert_eq!(stored[0].source_url, "https://bucket.example/other-worker.pdf");
    }

    #[tokio::test]
    async fn test_second_run_uploads_nothing() {
        let (ctx, _dir) = setup_test_db().await;
        let store = Arc::new(MemoryArtifactStore::new("https://bucket.example"));
        let pipeline = IngestionPipeline::new(ctx.gazettes(), store.clone());
        let adapter = FakeAdapter::new(vec![
            candidate("DOEPI Nº 71/2025", "https://pub/a.pdf"),
            candidate("DOEPI Nº 71/2025 - Suplemento", "https://pub/b.pdf"),
        ]);

        let first = pipeline.run(&adapter, FetchSelector::Date(day())).await.unwrap();
        assert_eq!(first.inserted, 2);
        assert_eq!(store.put_count(), 2);

        let second = pipeline.run(&adapter, FetchSelector::Date(day())).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped_existing, 2);
        assert_eq!(store.put_count(), 2);
        assert_eq!(adapter.downloads.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.gazettes().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_stored_url_points_at_artifact() {
        let (ctx, _dir) = setup_test_db().await;
        let store = Arc::new(MemoryArtifactStore::new("https://bucket.example"));
        let pipeline = IngestionPipeline::new(ctx.gazettes(), store.clone());
        let adapter = FakeAdapter::new(vec![candidate("DOEPI Nº 71/2025", "https://pub/a.pdf")]);

        pipeline.run(&adapter, FetchSelector::Date(day())).await.unwrap();

        let key = "governo-pi/2025/04/DOEPI_N_712025_diario.pdf";
        assert!(store.get(key).is_some());
        let stored = ctx.gazettes().get_pending_indexing().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].source_url, format!("https://bucket.example/{}", key));
    }

    #[tokio::test]
    async fn test_failed_download_skips_only_that_candidate() {
        let (ctx, _dir) = setup_test_db().await;
        let store = Arc::new(MemoryArtifactStore::new("https://bucket.example"));
        let pipeline = IngestionPipeline::new(ctx.gazettes(), store.clone());
        let adapter = FakeAdapter::new(vec![
            candidate("first", "https://pub/broken.pdf"),
            candidate("second", "https://pub/ok.pdf"),
        ]);

        let report = pipeline.run(&adapter, FetchSelector::Date(day())).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.inserted, 1);
        assert!(!ctx.gazettes().exists(1, "first").await.unwrap());
        assert!(ctx.gazettes().exists(1, "second").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_upload_writes_no_row() {
        let (ctx, _dir) = setup_test_db().await;
        let store = Arc::new(MemoryArtifactStore::failing());
        let pipeline = IngestionPipeline::new(ctx.gazettes(), store.clone());
        let adapter = FakeAdapter::new(vec![candidate("first", "https://pub/a.pdf")]);

        let report = pipeline.run(&adapter, FetchSelector::Date(day())).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(ctx.gazettes().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_listing_is_run_error() {
        let (ctx, _dir) = setup_test_db().await;
        let store = Arc::new(MemoryArtifactStore::new("https://bucket.example"));
        let pipeline = IngestionPipeline::new(ctx.gazettes(), store.clone());
        let adapter = FakeAdapter::with_listing_body("{\"data\": [[\"<a href=");

        let err = pipeline
            .run(&adapter, FetchSelector::Date(day()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::Listing {
                source: ScraperError::Parse { .. },
                ..
            }
        ));
        assert_eq!(store.put_count(), 0);
        assert_eq!(ctx.gazettes().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_degenerate_description_still_ingests() {
        let (ctx, _dir) = setup_test_db().await;
        let store = Arc::new(MemoryArtifactStore::new("https://bucket.example"));
        let pipeline = IngestionPipeline::new(ctx.gazettes(), store.clone());
        let adapter = FakeAdapter::new(vec![
            candidate("ç ã —", "https://pub/a.pdf"),
            candidate("é è", "https://pub/b.pdf"),
        ]);

        let report = pipeline.run(&adapter, FetchSelector::Date(day())).await.unwrap();
        assert_eq!(report.inserted, 2);
        let keys = store.keys();
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|k| k.starts_with("governo-pi/2025/04/gazette_")));
    }
}
