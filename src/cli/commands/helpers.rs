//! Shared helpers for CLI commands: wiring settings into components.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde_json::json;

use crate::config::Settings;
use crate::jobs::{FetchHandler, JobPolicy, JobScheduler, ReindexHandler};
use crate::models::{JobKind, KnownInstitution};
use crate::repository::util::redact_url_password;
use crate::repository::DbContext;
use crate::scrapers::{GovernoPiauiAdapter, MunicipiosPiauiAdapter, SourceAdapter};
use crate::services::{HttpReindexTrigger, IngestionPipeline, ReindexBatcher};
use crate::storage::{ArtifactStore, SpacesArtifactStore};

/// Open the configured database and check it has been initialized.
pub async fn open_database(settings: &Settings) -> anyhow::Result<DbContext> {
    tracing::info!("Using database {}", redact_url_password(&settings.database_url));
    let ctx = settings
        .create_db_context()
        .context("failed to open database")?;
    ctx.test_connection()
        .await
        .context("failed to connect to database")?;
    ctx.verify_tables().await?;
    Ok(ctx)
}

/// Build the artifact store from settings.
pub async fn build_artifact_store(settings: &Settings) -> anyhow::Result<Arc<dyn ArtifactStore>> {
    let store = SpacesArtifactStore::from_config(&settings.storage).await?;
    Ok(Arc::new(store))
}

/// Build the adapter for a known institution.
pub fn build_adapter(
    institution: KnownInstitution,
    settings: &Settings,
) -> anyhow::Result<Arc<dyn SourceAdapter>> {
    let adapter: Arc<dyn SourceAdapter> = match institution {
        KnownInstitution::GovernoPiaui => Arc::new(GovernoPiauiAdapter::new(&settings.http)?),
        KnownInstitution::MunicipiosPiaui => Arc::new(MunicipiosPiauiAdapter::new(
            &settings.http,
            settings.browser.clone(),
        )?),
    };
    Ok(adapter)
}

/// Build the reindex batcher from settings.
pub fn build_batcher(settings: &Settings, ctx: &DbContext) -> anyhow::Result<ReindexBatcher> {
    let trigger = HttpReindexTrigger::new(&settings.reindex, settings.reindex_token.clone())?;
    Ok(ReindexBatcher::from_config(
        ctx.gazettes(),
        Arc::new(trigger),
        &settings.reindex,
    ))
}

/// Build a scheduler with a handler for every job kind.
///
/// With `periodic`, both fetch kinds and the reindex batcher are enqueued
/// on their configured intervals, and the municipal fetch also runs at start.
pub async fn build_scheduler(
    settings: &Settings,
    ctx: &DbContext,
    periodic: bool,
) -> anyhow::Result<JobScheduler> {
    let store = build_artifact_store(settings).await?;
    let pipeline = IngestionPipeline::new(ctx.gazettes(), store);

    let policy = |kind: JobKind| JobPolicy::from(&settings.scheduler.policy(kind.as_str()));

    let mut scheduler = JobScheduler::new(ctx.jobs(), settings.scheduler.clone());
    scheduler.register(Arc::new(
        FetchHandler::new(
            JobKind::FetchGovernoPiaui,
            build_adapter(KnownInstitution::GovernoPiaui, settings)?,
            pipeline.clone(),
        )
        .with_policy(policy(JobKind::FetchGovernoPiaui)),
    ));
    scheduler.register(Arc::new(
        FetchHandler::new(
            JobKind::FetchDiarioDosMunicipios,
            build_adapter(KnownInstitution::MunicipiosPiaui, settings)?,
            pipeline,
        )
        .with_policy(policy(JobKind::FetchDiarioDosMunicipios)),
    ));
    scheduler.register(Arc::new(
        ReindexHandler::new(build_batcher(settings, ctx)?)
            .with_policy(policy(JobKind::ReindexKnowledgeBases)),
    ));

    if periodic {
        let fetch_every = Duration::from_secs(settings.scheduler.fetch_interval);
        let reindex_every = Duration::from_secs(settings.scheduler.reindex_interval);
        scheduler.register_periodic(JobKind::FetchGovernoPiaui, json!({}), fetch_every, false);
        scheduler.register_periodic(
            JobKind::FetchDiarioDosMunicipios,
            json!({}),
            fetch_every,
            true,
        );
        scheduler.register_periodic(
            JobKind::ReindexKnowledgeBases,
            json!({}),
            reindex_every,
            false,
        );
    }

    Ok(scheduler)
}

/// Truncate a string for table output.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}
