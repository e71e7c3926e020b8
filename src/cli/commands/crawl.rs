//! Crawl command: run one source through the ingestion pipeline now.

use anyhow::bail;
use console::style;

use crate::config::Settings;
use crate::jobs::parse_job_date;
use crate::models::KnownInstitution;
use crate::scrapers::FetchSelector;
use crate::services::IngestionPipeline;

use super::helpers::{build_adapter, build_artifact_store, open_database};

/// Resolve the fetch selector for a source and optional date.
fn selector_for(institution: KnownInstitution, date: Option<&str>) -> anyhow::Result<FetchSelector> {
    match (institution, date) {
        (KnownInstitution::GovernoPiaui, Some(date)) => {
            Ok(FetchSelector::Date(parse_job_date(date)?))
        }
        (KnownInstitution::GovernoPiaui, None) => {
            Ok(FetchSelector::Date(chrono::Local::now().date_naive()))
        }
        (KnownInstitution::MunicipiosPiaui, Some(_)) => {
            bail!("{} only serves the current edition", institution.slug())
        }
        (KnownInstitution::MunicipiosPiaui, None) => Ok(FetchSelector::CurrentEdition),
    }
}

/// Fetch a source synchronously and print how many gazettes were stored.
pub async fn cmd_crawl(settings: &Settings, slug: &str, date: Option<&str>) -> anyhow::Result<()> {
    let Some(institution) = KnownInstitution::from_slug(slug) else {
        let known: Vec<&str> = KnownInstitution::ALL.iter().map(|i| i.slug()).collect();
        bail!("unknown source {:?} (known: {})", slug, known.join(", "));
    };
    let selector = selector_for(institution, date)?;

    let ctx = open_database(settings).await?;
    let store = build_artifact_store(settings).await?;
    let adapter = build_adapter(institution, settings)?;
    let pipeline = IngestionPipeline::new(ctx.gazettes(), store);

    println!(
        "{} Fetching {} ({})",
        style("→").cyan(),
        institution.slug(),
        selector
    );
    let report = pipeline.run(adapter.as_ref(), selector).await?;

    println!(
        "{} {} new gazette(s) stored ({} listed, {} already stored)",
        style("✓").green(),
        report.inserted,
        report.listed,
        report.skipped_existing
    );
    if report.failed > 0 {
        println!(
            "{} {} candidate(s) failed; they will be retried on the next run",
            style("!").yellow(),
            report.failed
        );
    }

    Ok(())
}
