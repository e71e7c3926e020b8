//! Enqueue and reindex commands.

use console::style;

use crate::config::Settings;
use crate::jobs::JobScheduler;

use super::helpers::{build_batcher, open_database};

/// Queue a job for the worker.
pub async fn cmd_enqueue(settings: &Settings, kind: &str, date: Option<&str>) -> anyhow::Result<()> {
    let ctx = open_database(settings).await?;
    let scheduler = JobScheduler::new(ctx.jobs(), settings.scheduler.clone());
    let job = scheduler.enqueue_fetch(kind, date).await?;

    println!(
        "{} Enqueued job {} ({}) {}",
        style("✓").green(),
        job.id,
        job.kind,
        job.args
    );
    Ok(())
}

/// Run the reindex batcher once.
pub async fn cmd_reindex(settings: &Settings) -> anyhow::Result<()> {
    let ctx = open_database(settings).await?;
    let report = build_batcher(settings, &ctx)?.run().await?;

    if report.pending == 0 {
        println!("{} No gazettes pending indexing", style("✓").green());
        return Ok(());
    }

    for kb in &report.triggered {
        println!("  {} Reindex triggered for {}", style("✓").green(), kb);
    }
    for kb in &report.failed {
        println!("  {} Reindex failed for {}", style("✗").red(), kb);
    }
    for id in &report.unmapped {
        println!(
            "  {} Institution {} has no knowledge base",
            style("!").yellow(),
            id
        );
    }
    println!(
        "{} {} of {} pending gazette(s) submitted",
        style("✓").green(),
        report.marked,
        report.pending
    );
    Ok(())
}
