//! Job queue inspection commands.

use anyhow::bail;
use console::style;

use crate::config::Settings;
use crate::jobs::JobScheduler;
use crate::models::JobState;

use super::helpers::{open_database, truncate};

/// List recent jobs.
pub async fn cmd_jobs_list(settings: &Settings, state: Option<&str>, limit: i64) -> anyhow::Result<()> {
    let state = match state {
        Some(s) => match JobState::from_str(s) {
            Some(state) => Some(state),
            None => bail!("unknown job state {:?}", s),
        },
        None => None,
    };

    let ctx = open_database(settings).await?;
    let jobs = ctx.jobs().list(state, limit).await?;

    if jobs.is_empty() {
        println!("{} No jobs", style("!").yellow());
        return Ok(());
    }

    println!(
        "{:<6} {:<28} {:<10} {:<8} {:<20} Error",
        "ID", "Kind", "State", "Attempt", "Scheduled"
    );
    println!("{}", "-".repeat(90));
    for job in jobs {
        let state = match job.state {
            JobState::Completed => style(job.state.as_str()).green(),
            JobState::Discarded => style(job.state.as_str()).red(),
            JobState::Retryable => style(job.state.as_str()).yellow(),
            _ => style(job.state.as_str()).cyan(),
        };
        println!(
            "{:<6} {:<28} {:<10} {:<8} {:<20} {}",
            job.id,
            job.kind,
            state,
            format!("{}/{}", job.attempt, job.max_attempts),
            job.scheduled_at.format("%Y-%m-%d %H:%M:%S"),
            truncate(job.last_error.as_deref().unwrap_or(""), 40)
        );
    }

    Ok(())
}

/// Delete finished jobs past their retention period.
pub async fn cmd_jobs_purge(settings: &Settings) -> anyhow::Result<()> {
    let ctx = open_database(settings).await?;
    let scheduler = JobScheduler::new(ctx.jobs(), settings.scheduler.clone());
    let counts = scheduler.purge().await?;

    println!(
        "{} Purged {} completed and {} discarded job(s)",
        style("✓").green(),
        counts.completed,
        counts.discarded
    );
    Ok(())
}
