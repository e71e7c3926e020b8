//! Worker command: run the job scheduler.

use std::sync::Arc;

use console::style;
use tracing::info;

use crate::config::Settings;

use super::helpers::{build_scheduler, open_database};

/// Run the scheduler until Ctrl-C or SIGTERM.
pub async fn cmd_worker(settings: &Settings, periodic: bool) -> anyhow::Result<()> {
    let ctx = open_database(settings).await?;
    let scheduler = build_scheduler(settings, &ctx, periodic).await?;

    println!(
        "{} Worker started with {} slot(s), {} periodic job(s)",
        style("→").cyan(),
        settings.scheduler.workers.max(1),
        scheduler.periodic_jobs().len()
    );

    Arc::new(scheduler).run(shutdown_signal()).await?;

    println!("{} Worker stopped", style("✓").green());
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C"),
                }
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
