//! Gazette listing commands.

use anyhow::bail;
use console::style;

use crate::config::Settings;
use crate::models::{Gazette, KnownInstitution};

use super::helpers::{open_database, truncate};

fn source_label(institution_id: i32) -> &'static str {
    KnownInstitution::from_id(institution_id)
        .map(|i| i.slug())
        .unwrap_or("?")
}

fn print_gazettes(gazettes: &[Gazette]) {
    println!(
        "{:<6} {:<14} {:<40} {:<12} Artifact",
        "ID", "Source", "Description", "Published"
    );
    println!("{}", "-".repeat(100));
    for gazette in gazettes {
        let published = gazette
            .published_at
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<14} {:<40} {:<12} {}",
            gazette.id,
            source_label(gazette.institution_id),
            truncate(&gazette.description, 39),
            published,
            gazette.source_url
        );
    }
}

/// List gazettes awaiting a reindex trigger.
pub async fn cmd_gazettes_pending(settings: &Settings) -> anyhow::Result<()> {
    let ctx = open_database(settings).await?;
    let pending = ctx.gazettes().get_pending_indexing().await?;

    if pending.is_empty() {
        println!("{} No gazettes pending indexing", style("✓").green());
        return Ok(());
    }

    print_gazettes(&pending);
    println!("\n{} gazette(s) pending", style(pending.len()).bold());
    Ok(())
}

/// List recently stored gazettes.
pub async fn cmd_gazettes_list(
    settings: &Settings,
    source: Option<&str>,
    limit: i64,
) -> anyhow::Result<()> {
    let institution_id = match source {
        Some(slug) => match KnownInstitution::from_slug(slug) {
            Some(institution) => Some(institution.id()),
            None => bail!("unknown source {:?}", slug),
        },
        None => None,
    };

    let ctx = open_database(settings).await?;
    let gazettes = ctx.gazettes().list_recent(institution_id, limit).await?;
    if gazettes.is_empty() {
        println!("{} No gazettes stored", style("!").yellow());
        return Ok(());
    }

    print_gazettes(&gazettes);
    println!(
        "\n{} gazette(s) stored in total",
        style(ctx.gazettes().count().await?).bold()
    );
    Ok(())
}
