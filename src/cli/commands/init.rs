//! Initialize command.

use anyhow::Context;
use console::style;

use crate::config::Settings;
use crate::repository::util::redact_url_password;

/// Create the schema and seed the known institutions.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    let ctx = settings
        .create_db_context()
        .context("failed to open database")?;
    ctx.init_schema().await.context("failed to create schema")?;

    for institution in ctx.institutions().get_all().await? {
        println!(
            "  {} {} ({})",
            style("✓").green(),
            institution.name,
            institution.slug
        );
    }

    println!(
        "{} Initialized Radar Oficial in {}",
        style("✓").green(),
        redact_url_password(&settings.database_url)
    );

    Ok(())
}
