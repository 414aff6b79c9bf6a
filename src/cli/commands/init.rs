//! Initialize command.

use console::style;

use crate::config::Settings;
use crate::repository::run_migrations;

/// Create the database and apply pending migrations.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.validate()?;
    let database_url = settings.database_url();
    let applied = run_migrations(&database_url).await?;

    if applied == 0 {
        println!("{} Database is up to date", style("✓").green());
    } else {
        println!(
            "{} Applied {} migration(s)",
            style("✓").green(),
            applied
        );
    }
    println!("  {} {}", style("→").dim(), database_url);

    if settings.source_path.is_none() {
        println!(
            "{} No minefile.toml found; running on defaults and environment",
            style("!").yellow()
        );
    }
    Ok(())
}
