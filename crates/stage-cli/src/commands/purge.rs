//! Purge command implementation

use colored::Colorize;
use serde_json::json;
use stage_core::{StageConfig, Workspaces};

use crate::error::Result;

/// Run the purge command
pub async fn run_purge(config: StageConfig, json: bool) -> Result<()> {
    let workspaces = Workspaces::from_config(config);
    let report = workspaces.purge_stale().await?;

    if json {
        let output = json!({
            "removed": report.removed,
            "failed": report.failed,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if report.removed.is_empty() && report.failed.is_empty() {
        println!("{}", "Nothing to purge".dimmed());
        return Ok(());
    }
    for path in &report.removed {
        println!("  {} {}", "-".red(), path.display());
    }
    for path in &report.failed {
        println!("  {} {} (could not remove)", "!".yellow(), path.display());
    }
    println!();
    println!(
        "{} {} stale workspace(s)",
        "Purged".green().bold(),
        report.removed.len()
    );
    Ok(())
}
