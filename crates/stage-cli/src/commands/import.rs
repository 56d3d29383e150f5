//! Import command implementation

use colored::Colorize;
use serde_json::json;
use stage_core::{FileInfo, Locator, SkipReason, StageConfig, Workspaces};

use super::finish;
use crate::error::{CliError, Result};

/// Run the import command
pub async fn run_import(
    config: StageConfig,
    locators: &[String],
    keep: bool,
    json: bool,
) -> Result<()> {
    let workspaces = Workspaces::open(config).await?;
    let locators: Vec<Locator> = locators.iter().map(|l| Locator::new(l.as_str())).collect();
    let workspace = workspaces.import(&locators).await?;

    let rendered = if json {
        let output = json!({
            "id": workspace.id(),
            "kind": workspace.kind(),
            "root": workspace.root_directory(),
            "kept": keep,
            "items": workspace.input_file_infos(),
        });
        serde_json::to_string_pretty(&output)
            .map(Some)
            .map_err(CliError::from)
    } else {
        print_report(workspace.id(), workspace.input_file_infos());
        Ok(None)
    };

    if let Some(text) = finish(&workspace, keep, json, rendered).await? {
        println!("{text}");
    }
    Ok(())
}

fn print_report(id: &str, infos: &[FileInfo]) {
    let decoded = infos.iter().filter(|i| i.has_manifest()).count();
    println!(
        "{} {} item(s) into workspace {}",
        "Imported".green().bold(),
        infos.len(),
        id.cyan()
    );
    println!();

    for (index, info) in infos.iter().enumerate() {
        let media_type = info.media_type.as_deref().unwrap_or("unknown");
        let status = match (&info.manifest, info.skip_reason) {
            (Some(manifest), SkipReason::None) => format!(
                "{} {}",
                manifest.extension.name, manifest.extension.version
            )
            .green(),
            (_, SkipReason::NotAnArchive) => "plain file".dimmed(),
            (_, reason) => format!("skipped: {reason}").yellow(),
        };
        println!(
            "  [{index}] {}  {}  {} bytes  {}",
            info.display_name.bold(),
            media_type.dimmed(),
            info.size,
            status
        );
    }

    println!();
    println!("{}:  {}/{}", "Decoded".dimmed(), decoded, infos.len());
}
