//! Repack command implementation

use std::path::Path;

use colored::Colorize;
use stage_core::{StageConfig, Workspaces};

use crate::error::Result;

/// Run the repack command
///
/// Opens the bundle in an editor workspace, which requires a valid manifest,
/// and writes its contents back out as a fresh archive.
pub async fn run_repack(config: StageConfig, bundle: &Path, output: &Path) -> Result<()> {
    let workspaces = Workspaces::open(config).await?;
    let workspace = workspaces.open_editor(bundle).await?;

    let saved = workspaces.save_editor(&workspace, output).await;
    workspace.dispose().await?;
    let files = saved?;

    let name = workspace
        .manifest()
        .map(|m| format!("{} {}", m.extension.name, m.extension.version))
        .unwrap_or_default();
    println!(
        "{} {} ({} files) to {}",
        "Repacked".green().bold(),
        name.cyan(),
        files,
        output.display()
    );
    Ok(())
}
