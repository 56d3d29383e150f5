//! Export command implementation

use std::path::Path;

use colored::Colorize;
use stage_bundle::ExtensionManifest;
use stage_core::{StageConfig, Workspaces};

use super::finish;
use crate::error::Result;

/// Run the export command
pub async fn run_export(
    config: StageConfig,
    manifest_path: &Path,
    source: &Path,
    output: &Path,
    keep: bool,
) -> Result<()> {
    let manifest = ExtensionManifest::from_path(manifest_path)?;
    let workspaces = Workspaces::open(config).await?;
    let workspace = workspaces.export(&manifest, source, output).await?;

    println!(
        "{} {} {} to {}",
        "Exported".green().bold(),
        manifest.extension.name.cyan(),
        manifest.extension.version,
        output.display()
    );

    finish(&workspace, keep, false, Ok(())).await
}
