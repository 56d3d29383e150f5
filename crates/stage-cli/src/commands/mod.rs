//! Command implementations for stage-cli

pub mod export;
pub mod import;
pub mod purge;
pub mod repack;

pub use export::run_export;
pub use import::run_import;
pub use purge::run_purge;
pub use repack::run_repack;

use colored::Colorize;
use stage_core::Workspace;

use crate::error::Result;

/// Dispose `workspace` unless the user asked to keep it, then hand back
/// `outcome`.
///
/// Disposal happens whether or not `outcome` is an error. When both fail,
/// the outcome's error wins and the disposal error is logged.
pub(crate) async fn finish<T>(
    workspace: &Workspace,
    keep: bool,
    quiet: bool,
    outcome: Result<T>,
) -> Result<T> {
    if keep {
        if !quiet {
            println!(
                "{} {}",
                "Kept workspace:".dimmed(),
                workspace.root_directory().display()
            );
        }
        return outcome;
    }

    match (outcome, workspace.dispose().await) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), disposed) => {
            if let Err(dispose_error) = disposed {
                tracing::warn!(id = %workspace.id(), error = %dispose_error, "Failed to dispose workspace");
            }
            Err(e)
        }
    }
}
