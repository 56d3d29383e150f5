//! Shared test fixtures for the Stage workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`bundle`]: zip bundles and manifests written to disk
//! - [`orphan`]: directories left behind by a process that exited
//! - [`stage`]: [`TestStage`](stage::TestStage), a temporary cache root and
//!   source area with assertion helpers

pub mod bundle;
pub mod orphan;
pub mod stage;
