pub mod check;
pub mod event;
pub mod forecast;
pub mod preview;
pub mod rules;
pub mod summary;

use anyhow::{Context, Result};
use slipcast::snapshot::StateSnapshot;
use std::path::Path;

pub fn snapshot_path(dir: &Path) -> std::path::PathBuf {
    dir.join("snapshot.jsonl")
}

/// Load the snapshot for a CLI command, with a friendly error when the
/// directory was never initialised.
pub fn load_snapshot(dir: &Path) -> Result<StateSnapshot> {
    let path = snapshot_path(dir);
    if !path.exists() {
        anyhow::bail!(
            "No snapshot at {}. Create one record per line in snapshot.jsonl first.",
            path.display()
        );
    }
    slipcast::parser::load_snapshot(&path)
        .with_context(|| format!("Failed to load snapshot from {}", path.display()))
}
