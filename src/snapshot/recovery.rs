use crate::snapshot::Snapshot;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Load the most recent valid snapshot from directory
///
/// Returns None if no snapshots exist or all are corrupt.
/// Tries snapshots from newest to oldest until one loads successfully.
pub fn load_latest_snapshot(snapshot_dir: &Path) -> Result<Option<Snapshot>> {
    if !snapshot_dir.exists() {
        info!(
            directory = %snapshot_dir.display(),
            "Snapshot directory does not exist, starting without snapshot"
        );
        return Ok(None);
    }

    let mut snapshots = list_snapshots(snapshot_dir)?;

    if snapshots.is_empty() {
        info!("No snapshots found, starting with empty state");
        return Ok(None);
    }

    // Newest first
    snapshots.sort_by(|a, b| b.cmp(a));

    info!(
        count = snapshots.len(),
        directory = %snapshot_dir.display(),
        "Found {} snapshot(s), attempting to load newest",
        snapshots.len()
    );

    for path in snapshots {
        match Snapshot::load_from_file(&path) {
            Ok(snapshot) => {
                info!(
                    path = %path.display(),
                    entities = snapshot.entity_count(),
                    known_devices = snapshot.known_devices.len(),
                    "Loaded snapshot successfully"
                );
                return Ok(Some(snapshot));
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Corrupt snapshot, trying next oldest"
                );
            }
        }
    }

    error!("All snapshots are corrupt, starting with empty state");
    Ok(None)
}

/// List all snapshot files in directory
pub(crate) fn list_snapshots(snapshot_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(snapshot_dir).context("Failed to read snapshot directory")?;

    let mut snapshots = Vec::new();

    for entry in entries {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();

        if path.is_file() {
            if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
                if filename.starts_with("snapshot-")
                    && (filename.ends_with(".json.gz") || filename.ends_with(".json"))
                {
                    snapshots.push(path);
                }
            }
        }
    }

    Ok(snapshots)
}
