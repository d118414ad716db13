use crate::snapshot::{config::SnapshotConfig, Snapshot};
use crate::state::DeviceTracker;
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};


/// Manages periodic snapshots of the tracked devices
pub struct SnapshotManager {
    tracker: Arc<DeviceTracker>,
    config: SnapshotConfig,
}

impl SnapshotManager {
    pub fn new(tracker: Arc<DeviceTracker>, config: SnapshotConfig) -> Self {
        Self { tracker, config }
    }

    /// Run background snapshot loop
    ///
    /// Runs until the task is cancelled.
    pub async fn run_snapshot_loop(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Snapshot manager disabled, exiting loop");
            return Ok(());
        }

        info!(
            interval_minutes = self.config.interval_minutes,
            directory = %self.config.directory.display(),
            keep_count = self.config.keep_count,
            "Starting snapshot manager"
        );

        fs::create_dir_all(&self.config.directory)
            .context("Failed to create snapshot directory")?;

        let mut timer = interval(self.tick_period());
        // The first tick completes immediately; nothing has been tracked yet
        timer.tick().await;

        loop {
            timer.tick().await;

            if let Err(e) = self.create_and_save_snapshot() {
                error!(error = %e, "Failed to create snapshot");
            }
        }
    }

    /// Time between snapshots, at least one minute
    fn tick_period(&self) -> Duration {
        Duration::from_secs(self.config.interval_minutes.max(1).saturating_mul(60))
    }

    /// Create snapshot and save to filesystem
    pub fn create_and_save_snapshot(&self) -> Result<PathBuf> {
        let snapshot = Snapshot::from_tracker(&self.tracker);
        let entity_count = snapshot.entity_count();

        fs::create_dir_all(&self.config.directory)
            .context("Failed to create snapshot directory")?;

        let path = self.snapshot_path();
        snapshot.save_to_file(&path)?;

        info!(
            entities = entity_count,
            path = %path.display(),
            "Snapshot saved"
        );

        self.cleanup_old_snapshots()?;

        Ok(path)
    }

    /// Format: snapshot-{timestamp}.json.gz
    /// Example: snapshot-20260212T153045.123456Z.json.gz
    fn snapshot_path(&self) -> PathBuf {
        let timestamp = Utc::now().format("%Y%m%dT%H%M%S%.6fZ");
        let filename = format!("snapshot-{}.json.gz", timestamp);
        self.config.directory.join(filename)
    }

    /// Delete old snapshots, keeping only the most recent N
    fn cleanup_old_snapshots(&self) -> Result<()> {
        let mut snapshots = super::recovery::list_snapshots(&self.config.directory)?;

        if snapshots.len() <= self.config.keep_count {
            return Ok(());
        }

        // Timestamp in the filename is lexicographically sortable
        snapshots.sort();

        let delete_count = snapshots.len() - self.config.keep_count;
        for path in &snapshots[..delete_count] {
            if let Err(e) = fs::remove_file(path) {
                error!(error = %e, path = %path.display(), "Failed to delete old snapshot");
            } else {
                info!(path = %path.display(), "Deleted old snapshot");
            }
        }

        Ok(())
    }
}
