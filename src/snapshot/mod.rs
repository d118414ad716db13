use crate::state::{DeviceTracker, KnownDevice, TrackedEntity};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

pub mod config;
pub mod manager;
pub mod recovery;

#[cfg(test)]
mod tests;

/// Last-known device state at a specific point in time
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version (for future schema evolution)
    pub snapshot_version: String,

    /// Timestamp when snapshot was created
    pub created_at: DateTime<Utc>,

    /// All entities at snapshot time (entity_id -> TrackedEntity)
    pub entities: HashMap<String, TrackedEntity>,

    /// Devices seen so far (dev_id -> KnownDevice)
    #[serde(default)]
    pub known_devices: HashMap<String, KnownDevice>,
}

impl Snapshot {
    /// Capture the tracker's entities and known devices
    pub fn from_tracker(tracker: &DeviceTracker) -> Self {
        let entities = tracker
            .states()
            .all()
            .into_iter()
            .map(|entity| (entity.entity_id.clone(), entity))
            .collect();

        let known_devices = tracker
            .known_devices()
            .into_iter()
            .map(|device| (device.dev_id.clone(), device))
            .collect();

        Self {
            snapshot_version: "1".to_string(),
            created_at: Utc::now(),
            entities,
            known_devices,
        }
    }

    /// Load the snapshot's entities and known devices into a tracker
    pub fn restore(self, tracker: &DeviceTracker) {
        tracker.states().load_entities(self.entities);
        tracker.load_known_devices(self.known_devices);
    }

    /// Save snapshot to filesystem as compressed JSON (gzip)
    ///
    /// Uses atomic write: writes to .tmp file, fsyncs, then renames.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize snapshot to JSON")?;

        let tmp_path = path.with_extension("tmp");

        {
            let tmp_file = File::create(&tmp_path)
                .context("Failed to create temporary snapshot file")?;

            let mut encoder = GzEncoder::new(tmp_file, Compression::default());
            encoder
                .write_all(json.as_bytes())
                .context("Failed to write compressed snapshot data")?;

            let file = encoder
                .finish()
                .context("Failed to finish compression")?;

            file.sync_all()
                .context("Failed to sync snapshot file to disk")?;
        }

        fs::rename(&tmp_path, path)
            .context("Failed to rename temporary snapshot file")?;

        Ok(())
    }

    /// Load snapshot from compressed JSON file (.json.gz) or plain .json
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .context("Failed to open snapshot file")?;

        let is_compressed = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext == "gz")
            .unwrap_or(false);

        let mut json = String::new();
        if is_compressed {
            GzDecoder::new(file)
                .read_to_string(&mut json)
                .context("Failed to decompress snapshot file")?;
        } else {
            let mut file = file;
            file.read_to_string(&mut json)
                .context("Failed to read snapshot file")?;
        }

        serde_json::from_str(&json).context("Failed to deserialize snapshot JSON")
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}
