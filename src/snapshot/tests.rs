use super::*;
use crate::state::{SeeRequest, StateRegistry};
use std::sync::Arc;
use tempfile::TempDir;

fn populated_tracker() -> DeviceTracker {
    let tracker = DeviceTracker::new(Arc::new(StateRegistry::new()), None);
    tracker
        .see(
            SeeRequest::new("zanzito")
                .gps(2.0, 1.0)
                .gps_accuracy(60)
                .battery(99.9),
        )
        .unwrap();
    tracker
        .see(SeeRequest::new("paulus").location_name("work"))
        .unwrap();
    tracker
}

#[test]
fn test_snapshot_from_tracker() {
    let snapshot = Snapshot::from_tracker(&populated_tracker());

    assert_eq!(snapshot.snapshot_version, "1");
    assert_eq!(snapshot.entity_count(), 2);
    assert_eq!(snapshot.known_devices.len(), 2);

    let zanzito = &snapshot.entities["device_tracker.zanzito"];
    assert_eq!(zanzito.latitude(), Some(2.0));
    assert_eq!(zanzito.longitude(), Some(1.0));
}

#[test]
fn test_save_and_restore_into_fresh_tracker() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("snapshot-test.json.gz");

    Snapshot::from_tracker(&populated_tracker())
        .save_to_file(&path)
        .unwrap();
    assert!(!temp_dir.path().join("snapshot-test.json.tmp").exists());

    let restored = DeviceTracker::new(Arc::new(StateRegistry::new()), None);
    Snapshot::load_from_file(&path).unwrap().restore(&restored);

    let zanzito = restored.states().get("device_tracker.zanzito").unwrap();
    assert_eq!(zanzito.latitude(), Some(2.0));
    assert_eq!(zanzito.attribute("battery"), Some(&serde_json::json!(99.9)));
    assert_eq!(restored.states().get("device_tracker.paulus").unwrap().state, "work");
    assert!(restored.is_known("zanzito"));
    assert!(restored.is_known("paulus"));
}

#[test]
fn test_load_uncompressed_json() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("snapshot-plain.json");

    let snapshot = Snapshot::from_tracker(&populated_tracker());
    std::fs::write(&path, serde_json::to_string(&snapshot).unwrap()).unwrap();

    let loaded = Snapshot::load_from_file(&path).unwrap();
    assert_eq!(loaded.entity_count(), 2);
}

#[test]
fn test_load_snapshot_without_known_devices() {
    // Older snapshots carry no known_devices section
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("snapshot-old.json");
    std::fs::write(
        &path,
        r#"{"snapshot_version":"1","created_at":"2026-02-12T10:00:00Z","entities":{}}"#,
    )
    .unwrap();

    let loaded = Snapshot::load_from_file(&path).unwrap();
    assert_eq!(loaded.entity_count(), 0);
    assert!(loaded.known_devices.is_empty());
}

#[test]
fn test_load_missing_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let result = Snapshot::load_from_file(&temp_dir.path().join("missing.json.gz"));
    assert!(result.is_err());
}
