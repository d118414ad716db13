use anyhow::{Context, Result};
use device_scanners::{ScannerContext, ScannerHost};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracker::bus::MqttTransport;
use tracker::config::load_config;
use tracker::snapshot::manager::SnapshotManager;
use tracker::snapshot::recovery::load_latest_snapshot;
use tracker::{DeviceTracker, StateRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "device_tracker=info,device_scanners=info,tracker=info".into()),
        )
        .init();

    info!("Device tracker starting...");

    let config_path = std::env::var("DEVICE_TRACKER_CONFIG")
        .unwrap_or_else(|_| "device_tracker.toml".to_string());
    let config = load_config(&config_path)?;

    info!(
        config = %config_path,
        mqtt_host = %config.mqtt.host,
        mqtt_port = config.mqtt.port,
        platforms = config.device_tracker.len(),
        "Configuration loaded"
    );

    let states = Arc::new(StateRegistry::new());
    let tracker = Arc::new(DeviceTracker::new(Arc::clone(&states), config.home.clone()));

    // Restore last known positions before any message arrives
    if config.snapshot.enabled {
        match load_latest_snapshot(&config.snapshot.directory) {
            Ok(Some(snapshot)) => snapshot.restore(&tracker),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read snapshots, starting with empty state"),
        }
    }

    let bus = Arc::new(MqttTransport::connect(&config.mqtt));
    let ctx = ScannerContext::new(bus.clone(), Arc::clone(&tracker));
    let host = ScannerHost::new(ctx);
    info!(platforms = ?host.platforms(), "Scanners registered");

    let report = host.setup_component(&config.device_tracker).await;
    info!(
        activated = report.activated(),
        declined = report.declined(),
        "Device tracker platforms set up"
    );

    let state_log_handle = tokio::spawn(log_state_changes(states.subscribe()));

    let snapshot_manager = SnapshotManager::new(Arc::clone(&tracker), config.snapshot.clone());
    let snapshot_handle = tokio::spawn(async move {
        if let Err(e) = snapshot_manager.run_snapshot_loop().await {
            tracing::error!(error = %e, "Snapshot manager stopped");
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    snapshot_handle.abort();
    state_log_handle.abort();

    // Final snapshot so the next start resumes from the latest positions
    if config.snapshot.enabled {
        let final_snapshot = SnapshotManager::new(Arc::clone(&tracker), config.snapshot.clone());
        if let Err(e) = final_snapshot.create_and_save_snapshot() {
            warn!(error = %e, "Failed to save final snapshot");
        }
    }

    drop(host);
    match Arc::try_unwrap(bus) {
        Ok(bus) => bus.disconnect().await,
        Err(_) => warn!("MQTT transport still in use, skipping clean disconnect"),
    }

    info!("Device tracker stopped");
    Ok(())
}

async fn log_state_changes(mut rx: broadcast::Receiver<tracker::state::StateUpdate>) {
    loop {
        match rx.recv().await {
            Ok(update) => debug!(
                entity_id = %update.entity_id,
                state = %update.new_state.state,
                "State changed"
            ),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped = skipped, "State log lagged, skipped updates");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
