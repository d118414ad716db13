//! Location-name tracker over MQTT: the payload is the zone the device is in.

use crate::scanner::{Scanner, ScannerContext};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracker::bus::MessageHandler;
use tracker::config::PlatformConfig;
use tracker::{BusMessage, DeviceTracker, SeeRequest};

pub const PLATFORM: &str = "mqtt";

#[derive(Default)]
pub struct MqttScanner;

impl MqttScanner {
    pub fn new() -> Self {
        Self
    }
}

pub fn handle_message(tracker: &DeviceTracker, dev_id: &str, message: &BusMessage) {
    let payload = message.payload_str();
    let location_name = payload.trim();

    if location_name.is_empty() {
        warn!(topic = %message.topic, "Ignoring empty location payload");
        return;
    }

    match tracker.see(SeeRequest::new(dev_id).location_name(location_name)) {
        Ok(update) => debug!(
            entity_id = %update.entity_id,
            state = %update.new_state.state,
            "Location updated"
        ),
        Err(e) => warn!(dev_id = %dev_id, error = %e, "Rejected location report"),
    }
}

#[async_trait]
impl Scanner for MqttScanner {
    fn platform(&self) -> &str {
        PLATFORM
    }

    async fn setup_scanner(&self, ctx: &ScannerContext, config: &PlatformConfig) -> Result<bool> {
        for (dev_id, topic) in &config.devices {
            let tracker = Arc::clone(&ctx.tracker);
            let device = dev_id.clone();
            let handler: MessageHandler =
                Arc::new(move |message: &BusMessage| handle_message(&tracker, &device, message));

            ctx.bus
                .subscribe(topic, config.qos, handler)
                .await
                .with_context(|| format!("Failed to subscribe to '{}' for '{}'", topic, dev_id))?;

            info!(dev_id = %dev_id, topic = %topic, "Tracking device location names");
        }

        Ok(true)
    }
}
