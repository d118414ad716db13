//! JSON location tracker over MQTT.
//!
//! Each configured device publishes payloads such as
//! `{"latitude": 2.0, "longitude": 1.0, "gps_accuracy": 60, "battery_level": 99.9}`
//! on its own topic.

use crate::scanner::{Scanner, ScannerContext};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracker::bus::MessageHandler;
use tracker::config::PlatformConfig;
use tracker::{parse_location_payload, BusMessage, DeviceTracker, SeeRequest};

pub const PLATFORM: &str = "mqtt_json";

pub struct MqttJsonScanner;

impl MqttJsonScanner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MqttJsonScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle one payload received on `dev_id`'s topic.
///
/// Malformed or incomplete payloads are logged and dropped; the entity
/// keeps its previous state.
pub fn handle_message(tracker: &DeviceTracker, dev_id: &str, message: &BusMessage) {
    let payload = message.payload_str();

    let location = match parse_location_payload(&payload) {
        Ok(location) => location,
        Err(e) => {
            error!(topic = %message.topic, dev_id = %dev_id, "{}", e);
            return;
        }
    };

    let mut request = SeeRequest::new(dev_id).gps(location.latitude, location.longitude);
    if let Some(accuracy) = location.gps_accuracy {
        request = request.gps_accuracy(accuracy);
    }
    if let Some(battery) = location.battery_level {
        request = request.battery(battery);
    }

    match tracker.see(request) {
        Ok(update) => debug!(
            entity_id = %update.entity_id,
            state = %update.new_state.state,
            "Location updated"
        ),
        Err(e) => warn!(dev_id = %dev_id, error = %e, "Rejected location report"),
    }
}

#[async_trait]
impl Scanner for MqttJsonScanner {
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

            info!(dev_id = %dev_id, topic = %topic, qos = %config.qos, "Tracking device");
        }

        Ok(true)
    }
}
