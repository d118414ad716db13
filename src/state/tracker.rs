use crate::state::engine::StateRegistry;
use crate::state::entity::StateUpdate;
use crate::state::zone::{Zone, STATE_NOT_HOME};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub const DOMAIN: &str = "device_tracker";
pub const STATE_UNKNOWN: &str = "unknown";
pub const SOURCE_TYPE_GPS: &str = "gps";

/// A location report for one device
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SeeRequest {
    pub dev_id: String,
    pub gps: Option<(f64, f64)>,
    pub gps_accuracy: Option<i64>,
    pub battery: Option<f64>,
    pub location_name: Option<String>,
}

impl SeeRequest {
    pub fn new(dev_id: impl Into<String>) -> Self {
        Self {
            dev_id: dev_id.into(),
            ..Default::default()
        }
    }

    pub fn gps(mut self, latitude: f64, longitude: f64) -> Self {
        self.gps = Some((latitude, longitude));
        self
    }

    pub fn gps_accuracy(mut self, accuracy: i64) -> Self {
        self.gps_accuracy = Some(accuracy);
        self
    }

    pub fn battery(mut self, battery: f64) -> Self {
        self.battery = Some(battery);
        self
    }

    pub fn location_name(mut self, name: impl Into<String>) -> Self {
        self.location_name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeeError {
    #[error("invalid device id '{0}'")]
    InvalidDeviceId(String),
}

/// Device remembered after its first sighting
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnownDevice {
    pub dev_id: String,
    pub name: String,
    pub first_seen: DateTime<Utc>,
}

/// Turns location reports into `device_tracker.*` entity states
pub struct DeviceTracker {
    states: Arc<StateRegistry>,
    home: Option<Zone>,
    known_devices: DashMap<String, KnownDevice>,
}

impl DeviceTracker {
    pub fn new(states: Arc<StateRegistry>, home: Option<Zone>) -> Self {
        Self {
            states,
            home,
            known_devices: DashMap::new(),
        }
    }

    pub fn states(&self) -> &Arc<StateRegistry> {
        &self.states
    }

    /// Entity id for a device id, e.g. "device_tracker.zanzito"
    pub fn entity_id(dev_id: &str) -> String {
        format!("{}.{}", DOMAIN, slugify(dev_id))
    }

    /// Record a location report and update the device entity.
    pub fn see(&self, request: SeeRequest) -> Result<StateUpdate, SeeError> {
        let dev_id = slugify(&request.dev_id);
        if dev_id.is_empty() {
            return Err(SeeError::InvalidDeviceId(request.dev_id));
        }
        let entity_id = format!("{}.{}", DOMAIN, dev_id);

        if !self.known_devices.contains_key(&dev_id) {
            self.register_device(&dev_id, &request.dev_id);
        }

        let previous = self.states.get(&entity_id);
        let mut attributes = match (&previous, &request.gps, &request.location_name) {
            // Neither position nor name: keep the last known attributes
            (Some(prev), None, None) => prev.attributes.clone(),
            _ => Map::new(),
        };

        let name = self
            .known_devices
            .get(&dev_id)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| request.dev_id.clone());
        attributes.insert("friendly_name".to_string(), json!(name));

        if let Some((latitude, longitude)) = request.gps {
            attributes.insert("source_type".to_string(), json!(SOURCE_TYPE_GPS));
            attributes.insert("latitude".to_string(), json!(latitude));
            attributes.insert("longitude".to_string(), json!(longitude));
        }
        if let Some(accuracy) = request.gps_accuracy {
            attributes.insert("gps_accuracy".to_string(), json!(accuracy));
        }
        if let Some(battery) = request.battery {
            attributes.insert("battery".to_string(), json!(battery));
        }

        let state = self.resolve_state(&request, previous.as_ref().map(|p| p.state.as_str()));

        Ok(self.states.set(&entity_id, state, attributes))
    }

    fn resolve_state(&self, request: &SeeRequest, previous: Option<&str>) -> String {
        if let Some(name) = &request.location_name {
            return name.clone();
        }

        match request.gps {
            Some((latitude, longitude)) => {
                let accuracy = request.gps_accuracy.unwrap_or(0) as f64;
                match &self.home {
                    Some(zone) if zone.contains(latitude, longitude, accuracy) => zone.name.clone(),
                    _ => STATE_NOT_HOME.to_string(),
                }
            }
            None => previous.unwrap_or(STATE_UNKNOWN).to_string(),
        }
    }

    fn register_device(&self, dev_id: &str, name: &str) {
        let device = KnownDevice {
            dev_id: dev_id.to_string(),
            name: name.to_string(),
            first_seen: Utc::now(),
        };
        info!(dev_id = %dev_id, "Discovered new device");
        self.known_devices.insert(dev_id.to_string(), device);
    }

    pub fn known_devices(&self) -> Vec<KnownDevice> {
        self.known_devices.iter().map(|d| d.value().clone()).collect()
    }

    pub fn is_known(&self, dev_id: &str) -> bool {
        self.known_devices.contains_key(&slugify(dev_id))
    }

    /// Restore previously known devices
    pub fn load_known_devices(&self, devices: HashMap<String, KnownDevice>) {
        for (dev_id, device) in devices {
            self.known_devices.insert(dev_id, device);
        }
    }
}

/// Lower-case the input and replace everything outside `[a-z0-9]` with `_`.
pub fn slugify(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '_'
            }
        })
        .collect()
}
