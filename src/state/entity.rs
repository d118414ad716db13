use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Addressable state object of one tracked device
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackedEntity {
    /// Entity identifier (e.g., "device_tracker.zanzito")
    pub entity_id: String,

    /// Zone or location name ("home", "not_home", "work", ...)
    pub state: String,

    /// Position and device attributes
    pub attributes: Map<String, Value>,

    /// Last update timestamp
    pub last_updated: DateTime<Utc>,
}

impl TrackedEntity {
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn latitude(&self) -> Option<f64> {
        self.attribute("latitude").and_then(Value::as_f64)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.attribute("longitude").and_then(Value::as_f64)
    }
}

/// State change broadcast to subscribers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateUpdate {
    pub entity_id: String,
    pub old_state: Option<TrackedEntity>,
    pub new_state: TrackedEntity,
}
