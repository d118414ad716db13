// Publish/subscribe transport (MQTT and in-memory)
pub mod bus;

// Configuration loading and platform validation
pub mod config;

// Location payload parsing
pub mod location;

// Entity state registry and device tracking
pub mod state;

// Periodic persistence of tracked state
pub mod snapshot;

pub use bus::{BusMessage, MessageTransport, QoS};
pub use location::{parse_location_payload, LocationMessage, PayloadError};
pub use state::{DeviceTracker, SeeRequest, StateRegistry};
