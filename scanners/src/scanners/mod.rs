//! Built-in device tracker platforms.

pub mod mqtt;
pub mod mqtt_json;

pub use mqtt::MqttScanner;
pub use mqtt_json::MqttJsonScanner;
