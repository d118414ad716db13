pub mod platform;
pub use platform::{ConfigError, PlatformConfig, RawPlatformConfig};

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// Re-export existing config types
pub use crate::bus::MqttConfig;
pub use crate::snapshot::config::SnapshotConfig;
pub use crate::state::Zone;

/// Complete device tracker configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub mqtt: MqttConfig,
    /// Home zone; without it GPS positions always resolve to "not_home"
    #[serde(default)]
    pub home: Option<Zone>,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    /// Platform blocks, validated individually at setup
    #[serde(default)]
    pub device_tracker: Vec<RawPlatformConfig>,
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<TrackerConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("Invalid config file {}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<TrackerConfig> {
    let config: TrackerConfig = toml::from_str(contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::QoS;

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.mqtt.keep_alive_secs, 60);
        assert!(config.mqtt.client_id.is_none());
        assert!(config.home.is_none());
        assert_eq!(config.snapshot.enabled, true);
        assert_eq!(config.snapshot.interval_minutes, 5);
        assert!(config.device_tracker.is_empty());
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [mqtt]
            host = "broker.example.com"
            port = 8883
            client_id = "tracker-1"
            username = "hass"
            password = "secret"

            [home]
            latitude = 52.3731
            longitude = 4.8922
            radius = 250.0

            [snapshot]
            enabled = false
            interval_minutes = 10
            directory = "/tmp/snapshots"
            keep_count = 5

            [[device_tracker]]
            platform = "mqtt_json"
            devices = { zanzito = "location/zanzito" }

            [[device_tracker]]
            platform = "mqtt"
            qos = 1
            devices = { paulus = "location/paulus" }
        "#;

        let config = parse_config(toml).unwrap();
        assert_eq!(config.mqtt.host, "broker.example.com");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.client_id.as_deref(), Some("tracker-1"));
        assert_eq!(config.mqtt.username.as_deref(), Some("hass"));

        let home = config.home.unwrap();
        assert_eq!(home.name, "home");
        assert_eq!(home.radius, 250.0);

        assert_eq!(config.snapshot.enabled, false);
        assert_eq!(config.snapshot.keep_count, 5);

        assert_eq!(config.device_tracker.len(), 2);
        let json = PlatformConfig::validate(&config.device_tracker[0]).unwrap();
        assert_eq!(json.platform, "mqtt_json");
        assert_eq!(json.qos, QoS::AtMostOnce);
        let plain = PlatformConfig::validate(&config.device_tracker[1]).unwrap();
        assert_eq!(plain.qos, QoS::AtLeastOnce);
    }

    #[test]
    fn test_partial_config() {
        // Missing sections use defaults
        let toml = r#"
            [mqtt]
            port = 1884
        "#;

        let config = parse_config(toml).unwrap();
        assert_eq!(config.mqtt.port, 1884);
        assert_eq!(config.mqtt.keep_alive_secs, 60);
        assert_eq!(config.snapshot.keep_count, 10);
        assert!(config.home.is_none());
    }

    #[test]
    fn test_invalid_platform_block_still_loads() {
        // Validation happens per platform at setup, not at load
        let toml = r#"
            [[device_tracker]]
            platform = "mqtt_json"
            qos = 9
            devices = { zanzito = "location/zanzito" }
        "#;

        let config = parse_config(toml).unwrap();
        assert_eq!(config.device_tracker.len(), 1);
        assert!(PlatformConfig::validate(&config.device_tracker[0]).is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/device_tracker.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
