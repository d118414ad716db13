use crate::bus::{topic, BusError, InvalidQos, QoS};
use serde::Deserialize;
use std::collections::BTreeMap;

pub const CONF_PLATFORM: &str = "platform";
pub const CONF_DEVICES: &str = "devices";
pub const CONF_QOS: &str = "qos";

/// One `[[device_tracker]]` block as written in the configuration file,
/// before validation.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawPlatformConfig(pub toml::Table);

impl RawPlatformConfig {
    pub fn as_table(&self) -> &toml::Table {
        &self.0
    }

    /// Platform name if present, for diagnostics on blocks that fail validation
    pub fn platform_name(&self) -> Option<&str> {
        self.0.get(CONF_PLATFORM).and_then(toml::Value::as_str)
    }
}

impl From<toml::Table> for RawPlatformConfig {
    fn from(table: toml::Table) -> Self {
        Self(table)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("'platform' is required")]
    MissingPlatform,

    #[error("'platform' must be a non-empty string")]
    InvalidPlatform,

    #[error("'devices' is required")]
    MissingDevices,

    #[error("invalid 'devices': {0}")]
    InvalidDevices(String),

    #[error("invalid topic for device '{dev_id}': {source}")]
    InvalidTopic {
        dev_id: String,
        #[source]
        source: BusError,
    },

    #[error(transparent)]
    InvalidQos(#[from] InvalidQos),

    #[error("'qos' must be an integer")]
    InvalidQosType,
}

/// Validated configuration of an MQTT-based tracker platform.
///
/// `qos` is always present: it defaults to [`QoS::AtMostOnce`] when the
/// block does not set it.
#[derive(Clone, Debug, PartialEq)]
pub struct PlatformConfig {
    pub platform: String,
    /// Device id to subscription topic
    pub devices: BTreeMap<String, String>,
    pub qos: QoS,
    /// Keys not interpreted by the MQTT schema
    pub extra: toml::Table,
}

impl PlatformConfig {
    pub fn validate(raw: &RawPlatformConfig) -> Result<Self, ConfigError> {
        let table = raw.as_table();

        let platform = match table.get(CONF_PLATFORM) {
            None => return Err(ConfigError::MissingPlatform),
            Some(toml::Value::String(name)) if !name.trim().is_empty() => name.clone(),
            Some(_) => return Err(ConfigError::InvalidPlatform),
        };

        let devices = match table.get(CONF_DEVICES) {
            None => return Err(ConfigError::MissingDevices),
            Some(toml::Value::Table(devices)) => validate_devices(devices)?,
            Some(other) => {
                return Err(ConfigError::InvalidDevices(format!(
                    "expected a table of device ids to topics, got {}",
                    other.type_str()
                )))
            }
        };

        let qos = match table.get(CONF_QOS) {
            None => QoS::default(),
            Some(toml::Value::Integer(level)) => QoS::try_from(*level)?,
            Some(_) => return Err(ConfigError::InvalidQosType),
        };

        let extra = table
            .iter()
            .filter(|(key, _)| ![CONF_PLATFORM, CONF_DEVICES, CONF_QOS].contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            platform,
            devices,
            qos,
            extra,
        })
    }
}

fn validate_devices(devices: &toml::Table) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut validated: BTreeMap<String, String> = BTreeMap::new();

    for (dev_id, value) in devices {
        if dev_id.trim().is_empty() {
            return Err(ConfigError::InvalidDevices(
                "device id must not be empty".to_string(),
            ));
        }

        let topic = value.as_str().ok_or_else(|| {
            ConfigError::InvalidDevices(format!(
                "topic of device '{}' must be a string, got {}",
                dev_id,
                value.type_str()
            ))
        })?;

        topic::validate_subscribe_topic(topic).map_err(|source| ConfigError::InvalidTopic {
            dev_id: dev_id.clone(),
            source,
        })?;

        // Each message must resolve to exactly one device
        if let Some((other, other_topic)) = validated
            .iter()
            .find(|(_, other_topic)| topic::overlaps(other_topic, topic))
        {
            return Err(ConfigError::InvalidDevices(format!(
                "topic '{}' of device '{}' overlaps topic '{}' of device '{}'",
                topic, dev_id, other_topic, other
            )));
        }

        validated.insert(dev_id.clone(), topic.to_string());
    }

    Ok(validated)
}

#[cfg(test)]
mod platform_tests {
    use super::*;

    fn raw(toml: &str) -> RawPlatformConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_qos_injected_when_missing() {
        let config = PlatformConfig::validate(&raw(
            r#"
            platform = "mqtt_json"
            devices = { paulus = "location/paulus" }
            "#,
        ))
        .unwrap();

        assert_eq!(config.platform, "mqtt_json");
        assert_eq!(config.qos, QoS::AtMostOnce);
        assert_eq!(config.devices["paulus"], "location/paulus");
    }

    #[test]
    fn test_explicit_qos_kept() {
        let config = PlatformConfig::validate(&raw(
            r#"
            platform = "mqtt_json"
            qos = 2
            devices = { paulus = "location/paulus" }
            "#,
        ))
        .unwrap();
        assert_eq!(config.qos, QoS::ExactlyOnce);
    }

    #[test]
    fn test_invalid_qos_rejected() {
        let err = PlatformConfig::validate(&raw(
            r#"
            platform = "mqtt_json"
            qos = 3
            devices = { paulus = "location/paulus" }
            "#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidQos(InvalidQos(3))));

        let err = PlatformConfig::validate(&raw(
            r#"
            platform = "mqtt_json"
            qos = "high"
            devices = { paulus = "location/paulus" }
            "#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidQosType));
    }

    #[test]
    fn test_missing_platform_and_devices() {
        let err = PlatformConfig::validate(&raw(r#"devices = { a = "t/a" }"#)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPlatform));

        let err = PlatformConfig::validate(&raw(r#"platform = "mqtt_json""#)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDevices));

        let err = PlatformConfig::validate(&raw(
            r#"
            platform = "mqtt_json"
            devices = ["location/paulus"]
            "#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDevices(_)));
    }

    #[test]
    fn test_invalid_topic_rejected() {
        let err = PlatformConfig::validate(&raw(
            r#"
            platform = "mqtt_json"
            devices = { paulus = "location/#/paulus" }
            "#,
        ))
        .unwrap_err();
        match err {
            ConfigError::InvalidTopic { dev_id, .. } => assert_eq!(dev_id, "paulus"),
            other => panic!("Expected InvalidTopic, got {:?}", other),
        }
    }

    #[test]
    fn test_non_string_topic_rejected() {
        let err = PlatformConfig::validate(&raw(
            r#"
            platform = "mqtt_json"
            devices = { paulus = 42 }
            "#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDevices(_)));
    }

    #[test]
    fn test_shared_topic_rejected() {
        let err = PlatformConfig::validate(&raw(
            r#"
            platform = "mqtt_json"
            devices = { paulus = "location/phone", zanzito = "location/phone" }
            "#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDevices(_)));
    }

    #[test]
    fn test_extra_keys_preserved() {
        let config = PlatformConfig::validate(&raw(
            r#"
            platform = "mqtt_json"
            devices = { paulus = "location/paulus" }
            track_new_devices = false
            "#,
        ))
        .unwrap();
        assert_eq!(
            config.extra.get("track_new_devices"),
            Some(&toml::Value::Boolean(false))
        );
        assert!(!config.extra.contains_key("qos"));
    }

    #[test]
    fn test_overlapping_topics_rejected() {
        let err = PlatformConfig::validate(&raw(
            r#"
            platform = "mqtt_json"
            devices = { everyone = "location/+", zanzito = "location/zanzito" }
            "#,
        ))
        .unwrap_err();
        match err {
            ConfigError::InvalidDevices(reason) => {
                assert!(reason.contains("location/+"));
                assert!(reason.contains("location/zanzito"));
            }
            other => panic!("Expected InvalidDevices, got {:?}", other),
        }

        let config = PlatformConfig::validate(&raw(
            r#"
            platform = "mqtt_json"
            devices = { paulus = "location/paulus/#", zanzito = "location/zanzito" }
            "#,
        ))
        .unwrap();
        assert_eq!(config.devices.len(), 2);
    }
}
