mod common;

use common::Harness;
use std::io::Write;
use tempfile::NamedTempFile;
use tracker::config::load_config;
use tracker::QoS;

#[tokio::test]
async fn test_setup_from_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
        [mqtt]
        host = "localhost"

        [home]
        latitude = 2.0
        longitude = 1.0
        radius = 50.0

        [[device_tracker]]
        platform = "mqtt_json"
        qos = 2
        devices = {{ zanzito = "location/zanzito" }}
        "#
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.device_tracker.len(), 1);

    let harness = Harness::with_home(config.home.clone());
    let report = harness.host.setup_component(&config.device_tracker).await;
    assert!(report.all_activated());
    assert_eq!(
        harness.bus.subscriptions(),
        vec![("location/zanzito".to_string(), QoS::ExactlyOnce)]
    );

    harness.bus.fire_message(
        "location/zanzito",
        r#"{"latitude": 2.0, "longitude": 1.0, "gps_accuracy": 10}"#,
    );

    let entity = harness.tracker.states().get("device_tracker.zanzito").unwrap();
    assert_eq!(entity.state, "home");
}

#[test]
fn test_missing_config_file() {
    let err = load_config("/nonexistent/device_tracker.toml").unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read config file"));
}
