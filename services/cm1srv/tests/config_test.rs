//! Configuration loading from files

use std::io::Write;

use cm1_registers::Quantity;
use cm1srv::config::ConfigOverrides;
use cm1srv::{Cm1Config, PollController, PollError, SimulatedStation};
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_file_with_cli_overrides() {
    let file = write_config(
        r#"
station:
  port: /dev/ttyS3
  address: 2
  baud_rate: 9600
polling:
  poll_interval_secs: 30
  max_tries: 3
  bucket_size: 0.254
register_map:
  main_start: 1200
sensor_map:
  outTemp: temperature
  rainRate: rain_rate
"#,
    );

    let overrides = ConfigOverrides {
        address: Some(9),
        ..Default::default()
    };
    let config = Cm1Config::load(Some(file.path()), &overrides).unwrap();

    assert_eq!(config.station.port, "/dev/ttyS3");
    assert_eq!(config.station.address, 9);
    assert_eq!(config.station.baud_rate, 9600);
    assert_eq!(config.station.timeout_secs, 6);
    assert_eq!(config.polling.max_tries, 3);
    assert_eq!(config.sensor_map.get("outTemp"), Some(&Quantity::Temperature));
    assert_eq!(config.register_map().unwrap().main.window.start, 1200);
}

#[test]
fn test_unknown_quantity_in_sensor_map() {
    let file = write_config("sensor_map:\n  outTemp: outside_temperature\n");
    let err = Cm1Config::load(Some(file.path()), &ConfigOverrides::default()).unwrap_err();
    assert!(matches!(err, PollError::Configuration(_)));
}

#[test]
fn test_invalid_values_rejected() {
    let file = write_config("polling:\n  bucket_size: 0\n");
    let err = Cm1Config::load(Some(file.path()), &ConfigOverrides::default()).unwrap_err();
    assert!(err.to_string().contains("bucket_size"), "{err}");
}

#[test]
fn test_missing_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    let err = Cm1Config::load(Some(&path), &ConfigOverrides::default()).unwrap_err();
    assert!(matches!(err, PollError::Configuration(msg) if msg.contains("not found")));
}

#[tokio::test]
async fn test_sensor_map_relabels_readings() {
    let file = write_config("sensor_map:\n  outTemp: temperature\n  windSpeed: wind_speed\n");
    let config = Cm1Config::load(Some(file.path()), &ConfigOverrides::default()).unwrap();

    let station = SimulatedStation::with_default_image(config.register_map().unwrap());
    let mut controller = PollController::from_config(station, &config).unwrap();
    let reading = controller.poll_once().await.unwrap();

    assert!(reading.value("outTemp").is_some());
    assert!(reading.contains("windSpeed"));
    assert!(!reading.contains("temperature"));
    assert!(!reading.contains("wind_speed"));
    // Unmapped quantities keep their own names
    assert!(reading.value("battery_voltage").is_some());
    assert!(reading.value("pressure").is_some());
    assert!(reading.contains("tph_status"));
    assert!(reading.contains("rain"));
    assert_eq!(reading.values.len(), Quantity::ALL.len());
}

#[test]
fn test_effective_config_dump_reloads() {
    let config = Cm1Config::default();
    let yaml = serde_yaml::to_string(&config).unwrap();
    assert!(yaml.contains("MS-120"));

    let file = write_config(&yaml);
    let reloaded = Cm1Config::load(Some(file.path()), &ConfigOverrides::default()).unwrap();
    assert_eq!(reloaded, config);
}
