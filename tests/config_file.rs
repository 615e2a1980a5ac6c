//! Configuration loading from disk.

use drishti_io::config::{Config, Endpoint};
use drishti_io::Error;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn loads_full_config() {
    let file = write_config(
        r#"
[lidar]
port = "/dev/ttyS2"
baud_rate = 230400
resync_on_crc_error = false

[zones]
sweep_start_deg = 330.0
sweep_end_deg = 30.0
keeping_length_ms = 400
min_confidence = 180

[pipeline]
ingest_capacity = 2048

[telemetry]
endpoint = "tcp:127.0.0.1:5557"
emit_points = false

[logging]
level = "debug"
"#,
    );

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.lidar.port, "/dev/ttyS2");
    assert!(!config.lidar.resync_on_crc_error);
    assert_eq!(config.zones.keeping_length_ms, 400);
    assert_eq!(config.zones.min_confidence, 180);
    assert_eq!(config.zones.aggregation_interval_ms, 100);
    assert_eq!(config.pipeline.ingest_capacity, 2048);
    assert_eq!(config.pipeline.outbound_capacity, 5000);
    assert!(!config.telemetry.emit_points);
    assert_eq!(
        config.telemetry.parse_endpoint().unwrap(),
        Endpoint::Tcp("127.0.0.1:5557".to_string())
    );
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn defaults_fill_optional_sections() {
    let file = write_config(
        r#"
[lidar]
port = "/dev/ttyUSB0"

[zones]
sweep_start_deg = 290.0
sweep_end_deg = 70.0
"#,
    );

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.lidar.baud_rate, 230_400);
    assert_eq!(
        config.telemetry.parse_endpoint().unwrap(),
        Endpoint::Unix(PathBuf::from("/tmp/drishti.sock"))
    );
    assert_eq!(config.telemetry.send_timeout_ms, 500);
}

#[test]
fn missing_sweep_is_fatal() {
    let file = write_config(
        r#"
[lidar]
port = "/dev/ttyUSB0"

[zones]
sweep_start_deg = 290.0
"#,
    );
    assert!(matches!(
        Config::from_file(file.path()),
        Err(Error::ConfigParse(_))
    ));
}

#[test]
fn invalid_values_are_rejected() {
    let file = write_config(
        r#"
[lidar]
port = "/dev/ttyUSB0"

[zones]
sweep_start_deg = 290.0
sweep_end_deg = 420.0
"#,
    );
    assert!(matches!(
        Config::from_file(file.path()),
        Err(Error::Config(_))
    ));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Config::from_file(dir.path().join("absent.toml")),
        Err(Error::Io(_))
    ));
}
