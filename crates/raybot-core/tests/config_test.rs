//! Configuration loading and validation tests.

use std::io::Write;
use std::time::Duration;

use raybot_core::{AppConfig, Error};

#[test]
fn test_empty_document_uses_defaults() {
    let config = AppConfig::from_toml_str("").unwrap();
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_partial_document() {
    let config = AppConfig::from_toml_str(
        r#"
        [hardware.pic]
        port = "/dev/ttyACM0"
        command_ack_timeout_ms = 2000

        [hardware.esp]
        enable_ack = false
        "#,
    )
    .unwrap();

    assert_eq!(config.hardware.pic.port, "/dev/ttyACM0");
    assert_eq!(config.hardware.pic.baud_rate, 9600);
    assert!(config.hardware.pic.enable_ack);
    assert_eq!(config.hardware.pic.command_ack_timeout(), Duration::from_secs(2));
    assert!(!config.hardware.esp.enable_ack);
}

#[test]
fn test_invalid_values_rejected() {
    let err = AppConfig::from_toml_str(
        r#"
        [hardware.esp]
        port = ""
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Validation(msg) if msg.contains("hardware.esp.port")));

    let err = AppConfig::from_toml_str(
        r#"
        [cloud]
        heartbeat_interval_ms = 0
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn test_malformed_document() {
    let err = AppConfig::from_toml_str("[hardware.pic\nport = 1").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [log]
        level = "debug"
        json = true
        "#
    )
    .unwrap();

    let config = AppConfig::load(file.path()).unwrap();
    assert_eq!(config.log.level, "debug");
    assert!(config.log.json);
}

#[test]
fn test_load_missing_file() {
    let err = AppConfig::load("/definitely/not/here.toml").unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
