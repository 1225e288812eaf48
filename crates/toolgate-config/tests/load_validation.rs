// crates/toolgate-config/tests/load_validation.rs
// ============================================================================
// Module: Config Load Tests
// Description: File loading tests for the gateway configuration.
// Purpose: Ensure size, encoding, and path limits fail closed.
// Dependencies: toolgate-config, tempfile
// ============================================================================

//! ## Overview
//! Exercises on-disk loading: happy path, oversized files, invalid UTF-8,
//! and missing files.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;

use toolgate_config::ConfigError;
use toolgate_config::GatewayConfig;

#[test]
fn loads_a_valid_file_from_an_explicit_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("toolgate.toml");
    fs::write(
        &path,
        r#"
        [server]
        name = "edge-gateway"
        bind = "127.0.0.1:7411"
        "#,
    )
    .expect("write");
    let config = GatewayConfig::load(Some(&path)).expect("config");
    assert_eq!(config.server.name, "edge-gateway");
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.toml");
    let err = GatewayConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn oversized_file_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("big.toml");
    let mut content = String::from("[server]\nbind = \"127.0.0.1:7411\"\n");
    content.push('#');
    content.push_str(&"x".repeat(1024 * 1024 + 1));
    fs::write(&path, content).expect("write");
    let err = GatewayConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(detail) if detail.contains("size limit")));
}

#[test]
fn invalid_utf8_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("binary.toml");
    fs::write(&path, [0xff, 0xfe, 0x00, 0x01]).expect("write");
    let err = GatewayConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(detail) if detail.contains("UTF-8")));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[server\nbind = oops").expect("write");
    let err = GatewayConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}
