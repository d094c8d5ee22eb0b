// ABOUTME: Unit tests for logging functionality
// ABOUTME: Validates the rotated file writer and the level filter built from settings
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use matrix_archiver::config::{LogFormat, LogLevel, LogSettings};
use matrix_archiver::logging::LoggingConfig;
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::TempDir;

fn settings_in(dir: &TempDir) -> LogSettings {
    LogSettings {
        file_path: dir.path().join("logs").join("nested").join("archiver.log"),
        max_size_mb: 1,
        backup_count: 2,
        level: LogLevel::Debug,
        format: LogFormat::Compact,
    }
}

#[test]
fn test_file_writer_creates_log_directory() {
    let dir = TempDir::new().unwrap();
    let config = LoggingConfig::new(settings_in(&dir));

    let mut writer = config.file_writer().unwrap();
    writer.write_all(b"archiver started\n").unwrap();
    writer.flush().unwrap();

    let written = std::fs::read_to_string(&config.settings.file_path).unwrap();
    assert_eq!(written, "archiver started\n");
}

#[test]
fn test_file_writer_rotates_at_size_limit() {
    let dir = TempDir::new().unwrap();
    let config = LoggingConfig::new(settings_in(&dir));
    let line = vec![b'x'; 64 * 1024];

    let mut writer = config.file_writer().unwrap();
    for _ in 0..20 {
        writer.write_all(&line).unwrap();
    }
    writer.flush().unwrap();

    let rotated = dir
        .path()
        .join("logs")
        .join("nested")
        .join("archiver.log.1");
    assert!(rotated.exists(), "expected a rotated backup at {}", rotated.display());
}

#[test]
#[serial]
fn test_env_filter_uses_configured_level() {
    env::remove_var("RUST_LOG");
    let dir = TempDir::new().unwrap();
    let config = LoggingConfig::new(settings_in(&dir));

    let filter = config.env_filter().to_string();
    assert!(filter.contains("matrix_archiver=debug"));
    assert!(filter.contains("sqlx=warn"));
    assert!(filter.contains("matrix_sdk=warn"));
}

#[test]
#[serial]
fn test_rust_log_overrides_base_level() {
    env::set_var("RUST_LOG", "trace");
    let dir = TempDir::new().unwrap();
    let config = LoggingConfig::new(settings_in(&dir));

    let filter = config.env_filter().to_string();
    assert!(filter.contains("trace"));
    assert!(filter.contains("hyper=warn"));
    assert!(!filter.contains("matrix_archiver=debug"));

    env::remove_var("RUST_LOG");
}

#[test]
#[serial]
fn test_rust_log_crate_directive_is_not_overridden() {
    env::set_var("RUST_LOG", "warn,matrix_archiver=trace");
    let dir = TempDir::new().unwrap();
    let config = LoggingConfig::new(settings_in(&dir));

    let filter = config.env_filter().to_string();
    assert!(filter.contains("matrix_archiver=trace"));
    assert!(!filter.contains("matrix_archiver=debug"));

    env::remove_var("RUST_LOG");
}

#[test]
fn test_max_size_bytes() {
    let dir = TempDir::new().unwrap();
    let settings = LogSettings {
        max_size_mb: 10,
        ..settings_in(&dir)
    };
    assert_eq!(settings.max_size_bytes(), 10 * 1024 * 1024);
}
