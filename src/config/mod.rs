// ABOUTME: Configuration module for the archiver's environment-driven settings
// ABOUTME: Groups Matrix, database, sync-state and logging configuration
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Configuration module
//!
//! - **Environment**: [`Settings`] loaded once from environment variables
//! - **Database**: backend selection and connection parameters
//! - **Logging**: level, console format and file rotation

/// Database backend settings and connection URLs
pub mod database;
/// Environment loading and validation
pub mod environment;
/// Logging settings
pub mod logging;

pub use database::{
    DatabaseSettings, DatabaseUrl, PostgresPoolConfig, PostgresSettings, SqliteSettings,
};
pub use environment::{parse_room_ids, BackendKind, MatrixSettings, Settings};
pub use logging::{LogFormat, LogLevel, LogSettings};
