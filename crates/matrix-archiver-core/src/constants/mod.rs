// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Environment variable names and defaults for the Matrix message archiver
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single large file.

/// Service identity
pub mod service_names {
    /// Name used in logs and as the default device display name
    pub const MATRIX_ARCHIVER: &str = "matrix-archiver";
}

/// Matrix session environment variables
pub mod matrix_env {
    /// Homeserver base URL
    pub const HOMESERVER: &str = "MATRIX_HOMESERVER";
    /// Full user id or localpart
    pub const USER: &str = "MATRIX_USER";
    /// Account password
    pub const PASSWORD: &str = "MATRIX_PASSWORD";
    /// Comma-separated room allow-list
    pub const ROOM_IDS: &str = "MATRIX_ROOM_IDS";
    /// Device display name used at login
    pub const DEVICE_NAME: &str = "MATRIX_DEVICE_NAME";
}

/// Database environment variables
pub mod database_env {
    /// Backend selector (`postgresql` or `sqlite`)
    pub const DATABASE_TYPE: &str = "DATABASE_TYPE";
    /// `PostgreSQL` host
    pub const POSTGRES_HOST: &str = "POSTGRES_HOST";
    /// `PostgreSQL` port
    pub const POSTGRES_PORT: &str = "POSTGRES_PORT";
    /// `PostgreSQL` database name
    pub const POSTGRES_DB: &str = "POSTGRES_DB";
    /// `PostgreSQL` role
    pub const POSTGRES_USER: &str = "POSTGRES_USER";
    /// `PostgreSQL` password
    pub const POSTGRES_PASSWORD: &str = "POSTGRES_PASSWORD";
    /// Content toggle for `PostgreSQL`
    pub const POSTGRES_STORE_CONTENT: &str = "POSTGRES_STORE_CONTENT";
    /// `PostgreSQL` pool size
    pub const POSTGRES_MAX_CONNECTIONS: &str = "POSTGRES_MAX_CONNECTIONS";
    /// `SQLite` file path
    pub const SQLITE_DB: &str = "SQLITE_DB";
    /// Content toggle for `SQLite`
    pub const SQLITE_STORE_CONTENT: &str = "SQLITE_STORE_CONTENT";
}

/// Logging environment variables
pub mod logging_env {
    /// Rotated log file path
    pub const FILE_PATH: &str = "LOGGING__FILE_PATH";
    /// Size threshold before rotation, in megabytes
    pub const MAX_SIZE_MB: &str = "LOGGING__MAX_SIZE_MB";
    /// Number of rotated files kept
    pub const BACKUP_COUNT: &str = "LOGGING__BACKUP_COUNT";
    /// Log level
    pub const LEVEL: &str = "LOGGING__LEVEL";
    /// Console format (`json`, `pretty`, `compact`)
    pub const FORMAT: &str = "LOG_FORMAT";
}

/// Sync state environment variables
pub mod sync_env {
    /// Path of the JSON sync-state file
    pub const SYNC_STATE_FILE: &str = "SYNC_STATE_FILE";
}

/// Default values applied when a variable is absent
pub mod defaults {
    /// Backend used when `DATABASE_TYPE` is unset
    pub const DATABASE_TYPE: &str = "postgresql";
    /// `PostgreSQL` host
    pub const POSTGRES_HOST: &str = "localhost";
    /// `PostgreSQL` port
    pub const POSTGRES_PORT: u16 = 5432;
    /// `PostgreSQL` pool size
    pub const POSTGRES_MAX_CONNECTIONS: u32 = 5;
    /// `SQLite` file path
    pub const SQLITE_DB: &str = "matrix_messages.db";
    /// Sync-state file path
    pub const SYNC_STATE_FILE: &str = "matrix_sync_state.json";
    /// Log file path
    pub const LOG_FILE_PATH: &str = "logs/matrix_archiver.log";
    /// Log rotation threshold in megabytes
    pub const LOG_MAX_SIZE_MB: u64 = 10;
    /// Rotated log files kept
    pub const LOG_BACKUP_COUNT: usize = 5;
    /// Log level
    pub const LOG_LEVEL: &str = "INFO";
}

/// Persisted schema names
pub mod schema {
    /// Append-only message table
    pub const MESSAGES_TABLE: &str = "matrix_messages";
}

/// Matrix protocol identifiers
pub mod matrix {
    /// Plain text message type, the only one persisted
    pub const MSGTYPE_TEXT: &str = "m.text";
    /// Sync long-poll timeout in milliseconds
    pub const SYNC_TIMEOUT_MS: u64 = 30_000;
    /// Events requested per `/messages` page during catch-up
    pub const BACKFILL_PAGE_SIZE: u32 = 100;
    /// Updates buffered between the sync loop and the consumer
    pub const UPDATE_CHANNEL_CAPACITY: usize = 256;
    /// Archived event ids remembered per room for replay detection
    pub const RECENT_EVENT_IDS_PER_ROOM: usize = 512;
}

/// Unit conversions
pub mod units {
    /// Bytes per megabyte
    pub const BYTES_PER_MB: u64 = 1024 * 1024;
}
