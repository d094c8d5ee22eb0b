// ABOUTME: Environment configuration loading for the Matrix archiver
// ABOUTME: Reads MATRIX_*, DATABASE_TYPE, POSTGRES_*, SQLITE_* and LOGGING__* into typed settings
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Environment-based configuration management
//!
//! All configuration comes from environment variables. A `.env` file is loaded
//! first when present; variables already set in the process take precedence.
//! Loading goes through [`Settings::from_lookup`] so tests can supply a map
//! instead of mutating the process environment.

use super::database::{DatabaseSettings, PostgresPoolConfig, PostgresSettings, SqliteSettings};
use super::logging::{LogFormat, LogLevel, LogSettings};
use crate::constants::{database_env, defaults, logging_env, matrix_env, service_names, sync_env};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};
use url::Url;

/// Which relational backend receives messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// `PostgreSQL` server
    PostgreSQL,
    /// `SQLite` file
    SQLite,
}

impl BackendKind {
    /// Parse a `DATABASE_TYPE` value
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` for anything other than `postgresql`/`postgres`/`sqlite`
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(Self::PostgreSQL),
            "sqlite" => Ok(Self::SQLite),
            other => Err(AppError::config_invalid(format!(
                "Unsupported {}: '{other}' (expected 'postgresql' or 'sqlite')",
                database_env::DATABASE_TYPE
            ))),
        }
    }
}

/// Matrix account and room selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixSettings {
    /// Homeserver base URL
    pub homeserver: String,
    /// User id or localpart
    pub user: String,
    /// Account password
    #[serde(skip_serializing)]
    pub password: String,
    /// Rooms to join and monitor; empty means every joined room
    pub room_ids: Vec<String>,
    /// Device display name announced at login
    pub device_name: String,
}

/// Complete archiver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Matrix session settings
    pub matrix: MatrixSettings,
    /// Relational store settings
    pub database: DatabaseSettings,
    /// Sync-token file
    pub sync_state_file: PathBuf,
    /// Logging settings
    pub logging: LogSettings,
}

impl Settings {
    /// Load configuration from the process environment
    ///
    /// Loads `.env` from the working directory first if one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing`/`ConfigInvalid` naming the offending variable
    pub fn from_env() -> AppResult<Self> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file loaded: {e}");
        }
        Self::from_process_env()
    }

    /// Load a specific dotenv file, then the process environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` if the file cannot be read, otherwise as [`Self::from_env`]
    pub fn from_env_file(path: &Path) -> AppResult<Self> {
        dotenvy::from_path(path).map_err(|e| {
            AppError::config_invalid(format!("Cannot load env file {}: {e}", path.display()))
                .with_source(e)
        })?;
        Self::from_process_env()
    }

    fn from_process_env() -> AppResult<Self> {
        info!("Loading configuration from environment variables");
        let settings = Self::from_lookup(|key| env::var(key).ok())?;
        info!("Configuration loaded successfully");
        Ok(settings)
    }

    /// Build settings from an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing`/`ConfigInvalid` naming the offending variable
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let matrix = MatrixSettings {
            homeserver: vars.required(matrix_env::HOMESERVER)?,
            user: vars.required(matrix_env::USER)?,
            password: vars.required(matrix_env::PASSWORD)?,
            room_ids: parse_room_ids(&vars.or(matrix_env::ROOM_IDS, "")),
            device_name: vars.or(matrix_env::DEVICE_NAME, service_names::MATRIX_ARCHIVER),
        };

        let backend =
            BackendKind::parse(&vars.or(database_env::DATABASE_TYPE, defaults::DATABASE_TYPE))?;
        let database = match backend {
            BackendKind::PostgreSQL => DatabaseSettings::PostgreSQL(PostgresSettings {
                host: vars.or(database_env::POSTGRES_HOST, defaults::POSTGRES_HOST),
                port: vars.parsed(database_env::POSTGRES_PORT, defaults::POSTGRES_PORT)?,
                database: vars.required(database_env::POSTGRES_DB)?,
                user: vars.required(database_env::POSTGRES_USER)?,
                password: vars.or(database_env::POSTGRES_PASSWORD, ""),
                store_content: vars.flag(database_env::POSTGRES_STORE_CONTENT),
                pool: PostgresPoolConfig {
                    max_connections: vars.parsed(
                        database_env::POSTGRES_MAX_CONNECTIONS,
                        defaults::POSTGRES_MAX_CONNECTIONS,
                    )?,
                },
            }),
            BackendKind::SQLite => DatabaseSettings::SQLite(SqliteSettings {
                path: PathBuf::from(vars.or(database_env::SQLITE_DB, defaults::SQLITE_DB)),
                store_content: vars.flag(database_env::SQLITE_STORE_CONTENT),
            }),
        };

        let level_raw = vars.or(logging_env::LEVEL, defaults::LOG_LEVEL);
        let logging = LogSettings {
            file_path: PathBuf::from(vars.or(logging_env::FILE_PATH, defaults::LOG_FILE_PATH)),
            max_size_mb: vars.parsed(logging_env::MAX_SIZE_MB, defaults::LOG_MAX_SIZE_MB)?,
            backup_count: vars.parsed(logging_env::BACKUP_COUNT, defaults::LOG_BACKUP_COUNT)?,
            level: LogLevel::parse(&level_raw).ok_or_else(|| {
                AppError::config_invalid(format!(
                    "Invalid {}: '{level_raw}'",
                    logging_env::LEVEL
                ))
            })?,
            format: LogFormat::from_str_or_default(&vars.or(logging_env::FORMAT, "pretty")),
        };

        let settings = Self {
            matrix,
            database,
            sync_state_file: PathBuf::from(
                vars.or(sync_env::SYNC_STATE_FILE, defaults::SYNC_STATE_FILE),
            ),
            logging,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing or invalid setting
    pub fn validate(&self) -> AppResult<()> {
        if self.matrix.homeserver.trim().is_empty() {
            return Err(AppError::config_missing(matrix_env::HOMESERVER));
        }
        if self.matrix.user.trim().is_empty() {
            return Err(AppError::config_missing(matrix_env::USER));
        }
        if self.matrix.password.is_empty() {
            return Err(AppError::config_missing(matrix_env::PASSWORD));
        }

        let homeserver = Url::parse(&self.matrix.homeserver).map_err(|e| {
            AppError::config_invalid(format!(
                "{} is not a valid URL: {e}",
                matrix_env::HOMESERVER
            ))
        })?;
        if !matches!(homeserver.scheme(), "http" | "https") {
            return Err(AppError::config_invalid(format!(
                "{} must use http or https",
                matrix_env::HOMESERVER
            )));
        }

        if self.logging.backup_count == 0 {
            return Err(AppError::config_invalid(format!(
                "{} must be at least 1",
                logging_env::BACKUP_COUNT
            )));
        }
        if self.logging.max_size_mb == 0 {
            return Err(AppError::config_invalid(format!(
                "{} must be at least 1",
                logging_env::MAX_SIZE_MB
            )));
        }

        self.database.validate()
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        let rooms = if self.matrix.room_ids.is_empty() {
            "all joined rooms".to_owned()
        } else {
            self.matrix.room_ids.join(", ")
        };
        let database = self
            .database
            .url()
            .map_or_else(|_| self.database.backend_name().to_owned(), |u| u.redacted());

        format!(
            "Matrix Archiver Configuration:\n\
             - Homeserver: {}\n\
             - User: {}\n\
             - Rooms: {rooms}\n\
             - Database: {} ({database})\n\
             - Store Content: {}\n\
             - Sync State File: {}\n\
             - Log File: {} ({} MB x {})\n\
             - Log Level: {}",
            self.matrix.homeserver,
            self.matrix.user,
            self.database.backend_name(),
            if self.database.store_content() {
                "Enabled"
            } else {
                "Disabled"
            },
            self.sync_state_file.display(),
            self.logging.file_path.display(),
            self.logging.max_size_mb,
            self.logging.backup_count,
            self.logging.level,
        )
    }
}

/// Borrowed variable lookup with typed accessors
struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_owned())
    }

    fn required(&self, key: &str) -> AppResult<String> {
        self.get(key).ok_or_else(|| AppError::config_missing(key))
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    fn parsed<T>(&self, key: &str, default: T) -> AppResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.get(key).map_or(Ok(default), |raw| {
            raw.trim().parse().map_err(|e| {
                AppError::config_invalid(format!("Invalid {key} value '{raw}': {e}"))
            })
        })
    }
}

/// Parse comma-separated room ids, trimming whitespace and dropping empties
#[must_use]
pub fn parse_room_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
