// ABOUTME: Database factory selecting the SQLite or PostgreSQL backend at startup
// ABOUTME: Detects the backend from the connection URL and delegates the provider trait
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Database factory for creating database providers
//!
//! The backend is chosen once from the connection string. Every
//! [`DatabaseProvider`] call on [`Database`] forwards to that backend.

use super::DatabaseProvider;
use crate::config::{DatabaseSettings, PostgresPoolConfig};
use crate::errors::{AppResult, DatabaseError};
use crate::models::{MessageRecord, StoredMessage};
use async_trait::async_trait;
use tracing::{debug, info};

#[cfg(feature = "postgresql")]
use super::postgres::PostgresDatabase;
use super::sqlite::SqliteDatabase;

/// Supported database types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    /// Embedded file database
    SQLite,
    /// Client/server database
    PostgreSQL,
}

/// Database instance wrapper that delegates to the appropriate implementation
#[derive(Clone)]
pub enum Database {
    /// `SQLite` backend
    SQLite(SqliteDatabase),
    /// `PostgreSQL` backend
    #[cfg(feature = "postgresql")]
    PostgreSQL(PostgresDatabase),
}

impl Database {
    /// Get a descriptive string for the current database backend
    #[must_use]
    pub const fn backend_info(&self) -> &'static str {
        match self {
            Self::SQLite(_) => "SQLite (embedded file)",
            #[cfg(feature = "postgresql")]
            Self::PostgreSQL(_) => "PostgreSQL (client/server)",
        }
    }

    /// Get the database type enum
    #[must_use]
    pub const fn database_type(&self) -> DatabaseType {
        match self {
            Self::SQLite(_) => DatabaseType::SQLite,
            #[cfg(feature = "postgresql")]
            Self::PostgreSQL(_) => DatabaseType::PostgreSQL,
        }
    }

    /// Create a new database instance based on the connection string
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Database URL format is unsupported
    /// - `PostgreSQL` feature is not enabled when a `PostgreSQL` URL is provided
    /// - Database connection fails
    pub async fn new(database_url: &str, pool_config: &PostgresPoolConfig) -> AppResult<Self> {
        let db_type = detect_database_type(database_url)?;
        debug!("Detected database type: {:?}", db_type);

        match db_type {
            DatabaseType::SQLite => {
                let db = SqliteDatabase::new(database_url, pool_config).await?;
                info!("SQLite database initialized successfully");
                Ok(Self::SQLite(db))
            }
            #[cfg(feature = "postgresql")]
            DatabaseType::PostgreSQL => {
                let db = PostgresDatabase::new(database_url, pool_config).await?;
                info!("PostgreSQL database initialized successfully");
                Ok(Self::PostgreSQL(db))
            }
            #[cfg(not(feature = "postgresql"))]
            DatabaseType::PostgreSQL => Err(DatabaseError::UnsupportedUrl {
                url: "postgresql://<redacted> (build without the 'postgresql' feature)".to_owned(),
            }
            .into()),
        }
    }

    /// Open and migrate the store described by loaded settings
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be built, the connection fails or
    /// the schema cannot be created
    pub async fn from_settings(settings: &DatabaseSettings) -> AppResult<Self> {
        let url = settings.url()?;
        info!(database = %url, "Opening {} message store", settings.backend_name());

        let db = Self::new(&url.to_connection_string(), &settings.pool_config()).await?;
        db.migrate().await?;
        Ok(db)
    }
}

/// Automatically detect database type from connection string
///
/// # Errors
///
/// Returns an error if the URL starts with neither `sqlite:` nor
/// `postgresql://`/`postgres://`
pub fn detect_database_type(database_url: &str) -> AppResult<DatabaseType> {
    if database_url.starts_with("sqlite:") {
        Ok(DatabaseType::SQLite)
    } else if database_url.starts_with("postgresql://") || database_url.starts_with("postgres://") {
        Ok(DatabaseType::PostgreSQL)
    } else {
        let scheme = database_url.split(':').next().unwrap_or_default();
        Err(DatabaseError::UnsupportedUrl {
            url: format!("{scheme}:..."),
        }
        .into())
    }
}

#[async_trait]
impl DatabaseProvider for Database {
    async fn new(database_url: &str, pool_config: &PostgresPoolConfig) -> AppResult<Self> {
        Self::new(database_url, pool_config).await
    }

    async fn migrate(&self) -> AppResult<()> {
        match self {
            Self::SQLite(db) => db.migrate().await,
            #[cfg(feature = "postgresql")]
            Self::PostgreSQL(db) => db.migrate().await,
        }
    }

    async fn store_message(&self, record: &MessageRecord) -> AppResult<i64> {
        match self {
            Self::SQLite(db) => db.store_message(record).await,
            #[cfg(feature = "postgresql")]
            Self::PostgreSQL(db) => db.store_message(record).await,
        }
    }

    async fn message_count(&self) -> AppResult<i64> {
        match self {
            Self::SQLite(db) => db.message_count().await,
            #[cfg(feature = "postgresql")]
            Self::PostgreSQL(db) => db.message_count().await,
        }
    }

    async fn recent_messages(&self, limit: u32) -> AppResult<Vec<StoredMessage>> {
        match self {
            Self::SQLite(db) => db.recent_messages(limit).await,
            #[cfg(feature = "postgresql")]
            Self::PostgreSQL(db) => db.recent_messages(limit).await,
        }
    }
}
