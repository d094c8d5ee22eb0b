// ABOUTME: Structured error types for relational store operations
// ABOUTME: Wraps sqlx failures with the operation that produced them
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use super::{AppError, ErrorCode};

/// Errors raised by the persistence adapter
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Could not open or reach the database
    #[error("Failed to connect to {backend} database")]
    ConnectionFailed {
        /// Backend name (`SQLite`, `PostgreSQL`)
        backend: &'static str,
        /// Underlying driver error
        #[source]
        source: sqlx::Error,
    },

    /// Schema creation failed
    #[error("Migration failed: {context}")]
    MigrationFailed {
        /// Statement or table being created
        context: &'static str,
        /// Underlying driver error
        #[source]
        source: sqlx::Error,
    },

    /// A query or transaction step failed
    #[error("Query failed during {operation}")]
    QueryFailed {
        /// Operation being performed (`begin`, `insert`, `commit`, ...)
        operation: &'static str,
        /// Underlying driver error
        #[source]
        source: sqlx::Error,
    },

    /// The connection URL names a backend this build cannot serve
    #[error("Unsupported database URL: {url}")]
    UnsupportedUrl {
        /// Offending URL with credentials removed
        url: String,
    },
}

impl DatabaseError {
    /// Wrap a driver error raised during `operation`
    #[must_use]
    pub const fn query(operation: &'static str, source: sqlx::Error) -> Self {
        Self::QueryFailed { operation, source }
    }

    /// Wrap a driver error raised while creating `context`
    #[must_use]
    pub const fn migration(context: &'static str, source: sqlx::Error) -> Self {
        Self::MigrationFailed { context, source }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(source: sqlx::Error) -> Self {
        Self::query("query", source)
    }
}

impl From<DatabaseError> for AppError {
    fn from(error: DatabaseError) -> Self {
        let code = match &error {
            DatabaseError::UnsupportedUrl { .. } => ErrorCode::ConfigInvalid,
            _ => ErrorCode::DatabaseError,
        };
        Self::new(code, error.to_string()).with_source(error)
    }
}
