// ABOUTME: Persistence abstraction for archived Matrix messages
// ABOUTME: Plugin architecture with SQLite and PostgreSQL backends behind one trait
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use crate::config::PostgresPoolConfig;
use crate::errors::AppResult;
use crate::models::{MessageRecord, StoredMessage};
use async_trait::async_trait;

/// Backend selection from connection URLs
pub mod factory;
/// Helpers shared by both backends
pub mod shared;
/// `SQLite` backend
pub mod sqlite;

/// `PostgreSQL` backend
#[cfg(feature = "postgresql")]
pub mod postgres;

/// Core persistence trait
///
/// Rows are append-only: there is no update or delete path.
#[async_trait]
pub trait DatabaseProvider: Send + Sync + Clone {
    /// Open a connection pool for `database_url`
    async fn new(database_url: &str, pool_config: &PostgresPoolConfig) -> AppResult<Self>
    where
        Self: Sized;

    /// Create the message table and its indexes if they do not exist
    async fn migrate(&self) -> AppResult<()>;

    /// Insert one message inside its own transaction, returning the row id
    async fn store_message(&self, record: &MessageRecord) -> AppResult<i64>;

    /// Total number of stored messages
    async fn message_count(&self) -> AppResult<i64>;

    /// Most recent rows by message timestamp, newest first
    async fn recent_messages(&self, limit: u32) -> AppResult<Vec<StoredMessage>>;
}
