// ABOUTME: SQLite backend for the message archive
// ABOUTME: File-backed store created on first use, with in-memory mode for tests
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! `SQLite` database implementation

use super::shared::schema::{index_statements, INSERT_COLUMNS, SELECT_COLUMNS};
use super::shared::transactions::SqliteTransactionGuard;
use super::DatabaseProvider;
use crate::config::PostgresPoolConfig;
use crate::constants::schema::MESSAGES_TABLE;
use crate::errors::{AppResult, DatabaseError};
use crate::models::{MessageRecord, StoredMessage};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::fs;
use std::str::FromStr;
use tracing::{debug, info, warn};

const BACKEND: &str = "SQLite";

/// `SQLite` database implementation
#[derive(Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Get a reference to the connection pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn connect_error(source: sqlx::Error) -> DatabaseError {
        DatabaseError::ConnectionFailed {
            backend: BACKEND,
            source,
        }
    }

    fn row_to_message(row: &SqliteRow) -> Result<StoredMessage, sqlx::Error> {
        let created_at: NaiveDateTime = row.try_get("created_at")?;
        Ok(StoredMessage {
            id: row.try_get("id")?,
            record: MessageRecord {
                timestamp: row.try_get::<DateTime<Utc>, _>("timestamp")?,
                room_id: row.try_get("room_id")?,
                sender_id: row.try_get("sender")?,
                content: row.try_get("content")?,
                message_type: row.try_get("message_type")?,
                content_length: row.try_get("content_length")?,
            },
            created_at: created_at.and_utc(),
        })
    }
}

#[async_trait]
impl DatabaseProvider for SqliteDatabase {
    async fn new(database_url: &str, pool_config: &PostgresPoolConfig) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(Self::connect_error)?
            .create_if_missing(true);

        let in_memory = database_url.ends_with(":memory:");
        let pool_options = if in_memory {
            // Every connection to :memory: is a separate database, so pin one
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            if let Some(parent) = options
                .get_filename()
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
            {
                if let Err(e) = fs::create_dir_all(parent) {
                    warn!(path = %parent.display(), error = %e, "Failed to create database directory");
                }
            }
            SqlitePoolOptions::new().max_connections(pool_config.max_connections)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(Self::connect_error)?;

        info!(url = %database_url, in_memory, "SQLite database connected");
        Ok(Self { pool })
    }

    async fn migrate(&self) -> AppResult<()> {
        sqlx::query(&format!(
            r"
            CREATE TABLE IF NOT EXISTS {MESSAGES_TABLE} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                room_id TEXT NOT NULL,
                sender TEXT NOT NULL,
                message_type TEXT NOT NULL,
                content TEXT,
                content_length INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::migration("matrix_messages table", e))?;

        for statement in index_statements() {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::migration("matrix_messages index", e))?;
        }

        debug!("SQLite schema ready");
        Ok(())
    }

    async fn store_message(&self, record: &MessageRecord) -> AppResult<i64> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::query("begin", e))?;
        let mut guard = SqliteTransactionGuard::new(tx);

        let result = sqlx::query(&format!(
            "INSERT INTO {MESSAGES_TABLE} ({INSERT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"
        ))
        .bind(&record.room_id)
        .bind(&record.sender_id)
        .bind(&record.message_type)
        .bind(record.content.as_deref())
        .bind(record.content_length)
        .bind(record.timestamp)
        .execute(guard.executor()?)
        .await
        .map_err(|e| DatabaseError::query("insert", e))?;

        guard.commit().await?;

        let id = result.last_insert_rowid();
        debug!(id, room_id = %record.room_id, "Stored message in SQLite");
        Ok(id)
    }

    async fn message_count(&self) -> AppResult<i64> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS count FROM {MESSAGES_TABLE}"))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("count", e))?;
        row.try_get::<i64, _>("count")
            .map_err(|e| DatabaseError::query("count", e).into())
    }

    async fn recent_messages(&self, limit: u32) -> AppResult<Vec<StoredMessage>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM {MESSAGES_TABLE} ORDER BY timestamp DESC, id DESC LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::query("select recent", e))?;

        rows.iter()
            .map(|row| {
                Self::row_to_message(row).map_err(|e| DatabaseError::query("decode", e).into())
            })
            .collect()
    }
}
