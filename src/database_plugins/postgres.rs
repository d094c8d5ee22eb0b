// ABOUTME: PostgreSQL backend for the message archive
// ABOUTME: Pooled client/server store using TIMESTAMPTZ columns and RETURNING ids
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! `PostgreSQL` database implementation
//!
//! Implements the same interface as the `SQLite` version.

use super::shared::schema::{index_statements, INSERT_COLUMNS, SELECT_COLUMNS};
use super::shared::transactions::PostgresTransactionGuard;
use super::DatabaseProvider;
use crate::config::PostgresPoolConfig;
use crate::constants::schema::MESSAGES_TABLE;
use crate::errors::{AppResult, DatabaseError};
use crate::models::{MessageRecord, StoredMessage};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{debug, info};

/// `PostgreSQL` database implementation
#[derive(Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    /// Get a reference to the connection pool
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_message(row: &PgRow) -> Result<StoredMessage, sqlx::Error> {
        Ok(StoredMessage {
            id: row.try_get("id")?,
            record: MessageRecord {
                timestamp: row.try_get("timestamp")?,
                room_id: row.try_get("room_id")?,
                sender_id: row.try_get("sender")?,
                content: row.try_get("content")?,
                message_type: row.try_get("message_type")?,
                content_length: row.try_get("content_length")?,
            },
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl DatabaseProvider for PostgresDatabase {
    async fn new(database_url: &str, pool_config: &PostgresPoolConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_config.max_connections)
            .connect(database_url)
            .await
            .map_err(|source| DatabaseError::ConnectionFailed {
                backend: "PostgreSQL",
                source,
            })?;

        info!(
            max_connections = pool_config.max_connections,
            "PostgreSQL database connected"
        );
        Ok(Self { pool })
    }

    async fn migrate(&self) -> AppResult<()> {
        sqlx::query(&format!(
            r"
            CREATE TABLE IF NOT EXISTS {MESSAGES_TABLE} (
                id BIGSERIAL PRIMARY KEY,
                room_id TEXT NOT NULL,
                sender TEXT NOT NULL,
                message_type TEXT NOT NULL,
                content TEXT,
                content_length BIGINT NOT NULL,
                timestamp TIMESTAMPTZ NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
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

        debug!("PostgreSQL schema ready");
        Ok(())
    }

    async fn store_message(&self, record: &MessageRecord) -> AppResult<i64> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::query("begin", e))?;
        let mut guard = PostgresTransactionGuard::new(tx);

        let row = sqlx::query(&format!(
            "INSERT INTO {MESSAGES_TABLE} ({INSERT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING id"
        ))
        .bind(&record.room_id)
        .bind(&record.sender_id)
        .bind(&record.message_type)
        .bind(record.content.as_deref())
        .bind(record.content_length)
        .bind(record.timestamp)
        .fetch_one(guard.executor()?)
        .await
        .map_err(|e| DatabaseError::query("insert", e))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| DatabaseError::query("insert", e))?;

        guard.commit().await?;

        debug!(id, room_id = %record.room_id, "Stored message in PostgreSQL");
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
            "SELECT {SELECT_COLUMNS} FROM {MESSAGES_TABLE} ORDER BY timestamp DESC, id DESC LIMIT $1"
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
