// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides in-memory databases, test settings and a scripted chat session
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `matrix_archiver`

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use matrix_archiver::config::{
    DatabaseSettings, LogSettings, MatrixSettings, PostgresPoolConfig, Settings, SqliteSettings,
};
use matrix_archiver::database_plugins::factory::Database;
use matrix_archiver::database_plugins::DatabaseProvider;
use matrix_archiver::errors::{AppError, AppResult};
use matrix_archiver::listener::{
    ChatSession, EventKind, IncomingEvent, MessagePage, SessionUpdate,
};
use matrix_archiver::models::{MessageRecord, StoredMessage};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tokio::sync::mpsc::Sender;

static INIT_LOGGER: Once = Once::new();

/// Source of distinct event ids for generated events
static NEXT_EVENT: AtomicUsize = AtomicUsize::new(0);

fn next_event_id() -> String {
    format!("$event{}:example.org", NEXT_EVENT.fetch_add(1, Ordering::SeqCst))
}

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Migrated in-memory `SQLite` store
pub async fn create_test_database() -> Database {
    init_test_logging();
    let database = Database::new("sqlite::memory:", &PostgresPoolConfig::default())
        .await
        .expect("in-memory database");
    database.migrate().await.expect("migrate");
    database
}

/// Fixed timestamp used across tests
pub fn sample_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// `SQLite` settings with the sync state file inside `dir`
pub fn test_settings(dir: &Path, room_ids: &[&str], store_content: bool) -> Settings {
    Settings {
        matrix: MatrixSettings {
            homeserver: "https://matrix.example.org".into(),
            user: "@archiver:example.org".into(),
            password: "secret".into(),
            room_ids: room_ids.iter().map(|r| (*r).to_owned()).collect(),
            device_name: "matrix-archiver".into(),
        },
        database: DatabaseSettings::SQLite(SqliteSettings {
            path: ":memory:".into(),
            store_content,
        }),
        sync_state_file: dir.join("sync_state.json"),
        logging: LogSettings {
            file_path: dir.join("logs").join("archiver.log"),
            ..LogSettings::default()
        },
    }
}

/// Text message event with a fresh event id
pub fn text_event(room_id: &str, sender: &str, timestamp: DateTime<Utc>, body: &str) -> IncomingEvent {
    IncomingEvent {
        event_id: next_event_id(),
        room_id: room_id.into(),
        sender: sender.into(),
        timestamp,
        kind: EventKind::Text { body: body.into() },
    }
}

/// Non-text event of the given kind
pub fn other_event(room_id: &str, kind: EventKind) -> IncomingEvent {
    IncomingEvent {
        event_id: next_event_id(),
        room_id: room_id.into(),
        sender: "@bob:x".into(),
        timestamp: sample_time(),
        kind,
    }
}

/// Calls observed by [`ScriptedSession`]
#[derive(Debug, Default)]
pub struct SessionLog {
    pub logins: Vec<String>,
    pub joins: Vec<String>,
    pub sync_since: Vec<Option<String>>,
    /// `(room_id, from)` of every history request
    pub history_requests: Vec<(String, String)>,
    pub logouts: usize,
}

/// In-process chat session replaying a fixed list of updates
#[derive(Clone, Default)]
pub struct ScriptedSession {
    pub log: Arc<Mutex<SessionLog>>,
    pub updates: Vec<SessionUpdate>,
    pub joined: Vec<String>,
    /// History pages per room, served in order; an empty page once exhausted
    pub history: BTreeMap<String, Vec<MessagePage>>,
    /// Keep the sync running after the script until the listener shuts down
    pub hold_open: bool,
    pub reject_login: bool,
}

impl ScriptedSession {
    pub fn with_updates(updates: Vec<SessionUpdate>) -> Self {
        Self {
            updates,
            ..Self::default()
        }
    }

    pub fn with_events(events: Vec<IncomingEvent>) -> Self {
        Self::with_updates(events.into_iter().map(SessionUpdate::Event).collect())
    }
}

#[async_trait]
impl ChatSession for ScriptedSession {
    async fn login(&self, user: &str, _password: &str, _device_name: &str) -> AppResult<()> {
        if self.reject_login {
            return Err(AppError::auth_invalid("M_FORBIDDEN: Invalid password"));
        }
        self.log.lock().unwrap().logins.push(user.to_owned());
        Ok(())
    }

    async fn join_room(&self, room_id: &str) -> AppResult<()> {
        self.log.lock().unwrap().joins.push(room_id.to_owned());
        Ok(())
    }

    async fn joined_rooms(&self) -> AppResult<Vec<String>> {
        Ok(self.joined.clone())
    }

    async fn sync(
        &self,
        since: Option<String>,
        updates: Sender<SessionUpdate>,
    ) -> AppResult<()> {
        self.log.lock().unwrap().sync_since.push(since);
        for update in &self.updates {
            if updates.send(update.clone()).await.is_err() {
                return Ok(());
            }
        }
        if self.hold_open {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn room_messages(
        &self,
        room_id: &str,
        from: &str,
        _limit: u32,
    ) -> AppResult<MessagePage> {
        let mut log = self.log.lock().unwrap();
        let served = log
            .history_requests
            .iter()
            .filter(|(room, _)| room == room_id)
            .count();
        log.history_requests
            .push((room_id.to_owned(), from.to_owned()));
        Ok(self
            .history
            .get(room_id)
            .and_then(|pages| pages.get(served))
            .cloned()
            .unwrap_or_default())
    }

    async fn logout(&self) -> AppResult<()> {
        self.log.lock().unwrap().logouts += 1;
        Ok(())
    }
}

/// Store wrapper failing selected inserts (0-based call numbers)
#[derive(Clone)]
pub struct FlakyDatabase {
    pub inner: Database,
    pub fail_calls: Vec<usize>,
    calls: Arc<AtomicUsize>,
}

impl FlakyDatabase {
    pub async fn failing_on(fail_calls: Vec<usize>) -> Self {
        Self {
            inner: create_test_database().await,
            fail_calls,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl DatabaseProvider for FlakyDatabase {
    async fn new(database_url: &str, pool_config: &PostgresPoolConfig) -> AppResult<Self> {
        Ok(Self {
            inner: Database::new(database_url, pool_config).await?,
            fail_calls: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        })
    }

    async fn migrate(&self) -> AppResult<()> {
        self.inner.migrate().await
    }

    async fn store_message(&self, record: &MessageRecord) -> AppResult<i64> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_calls.contains(&call) {
            return Err(AppError::database("connection reset by peer"));
        }
        self.inner.store_message(record).await
    }

    async fn message_count(&self) -> AppResult<i64> {
        self.inner.message_count().await
    }

    async fn recent_messages(&self, limit: u32) -> AppResult<Vec<StoredMessage>> {
        self.inner.recent_messages(limit).await
    }
}
