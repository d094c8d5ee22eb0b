// ABOUTME: Durable sync position so a restart resumes where the last run stopped
// ABOUTME: Stores the next_batch token, per-room catch-up tokens and recent event ids as JSON
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Sync-state persistence
//!
//! The file is advisory. A missing or unreadable file only means the next run
//! starts from a fresh sync; it never stops the archiver.
//!
//! Replays are detected by event id, never by timestamp: origin timestamps
//! are not monotonic across federated servers.

use crate::constants::matrix::RECENT_EVENT_IDS_PER_ROOM;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Resume position for the sync loop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Token returned by the last completed sync
    #[serde(default)]
    pub next_batch: Option<String>,
    /// Forward pagination token per room, where the last catch-up stopped
    #[serde(default)]
    pub room_tokens: BTreeMap<String, String>,
    /// Most recently archived event ids per room, oldest first
    #[serde(default)]
    pub recent_event_ids: BTreeMap<String, VecDeque<String>>,
}

impl SyncState {
    /// Remember an archived event id, evicting the oldest past the window
    ///
    /// Returns `false` if the id was already remembered.
    pub fn record_event(&mut self, room_id: &str, event_id: &str) -> bool {
        let ids = self.recent_event_ids.entry(room_id.to_owned()).or_default();
        if ids.iter().any(|id| id == event_id) {
            return false;
        }
        ids.push_back(event_id.to_owned());
        while ids.len() > RECENT_EVENT_IDS_PER_ROOM {
            ids.pop_front();
        }
        true
    }

    /// Whether this event was already archived
    #[must_use]
    pub fn has_seen(&self, room_id: &str, event_id: &str) -> bool {
        self.recent_event_ids
            .get(room_id)
            .is_some_and(|ids| ids.iter().any(|id| id == event_id))
    }

    /// Token to start a room's catch-up from
    ///
    /// Falls back to the global sync token when the room was never paged.
    #[must_use]
    pub fn backfill_from(&self, room_id: &str) -> Option<&str> {
        self.room_tokens
            .get(room_id)
            .or(self.next_batch.as_ref())
            .map(String::as_str)
    }
}

/// JSON file holding a [`SyncState`]
#[derive(Debug, Clone)]
pub struct SyncStateStore {
    path: PathBuf,
}

impl SyncStateStore {
    /// Store backed by `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File location
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved state, falling back to an empty one
    pub async fn load(&self) -> SyncState {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No sync state file, starting fresh");
                return SyncState::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cannot read sync state, starting fresh");
                return SyncState::default();
            }
        };

        match serde_json::from_str::<SyncState>(&raw) {
            Ok(state) => {
                info!(
                    path = %self.path.display(),
                    rooms = state.recent_event_ids.len(),
                    has_token = state.next_batch.is_some(),
                    "Loaded sync state"
                );
                state
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt sync state file, starting fresh");
                SyncState::default()
            }
        }
    }

    /// Write the state through a temporary file and rename it into place
    ///
    /// # Errors
    ///
    /// Returns a storage error if the directory, temp file or rename fails
    pub async fn save(&self, state: &SyncState) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(state)?;
        let tmp = self.temp_path();
        fs::write(&tmp, json).await.map_err(|e| {
            AppError::storage(format!("Cannot write {}: {e}", tmp.display())).with_source(e)
        })?;
        fs::rename(&tmp, &self.path).await.map_err(|e| {
            AppError::storage(format!(
                "Cannot replace {}: {e}",
                self.path.display()
            ))
            .with_source(e)
        })?;

        debug!(path = %self.path.display(), "Saved sync state");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(ToOwned::to_owned)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
