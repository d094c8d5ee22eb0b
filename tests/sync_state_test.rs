// ABOUTME: Integration tests for the sync-state file
// ABOUTME: Missing and corrupt files fall back to a fresh state; saves replace atomically
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use matrix_archiver::sync_state::{SyncState, SyncStateStore};
use tempfile::TempDir;

#[tokio::test]
async fn test_missing_file_loads_default() {
    let dir = TempDir::new().unwrap();
    let store = SyncStateStore::new(dir.path().join("absent.json"));

    assert_eq!(store.load().await, SyncState::default());
}

#[tokio::test]
async fn test_corrupt_file_loads_default() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sync_state.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = SyncStateStore::new(&path);
    assert_eq!(store.load().await, SyncState::default());
}

#[tokio::test]
async fn test_save_then_load_restores_token_and_rooms() {
    let dir = TempDir::new().unwrap();
    let store = SyncStateStore::new(dir.path().join("state").join("sync_state.json"));

    let mut state = SyncState {
        next_batch: Some("s72594_4483_1934".into()),
        ..SyncState::default()
    };
    state.record_event("!a:x", "$first:example.org");
    state.record_event("!b:x", "$second:example.org");
    state
        .room_tokens
        .insert("!a:x".into(), "t47409-4357353_219380_26003_2265".into());

    store.save(&state).await.unwrap();
    assert!(store.path().exists());
    assert!(!dir.path().join("state").join("sync_state.json.tmp").exists());

    assert_eq!(store.load().await, state);
}

#[tokio::test]
async fn test_save_overwrites_previous_state() {
    let dir = TempDir::new().unwrap();
    let store = SyncStateStore::new(dir.path().join("sync_state.json"));

    let first = SyncState {
        next_batch: Some("first".into()),
        ..SyncState::default()
    };
    store.save(&first).await.unwrap();

    let second = SyncState {
        next_batch: Some("second".into()),
        ..SyncState::default()
    };
    store.save(&second).await.unwrap();

    assert_eq!(store.load().await.next_batch.as_deref(), Some("second"));
}

#[tokio::test]
async fn test_partial_file_fills_missing_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sync_state.json");
    std::fs::write(&path, r#"{"next_batch":"tok","last_event_ts":{"!a:x":1}}"#).unwrap();

    let state = SyncStateStore::new(&path).load().await;
    assert_eq!(state.next_batch.as_deref(), Some("tok"));
    assert!(state.recent_event_ids.is_empty());
    assert!(state.room_tokens.is_empty());
}
