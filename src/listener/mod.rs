// ABOUTME: Chat-session listener that archives room messages as they arrive
// ABOUTME: Joins configured rooms, consumes sync updates in order and persists text messages
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Listener
//!
//! Before following the live stream, each monitored room is paged forward
//! from where the previous run stopped so messages sent while the archiver
//! was down are not lost. After that one consumer drains a bounded channel
//! fed by the sync loop, so messages are stored strictly in the order the
//! homeserver delivered them. A failed insert is logged and the message
//! dropped; the loop keeps running until the shutdown future resolves, then
//! the session is logged out.
//!
//! Replays are recognised by event id. Timestamps are stored as given and
//! never used to reject an event.

/// matrix-sdk implementation of [`ChatSession`]
pub mod matrix;
/// Library-neutral session trait and event types
pub mod session;

pub use matrix::MatrixSession;
pub use session::{ChatSession, EventKind, IncomingEvent, MessagePage, SessionUpdate};

use crate::config::Settings;
use crate::constants::matrix::{BACKFILL_PAGE_SIZE, UPDATE_CHANNEL_CAPACITY};
use crate::database_plugins::DatabaseProvider;
use crate::errors::AppResult;
use crate::models::MessageRecord;
use crate::sync_state::{SyncState, SyncStateStore};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Counters reported when the listener stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Messages written to the store
    pub stored: u64,
    /// Events ignored (non-text, unmonitored room, already archived)
    pub skipped: u64,
    /// Text messages lost to a store failure
    pub failed: u64,
}

/// Archives messages from a [`ChatSession`] into a [`DatabaseProvider`]
pub struct Listener<S, D> {
    session: S,
    database: D,
    settings: Arc<Settings>,
    state_store: SyncStateStore,
    /// `None` until joined, or when every joined room is monitored
    monitored: Option<BTreeSet<String>>,
    /// Rooms caught up before the live loop, in join order
    rooms: Vec<String>,
}

impl<S, D> Listener<S, D>
where
    S: ChatSession,
    D: DatabaseProvider,
{
    /// Create a listener; nothing is contacted until [`Self::connect_and_join`]
    #[must_use]
    pub fn new(session: S, database: D, settings: Arc<Settings>) -> Self {
        let state_store = SyncStateStore::new(settings.sync_state_file.clone());
        Self {
            session,
            database,
            settings,
            state_store,
            monitored: None,
            rooms: Vec::new(),
        }
    }

    /// Chat session in use
    pub const fn session(&self) -> &S {
        &self.session
    }

    /// Store in use
    pub const fn database(&self) -> &D {
        &self.database
    }

    /// Log in, then join each configured room once in configured order
    ///
    /// With no configured rooms every already-joined room is monitored.
    /// Returns the rooms being monitored.
    ///
    /// # Errors
    ///
    /// Returns an error if login fails or a configured room id is malformed
    pub async fn connect_and_join(&mut self) -> AppResult<Vec<String>> {
        let matrix = &self.settings.matrix;
        self.session
            .login(&matrix.user, &matrix.password, &matrix.device_name)
            .await?;

        if matrix.room_ids.is_empty() {
            let rooms = self.session.joined_rooms().await.unwrap_or_else(|e| {
                warn!(error = %e, "Could not list joined rooms");
                Vec::new()
            });
            info!(rooms = rooms.len(), "No room list configured, monitoring all joined rooms");
            for room_id in &rooms {
                info!(room_id = %room_id, "Monitoring room");
            }
            self.monitored = None;
            self.rooms.clone_from(&rooms);
            return Ok(rooms);
        }

        let mut joined = BTreeSet::new();
        let mut rooms = Vec::with_capacity(matrix.room_ids.len());
        for room_id in &matrix.room_ids {
            if !joined.insert(room_id.clone()) {
                continue;
            }
            match self.session.join_room(room_id).await {
                Ok(()) => info!(room_id = %room_id, "Monitoring room"),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(room_id = %room_id, error = %e, "Failed to join room"),
            }
            rooms.push(room_id.clone());
        }
        self.monitored = Some(joined);
        self.rooms.clone_from(&rooms);
        Ok(rooms)
    }

    /// Whether events from `room_id` are archived
    #[must_use]
    pub fn is_monitored(&self, room_id: &str) -> bool {
        self.monitored
            .as_ref()
            .is_none_or(|rooms| rooms.contains(room_id))
    }

    /// Persist one event if it is a text message
    ///
    /// Returns `Ok(false)` for events that do not qualify.
    ///
    /// # Errors
    ///
    /// Returns the store error after logging it
    pub async fn on_message(&self, event: &IncomingEvent) -> AppResult<bool> {
        let Some(body) = event.text_body() else {
            debug!(room_id = %event.room_id, kind = ?event.kind, "Ignoring non-text event");
            return Ok(false);
        };

        debug!(room_id = %event.room_id, sender = %event.sender, "New message");
        let record = MessageRecord::from_text(
            &event.room_id,
            &event.sender,
            event.timestamp,
            body,
            self.settings.database.store_content(),
        );

        match self.database.store_message(&record).await {
            Ok(id) => {
                debug!(id, room_id = %record.room_id, "Archived message");
                Ok(true)
            }
            Err(e) => {
                warn!(
                    room_id = %record.room_id,
                    sender = %record.sender_id,
                    error = %e,
                    "Failed to store message, dropping it"
                );
                Err(e)
            }
        }
    }

    /// Catch up on missed history, then consume sync updates until `shutdown`
    /// resolves or the sync ends
    ///
    /// Always attempts to save the sync position and log out before returning.
    ///
    /// # Errors
    ///
    /// Returns the sync loop's error if it stopped on its own with a failure
    pub async fn run<F>(&self, shutdown: F) -> AppResult<RunSummary>
    where
        F: Future<Output = ()>,
    {
        let mut state = self.state_store.load().await;
        let mut summary = RunSummary::default();
        tokio::pin!(shutdown);

        let caught_up = tokio::select! {
            biased;
            () = &mut shutdown => false,
            () = self.backfill(&mut state, &mut summary) => true,
        };
        if !caught_up {
            info!("Shutdown requested during catch-up");
            return Ok(self.finish(&state, summary).await);
        }

        let (tx, mut rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let sync = self.session.sync(state.next_batch.clone(), tx);
        tokio::pin!(sync);
        let mut sync_result = None;

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("Shutdown requested, stopping sync");
                    break;
                }
                update = rx.recv() => match update {
                    Some(update) => self.apply(update, &mut state, &mut summary).await,
                    None => break,
                },
                result = &mut sync, if sync_result.is_none() => {
                    sync_result = Some(result);
                    while let Ok(update) = rx.try_recv() {
                        self.apply(update, &mut state, &mut summary).await;
                    }
                    break;
                }
            }
        }

        let summary = self.finish(&state, summary).await;
        match sync_result {
            Some(Err(e)) => {
                error!(error = %e, "Sync loop ended with an error");
                Err(e)
            }
            _ => Ok(summary),
        }
    }

    async fn finish(&self, state: &SyncState, summary: RunSummary) -> RunSummary {
        if let Err(e) = self.state_store.save(state).await {
            warn!(error = %e, "Failed to save sync state");
        }
        if let Err(e) = self.session.logout().await {
            warn!(error = %e, "Logout failed");
        }

        info!(
            stored = summary.stored,
            skipped = summary.skipped,
            failed = summary.failed,
            "Listener stopped"
        );
        summary
    }

    /// Page each monitored room forward from its last known position
    ///
    /// Rooms with no saved position are skipped: a first run archives only
    /// what arrives live.
    async fn backfill(&self, state: &mut SyncState, summary: &mut RunSummary) {
        for room_id in &self.rooms {
            let Some(mut from) = state.backfill_from(room_id).map(str::to_owned) else {
                debug!(room_id = %room_id, "No saved position, skipping catch-up");
                continue;
            };

            let before = summary.stored;
            loop {
                let page = match self
                    .session
                    .room_messages(room_id, &from, BACKFILL_PAGE_SIZE)
                    .await
                {
                    Ok(page) => page,
                    Err(e) => {
                        warn!(room_id = %room_id, error = %e, "Catch-up failed for room");
                        break;
                    }
                };

                let exhausted = page.events.is_empty();
                for event in &page.events {
                    self.handle_event(event, state, summary).await;
                }

                let Some(end) = page.end.filter(|end| *end != from) else {
                    break;
                };
                state.room_tokens.insert(room_id.clone(), end.clone());
                if let Err(e) = self.state_store.save(state).await {
                    warn!(error = %e, "Failed to save sync state");
                }
                if exhausted {
                    break;
                }
                from = end;
            }

            info!(
                room_id = %room_id,
                stored = summary.stored - before,
                "Caught up on room history"
            );
        }
    }

    async fn apply(&self, update: SessionUpdate, state: &mut SyncState, summary: &mut RunSummary) {
        match update {
            SessionUpdate::Event(event) => self.handle_event(&event, state, summary).await,
            SessionUpdate::SyncToken(token) => {
                state.next_batch = Some(token);
                if let Err(e) = self.state_store.save(state).await {
                    warn!(error = %e, "Failed to save sync state");
                }
            }
        }
    }

    async fn handle_event(
        &self,
        event: &IncomingEvent,
        state: &mut SyncState,
        summary: &mut RunSummary,
    ) {
        if !self.is_monitored(&event.room_id) {
            debug!(room_id = %event.room_id, "Ignoring event from unmonitored room");
            summary.skipped += 1;
            return;
        }

        if state.has_seen(&event.room_id, &event.event_id) {
            debug!(
                room_id = %event.room_id,
                event_id = %event.event_id,
                "Ignoring already archived event"
            );
            summary.skipped += 1;
            return;
        }

        match self.on_message(event).await {
            Ok(true) => {
                summary.stored += 1;
                state.record_event(&event.room_id, &event.event_id);
            }
            Ok(false) => summary.skipped += 1,
            Err(_) => summary.failed += 1,
        }
    }
}
