// ABOUTME: Chat-session abstraction between the listener and the Matrix client library
// ABOUTME: Defines the ChatSession trait and the library-neutral incoming event types
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use crate::errors::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc::Sender;

/// What kind of room message arrived
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Plain `m.text` message, the only kind that is archived
    Text {
        /// Message body
        body: String,
    },
    /// `m.emote`
    Emote,
    /// `m.notice`, usually from bots
    Notice,
    /// Image, file, audio or video
    Media,
    /// Replacement of an earlier message
    Edit,
    /// Any other msgtype
    Other(String),
}

/// A room message event, independent of the client library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingEvent {
    /// Server-assigned event id, unique per room
    pub event_id: String,
    /// Room the event arrived in
    pub room_id: String,
    /// Author
    pub sender: String,
    /// Origin server timestamp
    pub timestamp: DateTime<Utc>,
    /// Message kind and, for text, its body
    pub kind: EventKind,
}

impl IncomingEvent {
    /// Body of a qualifying text message
    #[must_use]
    pub fn text_body(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Text { body } => Some(body),
            _ => None,
        }
    }
}

/// Items the sync loop hands to the listener, in delivery order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// A room message
    Event(IncomingEvent),
    /// A sync response finished; resume from this token next time
    SyncToken(String),
}

/// One page of room history, oldest event first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePage {
    /// Room messages in timeline order
    pub events: Vec<IncomingEvent>,
    /// Token to continue from; `None` when the end of the timeline was reached
    pub end: Option<String>,
}

/// Authenticated connection to a chat server
#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Authenticate with a password
    async fn login(&self, user: &str, password: &str, device_name: &str) -> AppResult<()>;

    /// Join a room by id
    async fn join_room(&self, room_id: &str) -> AppResult<()>;

    /// Rooms the account is currently joined to
    async fn joined_rooms(&self) -> AppResult<Vec<String>>;

    /// Run the sync loop, forwarding updates until the receiver is dropped
    ///
    /// Starts from `since` when a token from an earlier run is available.
    async fn sync(
        &self,
        since: Option<String>,
        updates: Sender<SessionUpdate>,
    ) -> AppResult<()>;

    /// Page forward through a room's history starting at `from`
    async fn room_messages(&self, room_id: &str, from: &str, limit: u32)
        -> AppResult<MessagePage>;

    /// End the session on the server
    async fn logout(&self) -> AppResult<()>;
}
