// ABOUTME: Message record types for database persistence
// ABOUTME: Builds rows from text events and applies the content-storage toggle
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use crate::constants::matrix::MSGTYPE_TEXT;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message row about to be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// When the homeserver received the message
    pub timestamp: DateTime<Utc>,
    /// Room the message arrived in
    pub room_id: String,
    /// Author of the message
    pub sender_id: String,
    /// Message text; `None` when content storage is disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Matrix msgtype of the event
    pub message_type: String,
    /// Length of the original body in characters
    pub content_length: i64,
}

impl MessageRecord {
    /// Build a record for an `m.text` message
    ///
    /// The body only survives into the record when `store_content` is set;
    /// its length is always kept.
    #[must_use]
    pub fn from_text(
        room_id: impl Into<String>,
        sender_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        body: &str,
        store_content: bool,
    ) -> Self {
        let content_length = i64::try_from(body.chars().count()).unwrap_or(i64::MAX);
        Self {
            timestamp,
            room_id: room_id.into(),
            sender_id: sender_id.into(),
            content: store_content.then(|| body.to_owned()),
            message_type: MSGTYPE_TEXT.to_owned(),
            content_length,
        }
    }
}

/// A message row read back from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Row id assigned by the database
    pub id: i64,
    /// The persisted fields
    #[serde(flatten)]
    pub record: MessageRecord,
    /// When the row was written
    pub created_at: DateTime<Utc>,
}
