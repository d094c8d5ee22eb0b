// ABOUTME: matrix-sdk backed ChatSession implementation
// ABOUTME: Handles password login, room joins, the sync loop and event mapping
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Matrix client session
//!
//! Runs without end-to-end encryption, so only events in unencrypted rooms
//! carry readable message bodies.

use super::session::{ChatSession, EventKind, IncomingEvent, MessagePage, SessionUpdate};
use crate::constants::matrix::SYNC_TIMEOUT_MS;
use crate::errors::{AppError, AppResult, ErrorCode};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use matrix_sdk::config::SyncSettings;
use matrix_sdk::ruma::api::client::membership::joined_rooms;
use matrix_sdk::room::MessagesOptions;
use matrix_sdk::ruma::events::room::message::{
    MessageType, OriginalSyncRoomMessageEvent, Relation, RoomMessageEventContent,
};
use matrix_sdk::ruma::events::{AnyMessageLikeEvent, AnyTimelineEvent, MessageLikeEvent};
use matrix_sdk::ruma::{EventId, MilliSecondsSinceUnixEpoch, RoomId, UInt, UserId};
use matrix_sdk::{Client, LoopCtrl, Room};
use std::error::Error as StdError;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Pause after a failed sync request before the client library tries again
const SYNC_RETRY_DELAY: Duration = Duration::from_secs(5);

/// [`ChatSession`] over a `matrix_sdk::Client`
#[derive(Clone)]
pub struct MatrixSession {
    client: Client,
}

impl MatrixSession {
    /// Build a client for `homeserver` without contacting it
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be constructed for the URL
    pub async fn connect(homeserver: &str) -> AppResult<Self> {
        let client = Client::builder()
            .homeserver_url(homeserver)
            .build()
            .await
            .map_err(|e| {
                AppError::config_invalid(format!("Cannot build client for {homeserver}: {e}"))
                    .with_source(e)
            })?;
        Ok(Self { client })
    }
}

fn homeserver_error<E>(action: &str, error: E) -> AppError
where
    E: StdError + Send + Sync + 'static,
{
    AppError::external_service("homeserver", format!("{action} failed: {error}")).with_source(error)
}

/// Map a library event into the listener's event type
#[must_use]
pub fn to_incoming(event: &OriginalSyncRoomMessageEvent, room_id: &RoomId) -> IncomingEvent {
    incoming_from_parts(
        room_id,
        &event.event_id,
        &event.sender,
        event.origin_server_ts,
        &event.content,
    )
}

/// Map a `/messages` chunk entry, keeping only unredacted room messages
fn history_to_incoming(event: AnyTimelineEvent) -> Option<IncomingEvent> {
    match event {
        AnyTimelineEvent::MessageLike(AnyMessageLikeEvent::RoomMessage(
            MessageLikeEvent::Original(event),
        )) => Some(incoming_from_parts(
            &event.room_id,
            &event.event_id,
            &event.sender,
            event.origin_server_ts,
            &event.content,
        )),
        _ => None,
    }
}

fn incoming_from_parts(
    room_id: &RoomId,
    event_id: &EventId,
    sender: &UserId,
    origin_server_ts: MilliSecondsSinceUnixEpoch,
    content: &RoomMessageEventContent,
) -> IncomingEvent {
    let timestamp = origin_server_ts
        .to_system_time()
        .map_or_else(Utc::now, DateTime::<Utc>::from);

    let kind = if matches!(content.relates_to, Some(Relation::Replacement(_))) {
        EventKind::Edit
    } else {
        match &content.msgtype {
            MessageType::Text(text) => EventKind::Text {
                body: text.body.clone(),
            },
            MessageType::Emote(_) => EventKind::Emote,
            MessageType::Notice(_) => EventKind::Notice,
            MessageType::Image(_)
            | MessageType::File(_)
            | MessageType::Audio(_)
            | MessageType::Video(_) => EventKind::Media,
            other => EventKind::Other(other.msgtype().to_owned()),
        }
    };

    IncomingEvent {
        event_id: event_id.to_string(),
        room_id: room_id.to_string(),
        sender: sender.to_string(),
        timestamp,
        kind,
    }
}

#[async_trait]
impl ChatSession for MatrixSession {
    async fn login(&self, user: &str, password: &str, device_name: &str) -> AppResult<()> {
        info!(user, "Logging in to Matrix");
        let response = self
            .client
            .matrix_auth()
            .login_username(user, password)
            .initial_device_display_name(device_name)
            .send()
            .await
            .map_err(|e| {
                let code = if e.client_api_error_kind().is_some() {
                    ErrorCode::AuthInvalid
                } else {
                    ErrorCode::ExternalServiceUnavailable
                };
                AppError::new(code, format!("Failed to log in as {user}: {e}")).with_source(e)
            })?;

        info!(
            user_id = %response.user_id,
            device_id = %response.device_id,
            "Successfully logged in"
        );
        Ok(())
    }

    async fn join_room(&self, room_id: &str) -> AppResult<()> {
        let parsed = RoomId::parse(room_id).map_err(|e| {
            AppError::config_invalid(format!("Invalid room id '{room_id}': {e}")).with_source(e)
        })?;
        self.client
            .join_room_by_id(&parsed)
            .await
            .map_err(|e| homeserver_error("join", e))?;
        Ok(())
    }

    async fn joined_rooms(&self) -> AppResult<Vec<String>> {
        let response = self
            .client
            .send(joined_rooms::v3::Request::new(), None)
            .await
            .map_err(|e| homeserver_error("joined_rooms", e))?;
        Ok(response
            .joined_rooms
            .into_iter()
            .map(|room| room.to_string())
            .collect())
    }

    async fn sync(
        &self,
        since: Option<String>,
        updates: Sender<SessionUpdate>,
    ) -> AppResult<()> {
        let events = updates.clone();
        let handle = self.client.add_event_handler(
            move |event: OriginalSyncRoomMessageEvent, room: Room| {
                let events = events.clone();
                async move {
                    // A closed channel means the listener is shutting down
                    let update = SessionUpdate::Event(to_incoming(&event, room.room_id()));
                    let _ = events.send(update).await;
                }
            },
        );

        let mut settings =
            SyncSettings::default().timeout(Duration::from_millis(SYNC_TIMEOUT_MS));
        if let Some(token) = since {
            debug!("Resuming sync from saved token");
            settings = settings.token(token);
        }

        info!("Starting sync loop for new messages");
        let result = self
            .client
            .sync_with_result_callback(settings, |response| {
                let updates = updates.clone();
                async move {
                    match response {
                        Ok(response) => {
                            if updates
                                .send(SessionUpdate::SyncToken(response.next_batch))
                                .await
                                .is_err()
                            {
                                return Ok(LoopCtrl::Break);
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Sync request failed, retrying");
                            sleep(SYNC_RETRY_DELAY).await;
                        }
                    }
                    Ok(LoopCtrl::Continue)
                }
            })
            .await;

        self.client.remove_event_handler(handle);
        result.map_err(|e| homeserver_error("sync", e))
    }

    async fn room_messages(
        &self,
        room_id: &str,
        from: &str,
        limit: u32,
    ) -> AppResult<MessagePage> {
        let parsed = RoomId::parse(room_id).map_err(|e| {
            AppError::config_invalid(format!("Invalid room id '{room_id}': {e}")).with_source(e)
        })?;
        let room = self.client.get_room(&parsed).ok_or_else(|| {
            AppError::external_service("homeserver", format!("Room {room_id} is not known yet"))
        })?;

        let mut options = MessagesOptions::forward();
        options.from = Some(from.to_owned());
        options.limit = UInt::from(limit);
        let response = room
            .messages(options)
            .await
            .map_err(|e| homeserver_error("messages", e))?;

        let mut events = Vec::with_capacity(response.chunk.len());
        for timeline_event in response.chunk {
            match timeline_event.event.deserialize() {
                Ok(event) => events.extend(history_to_incoming(event)),
                Err(e) => debug!(room_id, error = %e, "Skipping undecodable history event"),
            }
        }
        Ok(MessagePage {
            events,
            end: response.end,
        })
    }

    async fn logout(&self) -> AppResult<()> {
        self.client
            .matrix_auth()
            .logout()
            .await
            .map_err(|e| homeserver_error("logout", e))?;
        info!("Logged out of Matrix");
        Ok(())
    }
}
