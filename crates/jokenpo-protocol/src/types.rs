//! Messages exchanged between a client and the server.
//!
//! Every frame is one JSON object in the "adjacently tagged" shape:
//!
//! ```text
//! { "type": "join", "data": { "room_id": "...", "player_id": "...", "join_code": "..." } }
//! ```
//!
//! `type` is the snake_case variant name and `data` holds its fields.
//! Clients can dispatch on `type` without knowing every payload.

use std::collections::HashMap;

use jokenpo_room::{Event, Move, PlayerSlot, RoomInfo};
use serde::{Deserialize, Serialize};

/// Error codes carried by [`ServerMessage::Error`], HTTP style.
pub mod code {
    /// Malformed frame, unknown message, or a message out of sequence.
    pub const BAD_REQUEST: u16 = 400;
    /// Wrong join code or admin token.
    pub const UNAUTHORIZED: u16 = 401;
    /// Admin messages are disabled on this server.
    pub const FORBIDDEN: u16 = 403;
    /// No such room.
    pub const NOT_FOUND: u16 = 404;
    /// The request clashes with current state (seat taken, id in use).
    pub const CONFLICT: u16 = 409;
    /// Provisioning parameters were rejected.
    pub const UNPROCESSABLE: u16 = 422;
}

/// Where a room's round events are POSTed as they happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    /// Extra request headers, typically for authentication.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Everything a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Take a seat in a room. Must come before any `move`.
    Join {
        room_id: String,
        player_id: String,
        join_code: String,
    },

    /// Show a hand in the current round of the joined room.
    Move {
        #[serde(rename = "move")]
        hand: Move,
    },

    /// Keep-alive. Answered with [`ServerMessage::HeartbeatAck`].
    Heartbeat { client_time: u64 },

    /// Provision a new room. Requires the server's admin token.
    CreateRoom {
        admin_token: String,
        /// Room id to use. Generated when absent.
        #[serde(default)]
        id: Option<String>,
        name: String,
        player1: String,
        player2: String,
        rounds: u32,
        /// Caller's own reference for the room, echoed in room info and
        /// webhook deliveries.
        #[serde(default)]
        external_id: Option<String>,
        #[serde(default)]
        events_webhook: Option<WebhookConfig>,
    },

    /// Look a room up. Requires the admin token.
    GetRoom {
        admin_token: String,
        room_id: String,
    },

    /// Remove a room from the server. Requires the admin token.
    DeleteRoom {
        admin_token: String,
        room_id: String,
    },
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Everything the server may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The join was accepted. `room` is the state at the time of joining.
    Joined { slot: PlayerSlot, room: RoomInfo },

    /// Both seats are connected and the match is running.
    MatchStarted { room_id: String },

    /// A round was decided. Sent to every seat of the room.
    RoundResolved(Event),

    /// Reply to [`ClientMessage::Heartbeat`].
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// A room was provisioned. The join codes go to the two players.
    RoomCreated {
        room_id: String,
        player1_join_code: String,
        player2_join_code: String,
    },

    /// Reply to [`ClientMessage::GetRoom`].
    RoomInfo(RoomInfo),

    /// Reply to [`ClientMessage::DeleteRoom`].
    RoomDeleted { room_id: String },

    /// The last request failed. See [`code`] for the meaning of `code`.
    Error { code: u16, message: String },
}

impl ServerMessage {
    /// Shorthand for an [`Error`](Self::Error) message.
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}
