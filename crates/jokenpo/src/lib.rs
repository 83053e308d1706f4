//! # Jokenpo
//!
//! A rock-paper-scissors match server.
//!
//! Two players, each on their own WebSocket connection, join a room with
//! the code they were given when the room was provisioned and play a
//! best-of-N match. The server owns the rules: it decides every round,
//! keeps the score and pushes each result to both players.
//!
//! ## Layers
//!
//! - [`jokenpo_room`]: the match state machine and the room registry
//! - [`jokenpo_protocol`]: the JSON messages on the wire
//! - [`jokenpo_transport`]: the WebSocket listener
//! - this crate: configuration, provisioning, event webhooks, the lobby
//!   that starts matches, and the per-connection handler
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jokenpo::prelude::*;
//!
//! # async fn run() -> Result<(), JokenpoError> {
//! let server = JokenpoServer::builder()
//!     .bind("0.0.0.0:8081")
//!     .admin_token("change-me")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod lobby;
mod provision;
mod server;
mod webhook;

pub use config::ServerConfig;
pub use error::JokenpoError;
pub use provision::{CreateRoom, CreatedRoom, MAX_ROUNDS, ProvisionError, RoomProvisioner};
pub use server::{JokenpoServer, JokenpoServerBuilder};

pub use jokenpo_protocol;
pub use jokenpo_room;
pub use jokenpo_transport;

/// Everything needed to run a server and talk to it.
pub mod prelude {
    pub use crate::{
        CreateRoom, JokenpoError, JokenpoServer, JokenpoServerBuilder, ProvisionError,
        ServerConfig,
    };
    pub use jokenpo_protocol::{
        ClientMessage, Codec, JsonCodec, ServerMessage, WebhookConfig, code,
    };
    pub use jokenpo_room::{Event, Hub, Move, PlayerSlot, Room, RoomInfo, RoomState};
}
