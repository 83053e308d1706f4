//! Match core for Jokenpo.
//!
//! Two players, each on their own connection, play a best-of-N
//! rock-paper-scissors match. This crate holds the parts with real
//! invariants: the per-match state machine and the registry that binds a
//! connecting player to a seat.
//!
//! # Key types
//!
//! - [`Room`]: one match, with its moves, results and events
//! - [`Hub`]: room registry and join authorization
//! - [`Event`]: snapshot published after every decided round
//! - [`Subscription`]: a subscriber's end of a room's event stream
//! - [`RoomState`]: lifecycle state machine
//! - [`RoomConfig`]: the immutable parameters a room is created with
//!
//! Transport, wire encoding and room provisioning live in the crates
//! above this one.

mod config;
mod error;
mod event;
mod hub;
mod moves;
mod room;

pub use config::{RoomConfig, RoomState};
pub use error::HubError;
pub use event::Event;
pub use hub::Hub;
pub use moves::{Move, PlayerSlot, RoundResult};
pub use room::{Room, RoomInfo, Subscription};
