//! Room construction parameters and the match state machine.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Everything that is fixed about a room at creation time.
///
/// The provisioning layer fills this in (including the freshly generated
/// join codes) and hands it to [`Room::new`](crate::Room::new). None of
/// these fields change for the lifetime of the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    /// Unique room identifier, the key in the [`Hub`](crate::Hub).
    pub id: String,

    /// Display name shown to the players.
    pub name: String,

    /// Identity of the player in slot 1.
    pub player1: String,

    /// Identity of the player in slot 2.
    pub player2: String,

    /// Secret code player 1 must present to join.
    pub player1_join_code: String,

    /// Secret code player 2 must present to join.
    pub player2_join_code: String,

    /// Number of decisive rounds to play.
    pub rounds: NonZeroUsize,

    /// Caller-supplied reference (a tournament match id, say), echoed back
    /// in room info and webhook deliveries.
    pub external_id: Option<String>,
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a match.
///
/// Transitions only move forward:
///
/// ```text
/// WaitingForPlayers → Running → Finished
/// ```
///
/// - **WaitingForPlayers**: the room is published but play has not begun.
///   Moves are ignored.
/// - **Running**: moves are accepted and rounds resolve.
/// - **Finished**: every round has been decided. Terminal.
///
/// The derived ordering follows the lifecycle, so "state never decreases"
/// can be checked with `<=`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RoomState {
    WaitingForPlayers,
    Running,
    Finished,
}

impl RoomState {
    /// Returns `true` while moves are being accepted.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns `true` once the match is over.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Returns the state that follows this one, or `None` for the
    /// terminal state.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::WaitingForPlayers => Some(Self::Running),
            Self::Running => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Returns `true` if `target` directly follows this state.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WaitingForPlayers => write!(f, "WaitingForPlayers"),
            Self::Running => write!(f, "Running"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}
