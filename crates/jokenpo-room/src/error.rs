//! Error types for the room layer.

/// Reasons a join can be refused by the [`Hub`](crate::Hub).
///
/// Everything else a caller can do wrong against a room (moving out of
/// turn, moving twice, moving after the end) is silently ignored instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// No room is registered under this id.
    #[error("room {0} not found")]
    NoRoom(String),

    /// The player id and join code match neither seat of the room.
    #[error("invalid join code")]
    InvalidJoinCode,
}
