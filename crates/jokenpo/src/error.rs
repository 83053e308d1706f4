//! Unified error type for the Jokenpo server.

use jokenpo_protocol::ProtocolError;
use jokenpo_room::HubError;
use jokenpo_transport::TransportError;

use crate::provision::ProvisionError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` attributes let `?` convert sub-crate errors directly.
#[derive(Debug, thiserror::Error)]
pub enum JokenpoError {
    /// Connection, send or receive failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A join was refused.
    #[error(transparent)]
    Hub(#[from] HubError),

    /// Creating, reading or deleting a room failed.
    #[error(transparent)]
    Provision(#[from] ProvisionError),
}
