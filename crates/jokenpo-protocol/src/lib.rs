//! Wire protocol for Jokenpo.
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`]): what travels on
//!   the wire
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how it becomes bytes
//! - **Errors** ([`ProtocolError`])
//!
//! The protocol sits between the transport (raw frames) and the server's
//! connection handler. It knows the shape of messages, not what they do.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage / ServerMessage) → Handler → Hub / Room
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientMessage, ServerMessage, WebhookConfig, code};
