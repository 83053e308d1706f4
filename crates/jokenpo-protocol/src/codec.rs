//! Codec trait and the JSON implementation.
//!
//! The server only needs something that turns messages into bytes and
//! back. [`JsonCodec`] is the one shipped today; clients in the browser
//! read it directly.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` so one codec can be shared by every
/// connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes `value`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes a `T` from `data`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] for malformed or mismatched input.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`. Behind the default `json` feature.
///
/// ```rust
/// use jokenpo_protocol::{ClientMessage, Codec, JsonCodec};
/// use jokenpo_room::Move;
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&ClientMessage::Move { hand: Move::Rock }).unwrap();
/// assert_eq!(bytes, br#"{"type":"move","data":{"move":"Rock"}}"#);
///
/// let decoded: ClientMessage = codec.decode(&bytes).unwrap();
/// assert_eq!(decoded, ClientMessage::Move { hand: Move::Rock });
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        if data.is_empty() {
            return Err(ProtocolError::InvalidMessage("empty frame".into()));
        }
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
