//! Codec trait and the JSON implementation used on the wire.
//!
//! The server's framing convention is "one JSON object, then a blank
//! line". The codec owns the JSON half of that: it turns a value into the
//! bytes of one complete frame (terminator included) and turns a frame
//! handed over by the [`Deframer`](crate::Deframer) back into a value.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Bytes appended after every outbound payload.
pub const FRAME_TERMINATOR: &[u8] = b"\n\n";

/// A codec that can encode values into frames and decode frames back.
///
/// `Send + Sync + 'static` because the client keeps one codec for its
/// whole lifetime and uses it from the dispatch-queue task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into one complete, terminated frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode_frame<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes a frame back into a value.
    ///
    /// Trailing terminator bytes are tolerated.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        frame: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use neohab_protocol::{Codec, Command, JsonCodec};
///
/// let codec = JsonCodec;
/// let cmd = Command::new("SPEAK").with("to", "ME").with("text", "hi");
///
/// let frame = codec.encode_frame(&cmd).unwrap();
/// assert!(frame.ends_with(b"}\n\n"));
///
/// let decoded: Command = codec.decode(&frame).unwrap();
/// assert_eq!(decoded, cmd);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode_frame<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        let mut bytes =
            serde_json::to_vec(value).map_err(ProtocolError::Encode)?;
        bytes.extend_from_slice(FRAME_TERMINATOR);
        Ok(bytes)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        frame: &[u8],
    ) -> Result<T, ProtocolError> {
        // serde_json skips trailing whitespace, so the "\n\n" the deframer
        // leaves on a completed frame is harmless.
        serde_json::from_slice(frame).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_encode_frame_appends_blank_line() {
        let frame = JsonCodec.encode_frame(&json!({"op": "WALK"})).unwrap();
        assert_eq!(frame, b"{\"op\":\"WALK\"}\n\n");
    }

    #[test]
    fn test_decode_tolerates_terminator() {
        let value: Value = JsonCodec.decode(b"{\"a\":1}\n\n").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_decode_truncated_frame_fails() {
        let result: Result<Value, _> = JsonCodec.decode(b"{\"a\":");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
