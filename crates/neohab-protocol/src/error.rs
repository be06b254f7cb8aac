//! Error types for the protocol layer.
//!
//! Each crate in neohab defines its own error enum. When you see a
//! `ProtocolError`, the problem is in framing or (de)serialization, not in
//! networking or world bookkeeping.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a command into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning a frame into a message).
    ///
    /// Common causes: a truncated frame handed over by the deframer's
    /// end-of-stream fallback, or a server bug.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded but doesn't have the shape its `op` promises,
    /// e.g. a `make` without an `obj`, or a top-level JSON array.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Reading the byte stream under the deframer failed.
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}
