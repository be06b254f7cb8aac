//! Unified error type for the neohab client.

use neohab_protocol::ProtocolError;
use neohab_queue::QueueError;
use neohab_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Every queued operation resolves to `Result<(), ClientError>`, so one
/// type covers a failed write, a dropped session, and a corporation attempt
/// that ran out of polls. `#[from]` lets `?` lift sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A transport-level error (connect, send).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The dispatch queue went away before the operation finished.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The client was built without enough information to connect.
    #[error("configuration error: {0}")]
    Config(String),

    /// A command reached the front of the queue while the session was down.
    #[error("not connected")]
    NotConnected,

    /// The ghost never showed up within the poll budget.
    #[error("corporation failed: no ghost after {attempts} polls")]
    CorporationFailed {
        /// Polls made before giving up.
        attempts: u32,
    },
}
