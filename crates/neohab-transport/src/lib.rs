//! Transport layer for neohab.
//!
//! The world server speaks over a plain TCP stream. This crate opens that
//! stream and splits it into two halves with different owners:
//!
//! - [`LinkReader`]: pulls frames off the socket through a
//!   `tokio_util::codec::Decoder`. Owned by the session loop.
//! - [`LinkWriter`]: pushes already-framed bytes onto the socket. Owned by
//!   the client and written only from the dispatch queue.
//!
//! The transport knows nothing about the frame format; the decoder comes
//! from `neohab-protocol`.

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{LinkReader, LinkWriter, TcpTransport};

use std::fmt;

/// Opaque identifier for one established link.
///
/// A client that reconnects gets a fresh id for every socket, which keeps
/// log lines from different sessions apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(u64);

impl LinkId {
    /// Creates a new `LinkId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link-{}", self.0)
    }
}
