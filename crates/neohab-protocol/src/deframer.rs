//! Byte-stream deframer.
//!
//! The server sends each message as a JSON object followed by a blank line:
//!
//! ```text
//! {"op":"make", ...}\n
//! \n
//! ```
//!
//! TCP hands us arbitrary chunks, so a frame may arrive split across many
//! reads, or several frames may share one. [`Deframer`] is a
//! [`tokio_util::codec::Decoder`]: it keeps its state between calls to
//! `decode`, so the frames it yields do not depend on where the chunk
//! boundaries fell. Wrap a socket in a `FramedRead` to get a stream of
//! frames.
//!
//! ## Framing rules
//!
//! - Outside a frame, a `{` starts a new frame. Line feeds are skipped
//!   silently; any other byte is logged and dropped.
//! - Inside a frame, every byte is kept. The first line feed arms the
//!   terminator; the next line feed after that closes the frame, and the
//!   buffer (both line feeds included) is emitted.
//! - When the stream ends inside a frame, `decode_eof` hands back the
//!   unterminated bytes as a best-effort frame. Known defect: they may be a
//!   truncated payload that will not decode.
//!
//! Note that the first line feed does not have to be directly followed by
//! the second: `{..}\n..\n` also closes. The server never emits newlines
//! inside its JSON, so this never splits a real payload.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::ProtocolError;

const FRAME_START: u8 = b'{';
const LINE_FEED: u8 = b'\n';

/// Turns a raw byte stream into discrete frame payloads.
#[derive(Debug, Default)]
pub struct Deframer {
    buf: Vec<u8>,
    framed: bool,
    first_terminator_seen: bool,
}

impl Deframer {
    /// Creates a deframer in the "unframed" state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the state machine by one byte, returning a frame if the
    /// byte completed one.
    fn push(&mut self, byte: u8) -> Option<Vec<u8>> {
        if !self.framed {
            match byte {
                FRAME_START => {
                    self.framed = true;
                    self.first_terminator_seen = false;
                    self.buf.clear();
                    self.buf.push(byte);
                }
                LINE_FEED => {}
                other => {
                    tracing::debug!(byte = other, "ignoring unframed byte");
                }
            }
            return None;
        }

        self.buf.push(byte);
        if byte != LINE_FEED {
            return None;
        }
        if !self.first_terminator_seen {
            self.first_terminator_seen = true;
            return None;
        }
        self.framed = false;
        self.first_terminator_seen = false;
        Some(std::mem::take(&mut self.buf))
    }
}

impl Decoder for Deframer {
    type Item = Vec<u8>;
    type Error = ProtocolError;

    /// Consumes bytes up to and including the end of the next frame.
    ///
    /// Everything in `src` is consumed when no frame completes; partial
    /// frame bytes live in the deframer, not in `src`.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut consumed = 0;
        let mut frame = None;
        for &byte in src.iter() {
            consumed += 1;
            frame = self.push(byte);
            if frame.is_some() {
                break;
            }
        }
        src.advance(consumed);
        Ok(frame)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if !self.framed {
            return Ok(None);
        }
        self.framed = false;
        self.first_terminator_seen = false;
        let partial = std::mem::take(&mut self.buf);
        tracing::debug!(len = partial.len(), "stream ended inside a frame");
        Ok(Some(partial))
    }
}
