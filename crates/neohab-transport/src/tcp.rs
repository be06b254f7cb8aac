//! TCP transport implementation using `tokio::net`.

use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::{Decoder, FramedRead};

use crate::{LinkId, TransportError};

/// Counter for generating unique link IDs.
static NEXT_LINK_ID: AtomicU64 = AtomicU64::new(1);

/// Dials world servers over TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

impl TcpTransport {
    /// Opens a TCP connection to `host:port` and splits it into a reader
    /// that cuts inbound bytes into frames with `decoder`, and a writer.
    pub async fn connect<D: Decoder>(
        host: &str,
        port: u16,
        decoder: D,
    ) -> Result<(LinkReader<D>, LinkWriter), TransportError> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect(&addr).await.map_err(|source| {
            TransportError::ConnectFailed {
                addr: addr.clone(),
                source,
            }
        })?;
        // Commands are small and paced; don't let Nagle hold them back.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "could not set TCP_NODELAY");
        }

        let id = LinkId::new(NEXT_LINK_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %addr, "opened TCP link");

        let (read, write) = stream.into_split();
        Ok((
            LinkReader {
                id,
                frames: FramedRead::new(read, decoder),
            },
            LinkWriter { id, half: write },
        ))
    }
}

/// The receiving half of a link, yielding decoded frames.
#[derive(Debug)]
pub struct LinkReader<D> {
    id: LinkId,
    frames: FramedRead<OwnedReadHalf, D>,
}

impl<D: Decoder + Unpin> LinkReader<D> {
    /// Receives the next frame from the server.
    ///
    /// Returns `None` once the server has closed the stream and the
    /// decoder's end-of-stream handling has run.
    pub async fn next_frame(&mut self) -> Option<Result<D::Item, D::Error>> {
        let frame = self.frames.next().await;
        if frame.is_some() {
            tracing::trace!(id = %self.id, "received frame");
        }
        frame
    }

    /// Returns the identifier shared with the matching [`LinkWriter`].
    pub fn id(&self) -> LinkId {
        self.id
    }
}

/// The sending half of a link.
#[derive(Debug)]
pub struct LinkWriter {
    id: LinkId,
    half: OwnedWriteHalf,
}

impl LinkWriter {
    /// Writes `data` to the server in full.
    pub async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.half
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)?;
        self.half.flush().await.map_err(TransportError::SendFailed)
    }

    /// Shuts down the write direction of the socket.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        self.half
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    /// Returns the identifier shared with the matching [`LinkReader`].
    pub fn id(&self) -> LinkId {
        self.id
    }
}
