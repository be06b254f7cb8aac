//! Connection supervisor: socket lifecycle and the inbound read loop.
//!
//! The flow for one session is:
//!   1. Dial → install the writer → clear the mirror → fire `connected`
//!   2. Loop: read frames → mirror + reactions, until the stream ends
//!   3. Drop the writer → fire `disconnected`
//!   4. If reconnecting is enabled, go back to 1 once

use std::sync::atomic::Ordering;

use neohab_protocol::Deframer;
use neohab_transport::{LinkReader, TcpTransport};

use crate::events::EventKey;
use crate::{ClientError, HabitatClient};

impl HabitatClient {
    /// Opens the session if it isn't already open.
    ///
    /// Returns once the socket is up and `connected` reactions have run;
    /// reading happens on a background task from then on. Calling this
    /// while connected does nothing.
    ///
    /// # Errors
    ///
    /// [`ClientError::Config`] if the host or port is unset, and
    /// [`ClientError::Transport`] if the server can't be reached.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let Some(reader) = self.establish().await? else {
            return Ok(());
        };
        let client = self.clone();
        tokio::spawn(async move { client.run_session(reader).await });
        Ok(())
    }

    /// Dials the server and prepares a fresh session.
    ///
    /// `Ok(None)` means a session was already up.
    async fn establish(&self) -> Result<Option<LinkReader<Deframer>>, ClientError> {
        let host = self.inner.host.as_str();
        let port = self.inner.port;
        if host.is_empty() || port == 0 {
            tracing::error!(host, port, "cannot connect: host and port are required");
            return Err(ClientError::Config(
                "host and port are required to connect".into(),
            ));
        }

        // Holding the link slot while dialing keeps concurrent connects
        // from opening two sockets.
        let mut link = self.inner.link.lock().await;
        if link.is_some() {
            tracing::debug!(host, port, "already connected");
            return Ok(None);
        }

        let (reader, writer) = TcpTransport::connect(host, port, Deframer::new()).await?;
        tracing::info!(host, port, link = %writer.id(), "connected to server");
        *link = Some(writer);
        self.inner.mirror.lock().clear();
        self.inner.connected.store(true, Ordering::SeqCst);
        drop(link);

        self.emit(&EventKey::Connected, None);
        Ok(Some(reader))
    }

    /// Reads until the stream ends, then reconnects once if configured.
    async fn run_session(self, mut reader: LinkReader<Deframer>) {
        loop {
            self.pump(&mut reader).await;
            self.handle_disconnect().await;

            if !self.inner.config.should_reconnect {
                break;
            }
            tracing::info!(host = %self.inner.host, port = self.inner.port, "reconnecting");
            match self.establish().await {
                Ok(Some(next)) => reader = next,
                // Someone else reconnected first and owns the read loop.
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "reconnect failed");
                    break;
                }
            }
        }
    }

    /// Hands every inbound frame to the mirror until the stream ends.
    ///
    /// An unterminated frame at end of stream still arrives here, as a
    /// best-effort last frame.
    async fn pump(&self, reader: &mut LinkReader<Deframer>) {
        let link = reader.id();

        while let Some(frame) = reader.next_frame().await {
            match frame {
                Ok(frame) => self.handle_frame(&frame),
                Err(e) => {
                    tracing::info!(%link, error = %e, "connection lost");
                    return;
                }
            }
        }
        tracing::info!(%link, "server closed the connection");
    }

    async fn handle_disconnect(&self) {
        self.inner.connected.store(false, Ordering::SeqCst);
        let writer = self.inner.link.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(e) = writer.close().await {
                tracing::debug!(link = %writer.id(), error = %e, "error closing link");
            }
        }
        tracing::info!(host = %self.inner.host, port = self.inner.port, "disconnected");
        self.emit(&EventKey::Disconnected, None);
    }
}
