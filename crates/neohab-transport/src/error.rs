/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Opening the TCP connection failed.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        /// The `host:port` that was dialed.
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),
}
