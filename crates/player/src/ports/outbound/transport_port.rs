//! Transport Port - Outbound port for the live channel socket
//!
//! The connection manager only needs three things from a socket: write a text
//! frame, read the next text frame, and close. `Connector` opens such a transport
//! for an address; the desktop adapter uses tokio-tungstenite, tests use an
//! in-memory pair.

use async_trait::async_trait;

/// Transport-level failures. These never reach application code as errors;
/// the connection manager turns them into state transitions.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid server address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An open bidirectional text channel.
#[async_trait]
pub trait Transport: Send {
    /// Write one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Read the next text frame.
    ///
    /// Returns `Ok(None)` once the peer has closed the channel. Must be
    /// cancel-safe: dropping the future before it resolves loses no frame.
    async fn recv_text(&mut self) -> Result<Option<String>, TransportError>;

    /// Close the channel from our side.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens transports.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, address: &str) -> Result<Box<dyn Transport>, TransportError>;
}
