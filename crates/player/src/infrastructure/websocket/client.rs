//! Desktop WebSocket transport using tokio-tungstenite

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::ports::outbound::{Connector, Transport, TransportError};

/// Opens WebSocket connections to the game server.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

/// Only `ws://` and `wss://` URLs are accepted.
pub fn validate_address(address: &str) -> Result<Url, TransportError> {
    let url = Url::parse(address).map_err(|e| TransportError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(TransportError::InvalidAddress {
            address: address.to_string(),
            reason: format!("unsupported scheme '{other}', expected ws or wss"),
        }),
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, address: &str) -> Result<Box<dyn Transport>, TransportError> {
        validate_address(address)?;

        let (stream, _response) = connect_async(address).await?;
        tracing::debug!(address = %address, "WebSocket handshake completed");

        Ok(Box::new(WsTransport { stream }))
    }
}

/// One open WebSocket connection.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<Option<String>, TransportError> {
        while let Some(frame) = self.stream.next().await {
            match frame? {
                Message::Text(text) => return Ok(Some(text)),
                Message::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => return Ok(Some(text)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring non-UTF-8 binary frame");
                    }
                },
                Message::Close(frame) => {
                    tracing::info!(frame = ?frame, "Server closed connection");
                    return Ok(None);
                }
                // Ping/pong are answered by tungstenite itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }

        Ok(None)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.stream.close(None).await {
            Ok(()) | Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
