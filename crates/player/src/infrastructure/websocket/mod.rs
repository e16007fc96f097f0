//! WebSocket client for the live game channel
//!
//! - `backoff`: reconnection policy and delay math
//! - `client`: tokio-tungstenite `Connector`/`Transport` adapters
//! - `manager`: the connection manager state machine
//! - `bridge`: runs a manager on its own task behind a `ConnectionHandle`

mod backoff;
mod bridge;
mod client;
mod manager;

pub use backoff::{
    BackoffState, ReconnectPolicy, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_DELAY_MS,
    DEFAULT_MAX_RECONNECT_ATTEMPTS,
};
pub use bridge::{spawn_connection, Connection};
pub use client::{validate_address, WsConnector, WsTransport};
pub use manager::{ConnectionManager, PendingEvent, StepOutcome};
