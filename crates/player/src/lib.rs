//! Wordrush Player - live game channel client.
//!
//! One persistent WebSocket connection to the game server, a publish/subscribe
//! event router on top of it, and reconnection with bounded backoff.
//!
//! - `infrastructure`: connection manager, event router, WebSocket adapters
//! - `application`: typed event subscriptions and game commands
//! - `ports`: the transport seam the manager talks to
//! - `config` / `identity`: environment configuration and the player name

pub mod application;
pub mod config;
pub mod identity;
pub mod infrastructure;
pub mod ports;

// Re-export commonly used entrypoints
pub use config::{ClientConfig, ConfigError};
pub use identity::{IdentityError, PlayerIdentity};
pub use infrastructure::messaging::{handler, ConnectionHandle, ConnectionState, EventRouter, Handler};
pub use infrastructure::websocket::{
    spawn_connection, Connection, ConnectionManager, PendingEvent, ReconnectPolicy, StepOutcome,
    WsConnector,
};
