//! Event routing and connection lifecycle types.
//!
//! - `EventRouter`: publish/subscribe registry keyed by event type
//! - `ConnectionState` / `ConnectionStateObserver`: lifecycle state, readable from anywhere
//! - `ConnectionHandle`: drive a bridged connection manager from other tasks
//!
//! The WebSocket bridge (in the websocket module) connects these to the actual transport.

pub mod connection;
pub mod event_router;

pub use connection::{
    set_connection_state, BridgeCommand, ConnectionHandle, ConnectionState,
    ConnectionStateObserver,
};
pub use event_router::{handler, EventRouter, Handler};
