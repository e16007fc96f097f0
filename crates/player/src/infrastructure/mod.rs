pub mod messaging;
pub mod websocket;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export the connection surface
pub use messaging::{ConnectionHandle, ConnectionState, EventRouter, Handler};
pub use websocket::{spawn_connection, Connection, ConnectionManager, StepOutcome};
