//! Outbound ports - Interfaces for external services
//!
//! These ports define the contracts that infrastructure adapters must implement,
//! so the connection manager can drive a live channel without depending on a
//! concrete socket implementation.

pub mod transport_port;

pub use transport_port::{Connector, Transport, TransportError};

#[cfg(test)]
pub use transport_port::MockConnector;
