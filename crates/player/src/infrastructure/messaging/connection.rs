//! Connection lifecycle management.
//!
//! This module provides the connection state machine tags, a lock-free observer
//! for reading the current state from anywhere, and the `ConnectionHandle` used to
//! drive a bridged connection manager from other tasks.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use wordrush_shared::{ClientEvent, Envelope};

use super::event_router::Handler;
use crate::identity::PlayerIdentity;

/// Lifecycle state of the live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected (initial state, after `close`, or after giving up)
    Disconnected,
    /// Transport is being opened
    Connecting,
    /// Transport is open
    Connected,
    /// Explicit close in progress
    Closing,
}

impl ConnectionState {
    /// Convert to u8 for atomic storage.
    pub fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Closing => 3,
        }
    }

    /// Convert from u8 (atomic storage).
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Closing,
            _ => ConnectionState::Disconnected,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Closing => "CLOSING",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable connection state for UI binding.
///
/// Multiple observers can share the same underlying state; only the connection
/// manager writes it.
#[derive(Debug, Clone)]
pub struct ConnectionStateObserver {
    state: Arc<AtomicU8>,
}

impl ConnectionStateObserver {
    /// Create a new observer from a shared state Arc.
    pub fn new(state: Arc<AtomicU8>) -> Self {
        Self { state }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Check if currently connected.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

/// Internal helper to update connection state. Returns the previous state.
pub fn set_connection_state(state_ref: &AtomicU8, new_state: ConnectionState) -> ConnectionState {
    ConnectionState::from_u8(state_ref.swap(new_state.to_u8(), Ordering::SeqCst))
}

/// Commands sent from handles to the bridge task that owns the manager.
pub enum BridgeCommand {
    Open {
        address: String,
        identity: Option<PlayerIdentity>,
        reply: oneshot::Sender<ConnectionState>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
    Publish {
        envelope: Envelope,
        reply: oneshot::Sender<bool>,
    },
    Subscribe {
        kind: String,
        handler: Handler,
    },
    Unsubscribe {
        kind: String,
        handler: Handler,
    },
}

impl fmt::Debug for BridgeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeCommand::Open { address, .. } => write!(f, "Open({address})"),
            BridgeCommand::Close { .. } => f.write_str("Close"),
            BridgeCommand::Publish { envelope, .. } => write!(f, "Publish({})", envelope.kind()),
            BridgeCommand::Subscribe { kind, .. } => write!(f, "Subscribe({kind})"),
            BridgeCommand::Unsubscribe { kind, .. } => write!(f, "Unsubscribe({kind})"),
        }
    }
}

/// Cloneable handle to a bridged connection manager.
///
/// Every method queues a command for the bridge task; the returned error only
/// means the bridge task is gone. Dropping the last handle closes the channel.
#[derive(Clone)]
pub struct ConnectionHandle {
    tx: mpsc::Sender<BridgeCommand>,
    observer: ConnectionStateObserver,
}

impl ConnectionHandle {
    /// Called by the bridge when spawning the connection task.
    pub fn new(tx: mpsc::Sender<BridgeCommand>, observer: ConnectionStateObserver) -> Self {
        Self { tx, observer }
    }

    async fn command(&self, command: BridgeCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|e| anyhow!("Connection bridge stopped: cannot deliver {:?}", e.0))
    }

    /// Open the live channel; resolves with the state reached by the attempt.
    pub async fn open(
        &self,
        address: impl Into<String>,
        identity: Option<PlayerIdentity>,
    ) -> Result<ConnectionState> {
        let (reply, rx) = oneshot::channel();
        self.command(BridgeCommand::Open {
            address: address.into(),
            identity,
            reply,
        })
        .await?;
        rx.await.map_err(|_| anyhow!("Connection bridge dropped the open request"))
    }

    /// Close the channel and drop every subscription.
    pub async fn close(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.command(BridgeCommand::Close { reply }).await?;
        rx.await
            .map_err(|_| anyhow!("Connection bridge dropped the close request"))
    }

    /// Publish an event; resolves with whether it was handed to the transport.
    pub async fn publish<P>(&self, kind: impl AsRef<str>, payload: &P) -> Result<bool>
    where
        P: Serialize + ?Sized,
    {
        let envelope = Envelope::from_payload(kind.as_ref(), payload)?;
        let (reply, rx) = oneshot::channel();
        self.command(BridgeCommand::Publish { envelope, reply })
            .await?;
        rx.await
            .map_err(|_| anyhow!("Connection bridge dropped the publish request"))
    }

    pub async fn emit(&self, event: ClientEvent) -> Result<bool> {
        self.publish(event.event_type(), &event).await
    }

    pub async fn subscribe(&self, kind: impl AsRef<str>, handler: Handler) -> Result<()> {
        self.command(BridgeCommand::Subscribe {
            kind: kind.as_ref().to_string(),
            handler,
        })
        .await
    }

    pub async fn unsubscribe(&self, kind: impl AsRef<str>, handler: &Handler) -> Result<()> {
        self.command(BridgeCommand::Unsubscribe {
            kind: kind.as_ref().to_string(),
            handler: Arc::clone(handler),
        })
        .await
    }

    pub fn state(&self) -> ConnectionState {
        self.observer.state()
    }

    pub fn is_connected(&self) -> bool {
        self.observer.is_connected()
    }
}
