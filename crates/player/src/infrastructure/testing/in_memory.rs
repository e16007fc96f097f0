//! In-memory transport pair for driving the connection manager in tests.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::ports::outbound::{Connector, Transport, TransportError};

enum Frame {
    Text(String),
    Close,
    Error(String),
}

#[derive(Default)]
struct Shared {
    refusing: bool,
    refuse_next: usize,
    failing_sends: bool,
    connect_delay: Duration,
    addresses: Vec<String>,
    sent: Vec<String>,
    closes: usize,
    inbound: Option<mpsc::UnboundedSender<Frame>>,
}

/// Scriptable connector. Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryConnector {
    shared: Arc<Mutex<Shared>>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Refuse every connection attempt until switched off again.
    pub fn set_refusing(&self, refusing: bool) {
        self.lock().refusing = refusing;
    }

    /// Refuse the next `count` connection attempts.
    pub fn refuse_next(&self, count: usize) {
        self.lock().refuse_next = count;
    }

    /// Make every write on the live transport fail until switched off again.
    pub fn set_failing_sends(&self, failing: bool) {
        self.lock().failing_sends = failing;
    }

    /// Make every connection attempt take `delay` before it resolves.
    pub fn set_connect_delay(&self, delay: Duration) {
        self.lock().connect_delay = delay;
    }

    /// Number of connection attempts so far.
    pub fn connect_count(&self) -> usize {
        self.lock().addresses.len()
    }

    /// Addresses of all connection attempts, in order.
    pub fn addresses(&self) -> Vec<String> {
        self.lock().addresses.clone()
    }

    /// Every text frame written by any transport of this connector.
    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// Sent frames parsed as JSON (unparseable frames are skipped).
    pub fn sent_json(&self) -> Vec<Value> {
        self.lock()
            .sent
            .iter()
            .filter_map(|text| serde_json::from_str(text).ok())
            .collect()
    }

    /// Number of transports closed from the client side.
    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    /// Deliver a text frame to the live transport. Returns false if there is none.
    pub fn push_inbound(&self, text: impl Into<String>) -> bool {
        self.deliver(Frame::Text(text.into()))
    }

    /// Simulate the server closing the channel cleanly.
    pub fn close_from_server(&self) -> bool {
        self.deliver(Frame::Close)
    }

    /// Simulate the connection dropping with an error.
    pub fn drop_connection(&self) -> bool {
        self.deliver(Frame::Error("connection reset by peer".to_string()))
    }

    fn deliver(&self, frame: Frame) -> bool {
        self.lock()
            .inbound
            .as_ref()
            .is_some_and(|tx| tx.send(frame).is_ok())
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    async fn connect(&self, address: &str) -> Result<Box<dyn Transport>, TransportError> {
        let delay = {
            let mut shared = self.lock();
            shared.addresses.push(address.to_string());
            shared.connect_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut shared = self.lock();
        if shared.refusing || shared.refuse_next > 0 {
            shared.refuse_next = shared.refuse_next.saturating_sub(1);
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("connection to {address} refused"),
            )));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        shared.inbound = Some(tx);

        Ok(Box::new(InMemoryTransport {
            shared: Arc::clone(&self.shared),
            inbound: rx,
        }))
    }
}

/// Client side of an in-memory connection.
pub struct InMemoryTransport {
    shared: Arc<Mutex<Shared>>,
    inbound: mpsc::UnboundedReceiver<Frame>,
}

impl InMemoryTransport {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        let mut shared = self.lock();
        if shared.failing_sends {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "write on a broken connection",
            )));
        }
        shared.sent.push(text);
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<Option<String>, TransportError> {
        match self.inbound.recv().await {
            Some(Frame::Text(text)) => Ok(Some(text)),
            Some(Frame::Close) | None => Ok(None),
            Some(Frame::Error(reason)) => Err(TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                reason,
            ))),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inbound.close();
        self.lock().closes += 1;
        Ok(())
    }
}
