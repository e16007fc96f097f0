//! Connection manager for the live channel.
//!
//! Owns the one transport, the subscription registry and the reconnection
//! state. Everything goes through `&mut self`; the pending retry is a deadline
//! that [`ConnectionManager::next_event`] awaits, so clearing it cancels the retry.

use std::sync::atomic::AtomicU8;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use wordrush_shared::{ClientEvent, Envelope};

use super::backoff::{BackoffState, ReconnectPolicy};
use crate::identity::PlayerIdentity;
use crate::infrastructure::messaging::{
    set_connection_state, ConnectionState, ConnectionStateObserver, EventRouter, Handler,
};
use crate::ports::outbound::{Connector, Transport, TransportError};

/// What a single [`ConnectionManager::step`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// An inbound frame was handed to `handlers` subscribers
    Dispatched { handlers: usize },
    /// A scheduled retry opened the channel again
    Reconnected,
    /// The channel is down; attempt `attempt` fires after `delay`
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// The attempt ceiling was reached; no automatic retry is pending
    GaveUp,
    /// Nothing to wait for: no transport and no pending retry
    Idle,
}

/// Something [`ConnectionManager::next_event`] waited for, not yet acted on.
#[derive(Debug)]
pub enum PendingEvent {
    /// The transport produced a frame, closed (`Ok(None)`) or failed
    Frame(Result<Option<String>, TransportError>),
    /// The pending retry deadline passed
    RetryDue,
    /// No transport and no pending retry
    Idle,
}

#[derive(Debug, Clone)]
struct Target {
    address: String,
    identity: Option<PlayerIdentity>,
}

pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    router: EventRouter,
    backoff: BackoffState,
    state: Arc<AtomicU8>,
    target: Option<Target>,
    transport: Option<Box<dyn Transport>>,
    retry_at: Option<Instant>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, policy: ReconnectPolicy) -> Self {
        Self {
            connector,
            router: EventRouter::new(),
            backoff: BackoffState::new(policy),
            state: Arc::new(AtomicU8::new(ConnectionState::Disconnected.to_u8())),
            target: None,
            transport: None,
            retry_at: None,
        }
    }

    /// Open the channel to `address`, announcing `identity` once connected.
    ///
    /// A no-op when already connected to the same address. Otherwise any pending
    /// retry is cancelled, the attempt counter starts over and a live transport to
    /// another address is closed first. Subscriptions are kept.
    pub async fn open(
        &mut self,
        address: impl Into<String>,
        identity: Option<PlayerIdentity>,
    ) -> ConnectionState {
        let address = address.into();
        if self.is_connected() && self.address() == Some(address.as_str()) {
            tracing::debug!(address = %address, "Already connected");
            return ConnectionState::Connected;
        }

        if let Some(mut previous) = self.transport.take() {
            tracing::info!(
                from = self.address().unwrap_or_default(),
                to = %address,
                "Switching live channel to a new address"
            );
            self.set_state(ConnectionState::Closing);
            if let Err(e) = previous.close().await {
                tracing::debug!(error = %e, "Error while closing previous transport");
            }
        }

        self.retry_at = None;
        self.backoff.reset();
        self.target = Some(Target { address, identity });

        self.connect_target().await;
        self.connection_state()
    }

    /// Close the channel for good: cancels any pending retry, tears down the
    /// transport and drops every subscription.
    pub async fn close(&mut self) {
        self.retry_at = None;

        if let Some(mut transport) = self.transport.take() {
            self.set_state(ConnectionState::Closing);
            if let Err(e) = transport.close().await {
                tracing::debug!(error = %e, "Error while closing transport");
            }
        }

        self.target = None;
        self.backoff.reset();
        self.router.clear();
        self.set_state(ConnectionState::Disconnected);
        tracing::info!("Live channel closed");
    }

    /// Send one envelope. At most once: dropped with a warning unless connected.
    pub async fn send(&mut self, envelope: &Envelope) -> bool {
        if !self.is_connected() {
            tracing::warn!(
                kind = envelope.kind(),
                state = %self.connection_state(),
                "Not connected, dropping outbound event"
            );
            return false;
        }
        let Some(transport) = self.transport.as_mut() else {
            return false;
        };

        let text = match envelope.to_json() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(kind = envelope.kind(), error = %e, "Failed to serialize envelope");
                return false;
            }
        };

        let written = transport.send_text(text).await;
        match written {
            Ok(()) => {
                tracing::trace!(kind = envelope.kind(), "Sent event");
                true
            }
            Err(e) => {
                tracing::warn!(kind = envelope.kind(), error = %e, "Failed to write to transport");
                self.connection_lost();
                false
            }
        }
    }

    /// Format `{type, ...payload, timestamp}` and send it.
    pub async fn publish<P>(&mut self, kind: impl AsRef<str>, payload: &P) -> bool
    where
        P: Serialize + ?Sized,
    {
        match EventRouter::envelope(kind.as_ref(), payload) {
            Ok(envelope) => self.send(&envelope).await,
            Err(e) => {
                tracing::error!(kind = kind.as_ref(), error = %e, "Failed to build envelope");
                false
            }
        }
    }

    pub async fn emit(&mut self, event: ClientEvent) -> bool {
        self.publish(event.event_type(), &event).await
    }

    /// Wait for the next thing that needs doing and do it.
    ///
    /// Same as [`next_event`](Self::next_event) followed by
    /// [`handle_event`](Self::handle_event). Only the waiting part is
    /// cancel-safe; use the two halves when racing against other futures.
    pub async fn step(&mut self) -> StepOutcome {
        let event = self.next_event().await;
        self.handle_event(event).await
    }

    /// Wait for the next inbound frame or the pending retry deadline.
    ///
    /// Cancel-safe: dropping the future loses no frame and keeps a pending retry.
    /// Nothing changes until the result goes to [`handle_event`](Self::handle_event).
    pub async fn next_event(&mut self) -> PendingEvent {
        if let Some(transport) = self.transport.as_mut() {
            return PendingEvent::Frame(transport.recv_text().await);
        }

        match self.retry_at {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                PendingEvent::RetryDue
            }
            None => PendingEvent::Idle,
        }
    }

    /// Act on an event from [`next_event`](Self::next_event): dispatch a frame,
    /// handle a lost channel or run a due reconnection attempt.
    ///
    /// Runs the event to completion; do not drop this future half way.
    pub async fn handle_event(&mut self, event: PendingEvent) -> StepOutcome {
        match event {
            PendingEvent::Frame(Ok(Some(text))) => StepOutcome::Dispatched {
                handlers: self.router.dispatch(&text),
            },
            PendingEvent::Frame(Ok(None)) => {
                tracing::info!("Server closed the live channel");
                self.connection_lost()
            }
            PendingEvent::Frame(Err(e)) => {
                tracing::warn!(error = %e, "Live channel failed");
                self.connection_lost()
            }
            PendingEvent::RetryDue if self.transport.is_none() && self.retry_at.is_some() => {
                tracing::info!(
                    attempt = self.backoff.attempts(),
                    max_attempts = self.backoff.policy().max_attempts,
                    "Reconnecting"
                );
                self.connect_target().await
            }
            PendingEvent::RetryDue | PendingEvent::Idle => StepOutcome::Idle,
        }
    }

    pub fn subscribe(&mut self, kind: impl AsRef<str>, handler: Handler) {
        self.router.subscribe(kind, handler);
    }

    pub fn unsubscribe(&mut self, kind: impl AsRef<str>, handler: &Handler) -> usize {
        self.router.unsubscribe(kind, handler)
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut EventRouter {
        &mut self.router
    }

    pub fn observer(&self) -> ConnectionStateObserver {
        ConnectionStateObserver::new(Arc::clone(&self.state))
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.observer().state()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some() && self.connection_state() == ConnectionState::Connected
    }

    /// Reconnection attempts since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.backoff.attempts()
    }

    /// Address of the last `open`, until `close`.
    pub fn address(&self) -> Option<&str> {
        self.target.as_ref().map(|t| t.address.as_str())
    }

    /// True when [`step`](Self::step) has nothing to wait for.
    pub fn is_idle(&self) -> bool {
        self.transport.is_none() && self.retry_at.is_none()
    }

    async fn connect_target(&mut self) -> StepOutcome {
        let Some(target) = self.target.clone() else {
            self.retry_at = None;
            return StepOutcome::Idle;
        };

        self.set_state(ConnectionState::Connecting);
        match self.connector.connect(&target.address).await {
            Ok(transport) => {
                self.on_open(transport, target).await;
                StepOutcome::Reconnected
            }
            Err(e @ TransportError::InvalidAddress { .. }) => {
                tracing::error!(error = %e, "Invalid server address, not retrying");
                self.retry_at = None;
                self.set_state(ConnectionState::Disconnected);
                StepOutcome::GaveUp
            }
            Err(e) => {
                tracing::warn!(address = %target.address, error = %e, "Failed to open live channel");
                self.schedule_reconnect()
            }
        }
    }

    async fn on_open(&mut self, transport: Box<dyn Transport>, target: Target) {
        self.retry_at = None;
        self.transport = Some(transport);
        self.backoff.reset();
        self.set_state(ConnectionState::Connected);
        tracing::info!(address = %target.address, "Live channel open");

        if let Some(identity) = target.identity {
            self.emit(ClientEvent::player_join(identity.into_inner())).await;
        }
    }

    fn connection_lost(&mut self) -> StepOutcome {
        self.transport = None;
        self.schedule_reconnect()
    }

    fn schedule_reconnect(&mut self) -> StepOutcome {
        self.set_state(ConnectionState::Disconnected);

        match self.backoff.next_delay_and_advance() {
            Some(delay) => {
                let attempt = self.backoff.attempts();
                tracing::info!(
                    attempt,
                    max_attempts = self.backoff.policy().max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling reconnection"
                );
                self.retry_at = Some(Instant::now() + delay);
                StepOutcome::ReconnectScheduled { attempt, delay }
            }
            None => {
                self.retry_at = None;
                tracing::error!(
                    attempts = self.backoff.attempts(),
                    "Max reconnection attempts reached, giving up"
                );
                StepOutcome::GaveUp
            }
        }
    }

    fn set_state(&self, new_state: ConnectionState) {
        let previous = set_connection_state(&self.state, new_state);
        if previous != new_state {
            tracing::debug!(from = %previous, to = %new_state, "Connection state changed");
        }
    }
}
