//! Typed subscriptions for the canonical game events.
//!
//! Router handlers see raw envelopes. The adapters here decode the payload into
//! the canonical type first, so application code registers `Fn(TimerUpdate)`
//! instead of picking fields out of JSON. A payload that does not decode is
//! reported like any other handler error. `GameEvents` covers the synchronous
//! registries; `ConnectionHandle` gets the same methods as async calls.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use wordrush_shared::{
    ChatMessage, CorrectGuess, ErrorNotice, EventType, GameSnapshot, GuessSubmitted, NewRound,
    PlayerList, Pong, Presence, RoundEnded, RoundStarted, TimerUpdate, Welcome,
};

use crate::infrastructure::messaging::{handler, ConnectionHandle, EventRouter, Handler};
use crate::infrastructure::websocket::ConnectionManager;

/// Wrap a typed callback into a router [`Handler`].
pub fn typed_handler<P, F>(f: F) -> Handler
where
    P: DeserializeOwned + 'static,
    F: Fn(P) -> Result<()> + Send + Sync + 'static,
{
    handler(move |envelope| {
        let payload: P = envelope
            .decode()
            .with_context(|| format!("invalid '{}' payload", envelope.kind()))?;
        f(payload)
    })
}

/// Anything handlers can be registered on synchronously.
pub trait SubscriptionRegistry {
    fn register(&mut self, kind: &str, handler: Handler);
}

impl SubscriptionRegistry for EventRouter {
    fn register(&mut self, kind: &str, handler: Handler) {
        self.subscribe(kind, handler);
    }
}

impl SubscriptionRegistry for ConnectionManager {
    fn register(&mut self, kind: &str, handler: Handler) {
        self.subscribe(kind, handler);
    }
}

/// Named subscriptions for every inbound event.
///
/// Each method returns the registered handler; pass it to `unsubscribe` to
/// remove the subscription again.
pub trait GameEvents: SubscriptionRegistry {
    fn on_event<P, F>(&mut self, event: EventType, f: F) -> Handler
    where
        P: DeserializeOwned + 'static,
        F: Fn(P) -> Result<()> + Send + Sync + 'static,
    {
        let handler = typed_handler(f);
        self.register(event.as_str(), Arc::clone(&handler));
        handler
    }

    fn on_welcome<F>(&mut self, f: F) -> Handler
    where
        F: Fn(Welcome) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::Welcome, f)
    }

    fn on_new_round<F>(&mut self, f: F) -> Handler
    where
        F: Fn(NewRound) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::NewRound, f)
    }

    /// Legacy round start, still sent by older servers.
    fn on_round_started<F>(&mut self, f: F) -> Handler
    where
        F: Fn(RoundStarted) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::RoundStarted, f)
    }

    fn on_round_ended<F>(&mut self, f: F) -> Handler
    where
        F: Fn(RoundEnded) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::RoundEnded, f)
    }

    fn on_timer<F>(&mut self, f: F) -> Handler
    where
        F: Fn(TimerUpdate) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::Timer, f)
    }

    fn on_guess<F>(&mut self, f: F) -> Handler
    where
        F: Fn(GuessSubmitted) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::Guess, f)
    }

    fn on_correct_guess<F>(&mut self, f: F) -> Handler
    where
        F: Fn(CorrectGuess) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::CorrectGuess, f)
    }

    fn on_player_list<F>(&mut self, f: F) -> Handler
    where
        F: Fn(PlayerList) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::PlayerList, f)
    }

    fn on_sync<F>(&mut self, f: F) -> Handler
    where
        F: Fn(GameSnapshot) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::Sync, f)
    }

    fn on_user_joined<F>(&mut self, f: F) -> Handler
    where
        F: Fn(Presence) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::UserJoined, f)
    }

    fn on_user_left<F>(&mut self, f: F) -> Handler
    where
        F: Fn(Presence) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::UserLeft, f)
    }

    fn on_error<F>(&mut self, f: F) -> Handler
    where
        F: Fn(ErrorNotice) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::Error, f)
    }

    fn on_pong<F>(&mut self, f: F) -> Handler
    where
        F: Fn(Pong) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::Pong, f)
    }

    fn on_chat_message<F>(&mut self, f: F) -> Handler
    where
        F: Fn(ChatMessage) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::Message, f)
    }
}

impl<T: SubscriptionRegistry> GameEvents for T {}

/// The same named subscriptions for a bridged connection.
///
/// Registration goes through the bridge task, so each call is async and only
/// fails once the bridge is gone.
impl ConnectionHandle {
    pub async fn on_event<P, F>(&self, event: EventType, f: F) -> Result<Handler>
    where
        P: DeserializeOwned + 'static,
        F: Fn(P) -> Result<()> + Send + Sync + 'static,
    {
        let handler = typed_handler(f);
        self.subscribe(event, Arc::clone(&handler)).await?;
        Ok(handler)
    }

    pub async fn on_welcome<F>(&self, f: F) -> Result<Handler>
    where
        F: Fn(Welcome) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::Welcome, f).await
    }

    pub async fn on_new_round<F>(&self, f: F) -> Result<Handler>
    where
        F: Fn(NewRound) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::NewRound, f).await
    }

    pub async fn on_round_started<F>(&self, f: F) -> Result<Handler>
    where
        F: Fn(RoundStarted) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::RoundStarted, f).await
    }

    pub async fn on_round_ended<F>(&self, f: F) -> Result<Handler>
    where
        F: Fn(RoundEnded) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::RoundEnded, f).await
    }

    pub async fn on_timer<F>(&self, f: F) -> Result<Handler>
    where
        F: Fn(TimerUpdate) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::Timer, f).await
    }

    pub async fn on_guess<F>(&self, f: F) -> Result<Handler>
    where
        F: Fn(GuessSubmitted) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::Guess, f).await
    }

    pub async fn on_correct_guess<F>(&self, f: F) -> Result<Handler>
    where
        F: Fn(CorrectGuess) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::CorrectGuess, f).await
    }

    pub async fn on_player_list<F>(&self, f: F) -> Result<Handler>
    where
        F: Fn(PlayerList) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::PlayerList, f).await
    }

    pub async fn on_sync<F>(&self, f: F) -> Result<Handler>
    where
        F: Fn(GameSnapshot) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::Sync, f).await
    }

    pub async fn on_user_joined<F>(&self, f: F) -> Result<Handler>
    where
        F: Fn(Presence) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::UserJoined, f).await
    }

    pub async fn on_user_left<F>(&self, f: F) -> Result<Handler>
    where
        F: Fn(Presence) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::UserLeft, f).await
    }

    pub async fn on_error<F>(&self, f: F) -> Result<Handler>
    where
        F: Fn(ErrorNotice) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::Error, f).await
    }

    pub async fn on_pong<F>(&self, f: F) -> Result<Handler>
    where
        F: Fn(Pong) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::Pong, f).await
    }

    pub async fn on_chat_message<F>(&self, f: F) -> Result<Handler>
    where
        F: Fn(ChatMessage) -> Result<()> + Send + Sync + 'static,
    {
        self.on_event(EventType::Message, f).await
    }
}
