//! Game command service for sending live-channel events.
//!
//! Keeps callers free of envelope details: they ask for a guess or a sync and
//! the service picks the event and fills in the local player's name.

use anyhow::{bail, Result};
use serde_json::{Map, Value};

use wordrush_shared::ClientEvent;

use crate::identity::PlayerIdentity;
use crate::infrastructure::messaging::ConnectionHandle;

/// Sends game commands through a bridged connection.
///
/// Every method resolves to whether the event was handed to the transport;
/// events sent while disconnected are dropped, never queued.
#[derive(Clone)]
pub struct GameCommandService {
    connection: ConnectionHandle,
    identity: Option<PlayerIdentity>,
}

impl GameCommandService {
    pub fn new(connection: ConnectionHandle, identity: Option<PlayerIdentity>) -> Self {
        Self {
            connection,
            identity,
        }
    }

    pub fn identity(&self) -> Option<&PlayerIdentity> {
        self.identity.as_ref()
    }

    /// Submit a guess as the local player. Fails without an identity.
    pub async fn submit_guess(&self, guess: &str) -> Result<bool> {
        let guess = guess.trim();
        if guess.is_empty() {
            bail!("guess must not be empty");
        }
        let Some(identity) = &self.identity else {
            bail!("cannot guess without a player name");
        };
        self.connection
            .emit(ClientEvent::guess(guess, identity.as_str()))
            .await
    }

    pub async fn request_sync(&self) -> Result<bool> {
        self.connection.emit(ClientEvent::RequestSync).await
    }

    pub async fn ping(&self) -> Result<bool> {
        self.connection.emit(ClientEvent::Ping).await
    }

    pub async fn send_chat(&self, text: &str) -> Result<bool> {
        self.connection.emit(ClientEvent::chat(text)).await
    }

    /// Legacy round-start announcement.
    pub async fn announce_round_started(&self, data: Map<String, Value>) -> Result<bool> {
        self.connection
            .emit(ClientEvent::RoundStarted { data })
            .await
    }

    /// Legacy round-end announcement.
    pub async fn announce_round_ended(&self, data: Map<String, Value>) -> Result<bool> {
        self.connection.emit(ClientEvent::RoundEnded { data }).await
    }
}
