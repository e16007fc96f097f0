//! Canonical event types and their payloads.
//!
//! This table is the single source of truth for field names on the live channel.
//! Inbound aliases (e.g. `timeRemaining`) are rewritten by [`crate::normalize`]
//! before any of these payloads are decoded.
//!
//! | type           | direction | fields              |
//! |----------------|-----------|---------------------|
//! | `playerJoin`   | out       | user                |
//! | `guess`        | out/in    | guess, user         |
//! | `requestSync`  | out       | -                   |
//! | `ping`         | out       | -                   |
//! | `welcome`      | in        | server defined      |
//! | `newRound`     | in        | wordLength, roundId |
//! | `roundStarted` | in/out    | server defined      |
//! | `roundEnded`   | in/out    | solution, winners   |
//! | `timer`        | in        | secondsLeft         |
//! | `correctGuess` | in        | user, guess         |
//! | `playerList`   | in        | users               |
//! | `sync`         | in        | game-state snapshot |
//! | `userJoined`   | in        | user                |
//! | `userLeft`     | in        | user                |
//! | `error`        | in        | message             |
//! | `pong`         | in        | -                   |
//! | `message`      | in/out    | text                |

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::envelope::{Envelope, ProtocolError};

/// Type tags of the canonical events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    PlayerJoin,
    Guess,
    RequestSync,
    Ping,
    Welcome,
    NewRound,
    RoundStarted,
    RoundEnded,
    Timer,
    CorrectGuess,
    PlayerList,
    Sync,
    UserJoined,
    UserLeft,
    Error,
    Pong,
    Message,
}

impl EventType {
    pub const ALL: [EventType; 17] = [
        EventType::PlayerJoin,
        EventType::Guess,
        EventType::RequestSync,
        EventType::Ping,
        EventType::Welcome,
        EventType::NewRound,
        EventType::RoundStarted,
        EventType::RoundEnded,
        EventType::Timer,
        EventType::CorrectGuess,
        EventType::PlayerList,
        EventType::Sync,
        EventType::UserJoined,
        EventType::UserLeft,
        EventType::Error,
        EventType::Pong,
        EventType::Message,
    ];

    /// Wire tag for this event.
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::PlayerJoin => "playerJoin",
            EventType::Guess => "guess",
            EventType::RequestSync => "requestSync",
            EventType::Ping => "ping",
            EventType::Welcome => "welcome",
            EventType::NewRound => "newRound",
            EventType::RoundStarted => "roundStarted",
            EventType::RoundEnded => "roundEnded",
            EventType::Timer => "timer",
            EventType::CorrectGuess => "correctGuess",
            EventType::PlayerList => "playerList",
            EventType::Sync => "sync",
            EventType::UserJoined => "userJoined",
            EventType::UserLeft => "userLeft",
            EventType::Error => "error",
            EventType::Pong => "pong",
            EventType::Message => "message",
        }
    }

    /// Look up a wire tag. Unknown tags are still routable, they just have no
    /// canonical payload.
    pub fn from_wire(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl AsRef<str> for EventType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Inbound payloads (Server → Client)
// =============================================================================

/// Greeting sent by the server right after the socket opens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Welcome {
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

/// Round identifiers are numeric on some servers and strings on others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoundId {
    Number(u64),
    Text(String),
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundId::Number(n) => write!(f, "{n}"),
            RoundId::Text(s) => f.write_str(s),
        }
    }
}

/// A new round began; only the length of the hidden word is revealed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRound {
    pub word_length: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_id: Option<RoundId>,
}

/// Legacy round-start announcement with server-defined data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundStarted {
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundEnded {
    pub solution: String,
    #[serde(default)]
    pub winners: Vec<String>,
}

/// Periodic countdown for the running round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerUpdate {
    pub seconds_left: u32,
}

/// A guess as relayed by the server (also the outbound guess shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessSubmitted {
    pub guess: String,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectGuess {
    pub user: String,
    pub guess: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerList {
    #[serde(default)]
    pub users: Vec<String>,
}

/// Full game-state snapshot answering `requestSync`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    #[serde(flatten)]
    pub state: Map<String, Value>,
}

/// Presence change (`userJoined` / `userLeft`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {}

/// Free-text chat line (legacy `message` event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
}

// =============================================================================
// Outbound events (Client → Server)
// =============================================================================

/// Events a client sends to the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Announce the local player after the socket opens
    PlayerJoin { user: String },
    /// Submit a guess for the running round
    Guess { guess: String, user: String },
    /// Ask the server for a full `sync` snapshot
    RequestSync,
    /// Liveness probe, answered with `pong`
    Ping,
    /// Legacy round-start announcement
    RoundStarted {
        #[serde(flatten)]
        data: Map<String, Value>,
    },
    /// Legacy round-end announcement
    RoundEnded {
        #[serde(flatten)]
        data: Map<String, Value>,
    },
    /// Free-text chat line
    #[serde(rename = "message")]
    Chat { text: String },
}

impl ClientEvent {
    pub fn player_join(user: impl Into<String>) -> Self {
        ClientEvent::PlayerJoin { user: user.into() }
    }

    pub fn guess(guess: impl Into<String>, user: impl Into<String>) -> Self {
        ClientEvent::Guess {
            guess: guess.into(),
            user: user.into(),
        }
    }

    pub fn chat(text: impl Into<String>) -> Self {
        ClientEvent::Chat { text: text.into() }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            ClientEvent::PlayerJoin { .. } => EventType::PlayerJoin,
            ClientEvent::Guess { .. } => EventType::Guess,
            ClientEvent::RequestSync => EventType::RequestSync,
            ClientEvent::Ping => EventType::Ping,
            ClientEvent::RoundStarted { .. } => EventType::RoundStarted,
            ClientEvent::RoundEnded { .. } => EventType::RoundEnded,
            ClientEvent::Chat { .. } => EventType::Message,
        }
    }

    /// Payload fields of this event, without the type tag.
    pub fn into_fields(self) -> Result<Map<String, Value>, ProtocolError> {
        Ok(Envelope::from_payload(self.event_type().as_str(), &self)?.into_fields())
    }
}
