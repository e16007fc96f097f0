//! Wordrush Shared - wire protocol for the live game channel
//!
//! This crate contains the types exchanged over the WebSocket connection between
//! the game server and its clients:
//! - The `Envelope` (one JSON document per transport message)
//! - Canonical event type tags (`EventType`)
//! - Typed payloads for every canonical event, and outbound `ClientEvent`s
//! - The field-alias table used to normalize drifting server field names
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - serde, serde_json, chrono, thiserror and tracing
//! 2. **No connection logic** - pure data types and serialization
//! 3. **One canonical schema** - every event type has exactly one payload shape

pub mod envelope;
pub mod events;
pub mod normalize;

pub use envelope::{Envelope, ProtocolError, TIMESTAMP_FIELD, TYPE_FIELD};
pub use events::{
    ChatMessage, ClientEvent, CorrectGuess, ErrorNotice, EventType, GameSnapshot, GuessSubmitted,
    NewRound, PlayerList, Pong, Presence, RoundEnded, RoundId, RoundStarted, TimerUpdate,
    Welcome,
};
pub use normalize::{normalize_fields, FieldAlias, FIELD_ALIASES};
