//! Application layer: typed event subscriptions and outbound game commands.

pub mod game_commands;
pub mod game_events;

pub use game_commands::GameCommandService;
pub use game_events::{typed_handler, GameEvents, SubscriptionRegistry};
