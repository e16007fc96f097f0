//! Test utilities for the live channel
//!
//! An in-memory `Connector` that lets tests script connection outcomes, inject
//! inbound frames and inspect what was sent. Available when the `testing` feature
//! is enabled.
//!
//! # Usage
//!
//! Add to your Cargo.toml:
//! ```toml
//! [dev-dependencies]
//! wordrush-player = { workspace = true, features = ["testing"] }
//! ```

mod in_memory;

pub use in_memory::{InMemoryConnector, InMemoryTransport};
