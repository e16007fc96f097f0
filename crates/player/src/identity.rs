//! The local player's identity.
//!
//! The live channel only needs to know who the local player is, so it can
//! announce them with `playerJoin` whenever the socket opens.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex_lite::Regex;

/// Minimum length of a player name (same rule as account registration).
pub const MIN_NAME_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("player name must be at least {MIN_NAME_LEN} characters long")]
    TooShort,
    #[error("player name may only contain letters, digits, '_', '@', '.' and '-'")]
    InvalidCharacters,
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_@.\-]+$").expect("valid player name pattern"))
}

/// The locally authenticated player.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerIdentity(String);

impl PlayerIdentity {
    pub fn new(name: impl Into<String>) -> Result<Self, IdentityError> {
        let name = name.into();
        if name.chars().count() < MIN_NAME_LEN {
            return Err(IdentityError::TooShort);
        }
        if !name_pattern().is_match(&name) {
            return Err(IdentityError::InvalidCharacters);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromStr for PlayerIdentity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
