//! Client configuration read from the environment.
//!
//! | variable                            | default               |
//! |-------------------------------------|-----------------------|
//! | `WORDRUSH_WS_URL`                   | `ws://localhost:3000` |
//! | `WORDRUSH_USER`                     | unset (anonymous)     |
//! | `WORDRUSH_RECONNECT_MAX_ATTEMPTS`   | `5`                   |
//! | `WORDRUSH_RECONNECT_BASE_DELAY_MS`  | `3000`                |
//! | `WORDRUSH_RECONNECT_MAX_DELAY_MS`   | `30000`               |
//! | `WORDRUSH_RECONNECT_JITTER`         | `0.0`                 |

use std::fmt::Display;
use std::str::FromStr;

use crate::infrastructure::websocket::{validate_address, ReconnectPolicy};
use crate::identity::PlayerIdentity;

pub const DEFAULT_WS_URL: &str = "ws://localhost:3000";

pub const ENV_WS_URL: &str = "WORDRUSH_WS_URL";
pub const ENV_USER: &str = "WORDRUSH_USER";
pub const ENV_MAX_ATTEMPTS: &str = "WORDRUSH_RECONNECT_MAX_ATTEMPTS";
pub const ENV_BASE_DELAY_MS: &str = "WORDRUSH_RECONNECT_BASE_DELAY_MS";
pub const ENV_MAX_DELAY_MS: &str = "WORDRUSH_RECONNECT_MAX_DELAY_MS";
pub const ENV_JITTER: &str = "WORDRUSH_RECONNECT_JITTER";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl Display) -> Self {
        ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub ws_url: String,
    pub identity: Option<PlayerIdentity>,
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            identity: None,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ReconnectPolicy::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let ws_url = var(ENV_WS_URL).unwrap_or_else(|| DEFAULT_WS_URL.to_string());
        validate_address(&ws_url).map_err(|e| ConfigError::invalid(ENV_WS_URL, &ws_url, e))?;

        let identity = var(ENV_USER)
            .map(|name| {
                PlayerIdentity::new(name.trim()).map_err(|e| ConfigError::invalid(ENV_USER, &name, e))
            })
            .transpose()?;

        let jitter_factor = parse_or(var(ENV_JITTER), ENV_JITTER, defaults.jitter_factor)?;
        if !(0.0..=1.0).contains(&jitter_factor) {
            return Err(ConfigError::invalid(
                ENV_JITTER,
                &jitter_factor.to_string(),
                "must be between 0.0 and 1.0",
            ));
        }

        let reconnect = ReconnectPolicy {
            max_attempts: parse_or(var(ENV_MAX_ATTEMPTS), ENV_MAX_ATTEMPTS, defaults.max_attempts)?,
            base_delay_ms: parse_or(
                var(ENV_BASE_DELAY_MS),
                ENV_BASE_DELAY_MS,
                defaults.base_delay_ms,
            )?,
            max_delay_ms: parse_or(var(ENV_MAX_DELAY_MS), ENV_MAX_DELAY_MS, defaults.max_delay_ms)?,
            jitter_factor,
        };

        Ok(Self {
            ws_url,
            identity,
            reconnect,
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| ConfigError::invalid(key, &value, e)),
        None => Ok(default),
    }
}
