//! Field-name normalization for inbound events.
//!
//! Servers have drifted on field names for the same logical event (`secondsLeft`
//! vs `timeRemaining`, `user` vs `username`, ...). Inbound envelopes are rewritten
//! to the canonical names here so subscribers only ever see one schema.

use serde_json::{Map, Value};

/// One accepted alias for a canonical field of an event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAlias {
    pub event: &'static str,
    pub alias: &'static str,
    pub canonical: &'static str,
}

const fn alias(event: &'static str, alias: &'static str, canonical: &'static str) -> FieldAlias {
    FieldAlias {
        event,
        alias,
        canonical,
    }
}

pub const FIELD_ALIASES: &[FieldAlias] = &[
    alias("timer", "timeRemaining", "secondsLeft"),
    alias("playerJoin", "username", "user"),
    alias("userJoined", "username", "user"),
    alias("userLeft", "username", "user"),
    alias("guess", "username", "user"),
    alias("correctGuess", "username", "user"),
    alias("playerList", "players", "users"),
    alias("playerList", "list", "users"),
];

/// Rename aliased fields of `event` to their canonical names.
///
/// The canonical field wins when both are present; the alias is dropped either way.
/// Returns the number of fields that were renamed.
pub fn normalize_fields(event: &str, fields: &mut Map<String, Value>) -> usize {
    let mut renamed = 0;

    for entry in FIELD_ALIASES.iter().filter(|a| a.event == event) {
        let Some(value) = fields.remove(entry.alias) else {
            continue;
        };

        if fields.contains_key(entry.canonical) {
            tracing::debug!(
                event = %event,
                alias = entry.alias,
                canonical = entry.canonical,
                "Both alias and canonical field present, keeping canonical"
            );
            continue;
        }

        fields.insert(entry.canonical.to_string(), value);
        renamed += 1;
    }

    renamed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_timer_alias_is_renamed() {
        let mut fields = object(json!({"timeRemaining": 30}));
        assert_eq!(normalize_fields("timer", &mut fields), 1);
        assert_eq!(Value::Object(fields), json!({"secondsLeft": 30}));
    }

    #[test]
    fn test_canonical_field_wins() {
        let mut fields = object(json!({"timeRemaining": 30, "secondsLeft": 12}));
        assert_eq!(normalize_fields("timer", &mut fields), 0);
        assert_eq!(Value::Object(fields), json!({"secondsLeft": 12}));
    }

    #[test]
    fn test_aliases_are_scoped_to_their_event() {
        let mut fields = object(json!({"username": "bob"}));
        assert_eq!(normalize_fields("welcome", &mut fields), 0);
        assert_eq!(Value::Object(fields), json!({"username": "bob"}));

        let mut fields = object(json!({"username": "bob"}));
        normalize_fields("userLeft", &mut fields);
        assert_eq!(Value::Object(fields), json!({"user": "bob"}));
    }

    #[test]
    fn test_player_list_aliases() {
        let mut fields = object(json!({"players": ["a", "b"]}));
        normalize_fields("playerList", &mut fields);
        assert_eq!(Value::Object(fields), json!({"users": ["a", "b"]}));
    }
}
