//! Event envelope - the unit exchanged over the live channel.
//!
//! Every transport message is a single JSON object with a mandatory string `type`,
//! a numeric `timestamp` (epoch milliseconds, set by the sender) and any number of
//! type-specific fields:
//!
//! ```json
//! {"type": "timer", "secondsLeft": 42, "timestamp": 1000}
//! ```

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::normalize::normalize_fields;

/// Name of the event type tag on the wire.
pub const TYPE_FIELD: &str = "type";

/// Name of the sender timestamp on the wire.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Errors raised while building or parsing envelopes.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid envelope JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("envelope has no event type")]
    MissingType,

    #[error("payload for '{kind}' must be a JSON object, got {found}")]
    PayloadNotObject { kind: String, found: &'static str },
}

/// One message on the live channel.
///
/// The payload fields are kept as a JSON map so the router can hand them to
/// subscribers without knowing every event type; typed access goes through
/// [`Envelope::decode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    kind: String,

    /// Sender clock. Not authoritative for ordering across senders.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    timestamp: Option<i64>,

    #[serde(flatten)]
    fields: Map<String, Value>,
}

/// Accept integer or floating-point timestamps; anything else counts as absent.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Current wall clock in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl Envelope {
    /// Build an outbound envelope stamped with the current time.
    ///
    /// Payload entries named `type` or `timestamp` are dropped; the envelope's own
    /// tag and clock always win.
    pub fn new(kind: impl Into<String>, fields: Map<String, Value>) -> Result<Self, ProtocolError> {
        Self::with_timestamp(kind, fields, now_millis())
    }

    /// Build an envelope with an explicit timestamp.
    pub fn with_timestamp(
        kind: impl Into<String>,
        mut fields: Map<String, Value>,
        timestamp: i64,
    ) -> Result<Self, ProtocolError> {
        let kind = kind.into();
        if kind.trim().is_empty() {
            return Err(ProtocolError::MissingType);
        }

        for reserved in [TYPE_FIELD, TIMESTAMP_FIELD] {
            if fields.remove(reserved).is_some() {
                tracing::debug!(kind = %kind, field = reserved, "Dropped reserved payload field");
            }
        }

        Ok(Self {
            kind,
            timestamp: Some(timestamp),
            fields,
        })
    }

    /// Build an outbound envelope from any serializable payload.
    ///
    /// The payload must serialize to a JSON object (or `null`/unit, meaning no fields).
    pub fn from_payload<P>(kind: impl Into<String>, payload: &P) -> Result<Self, ProtocolError>
    where
        P: Serialize + ?Sized,
    {
        let kind = kind.into();
        let fields = match serde_json::to_value(payload)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ProtocolError::PayloadNotObject {
                    kind,
                    found: json_kind(&other),
                })
            }
        };
        Self::new(kind, fields)
    }

    /// Parse one inbound transport message.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(raw)?;
        if envelope.kind.trim().is_empty() {
            return Err(ProtocolError::MissingType);
        }
        Ok(envelope)
    }

    /// Serialize to the single-document wire form.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rewrite aliased field names to their canonical names.
    ///
    /// Returns the number of renamed fields.
    pub fn normalize(&mut self) -> usize {
        normalize_fields(&self.kind, &mut self.fields)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// Decode the payload fields into a typed payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_splits_metadata_from_fields() {
        let envelope =
            Envelope::parse(r#"{"type":"timer","secondsLeft":42,"timestamp":1000}"#).unwrap();

        assert_eq!(envelope.kind(), "timer");
        assert_eq!(envelope.timestamp(), Some(1000));
        assert_eq!(envelope.field("secondsLeft"), Some(&json!(42)));
        assert!(envelope.field("type").is_none());
        assert!(envelope.field("timestamp").is_none());
    }

    #[test]
    fn test_parse_accepts_missing_or_fractional_timestamp() {
        let missing = Envelope::parse(r#"{"type":"pong"}"#).unwrap();
        assert_eq!(missing.timestamp(), None);

        let fractional = Envelope::parse(r#"{"type":"pong","timestamp":1700.9}"#).unwrap();
        assert_eq!(fractional.timestamp(), Some(1700));
    }

    #[test]
    fn test_parse_rejects_missing_or_empty_type() {
        assert!(matches!(
            Envelope::parse(r#"{"secondsLeft":1}"#),
            Err(ProtocolError::Json(_))
        ));
        assert!(matches!(
            Envelope::parse(r#"{"type":"  "}"#),
            Err(ProtocolError::MissingType)
        ));
        assert!(matches!(
            Envelope::parse("not json"),
            Err(ProtocolError::Json(_))
        ));
        assert!(matches!(
            Envelope::parse(r#"{"type":7}"#),
            Err(ProtocolError::Json(_))
        ));
    }

    #[test]
    fn test_from_payload_stamps_time_and_drops_reserved_fields() {
        let before = now_millis();
        let envelope = Envelope::from_payload(
            "guess",
            &json!({"guess": "APFEL", "user": "alice", "type": "spoofed", "timestamp": 1}),
        )
        .unwrap();

        assert_eq!(envelope.kind(), "guess");
        assert!(envelope.timestamp().unwrap() >= before);
        assert_eq!(envelope.fields().len(), 2);

        let wire: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(wire["type"], "guess");
        assert_eq!(wire["guess"], "APFEL");
        assert_eq!(wire["user"], "alice");
        assert!(wire["timestamp"].is_i64());
    }

    #[test]
    fn test_from_payload_rejects_non_objects() {
        let err = Envelope::from_payload("guess", &json!(["APFEL"])).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::PayloadNotObject { found: "an array", .. }
        ));

        let empty = Envelope::from_payload("ping", &()).unwrap();
        assert!(empty.fields().is_empty());
    }

    #[test]
    fn test_new_rejects_empty_kind() {
        assert!(matches!(
            Envelope::new("", Map::new()),
            Err(ProtocolError::MissingType)
        ));
    }
}
