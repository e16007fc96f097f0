//! Event Router for the live channel.
//!
//! Maps an event `type` to an ordered list of handlers. Inbound messages are
//! parsed, normalized to the canonical field names and dispatched to every handler
//! of their type in registration order. Outbound events are formatted here into
//! envelopes the connection manager can send.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;

use wordrush_shared::{Envelope, EventType, ProtocolError};

/// A subscriber callback.
///
/// Handlers are compared by reference: keep the `Arc` returned at registration
/// time to unsubscribe later.
pub type Handler = Arc<dyn Fn(&Envelope) -> anyhow::Result<()> + Send + Sync + 'static>;

/// Wrap a closure into a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Envelope) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Publish/subscribe registry keyed by event type.
#[derive(Default)]
pub struct EventRouter {
    subscriptions: HashMap<String, Vec<Handler>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the subscribers of `kind`.
    pub fn subscribe(&mut self, kind: impl AsRef<str>, handler: Handler) {
        self.subscriptions
            .entry(kind.as_ref().to_string())
            .or_default()
            .push(handler);
    }

    /// Remove every registration of `handler` under `kind`.
    ///
    /// Returns the number of removed registrations.
    pub fn unsubscribe(&mut self, kind: impl AsRef<str>, handler: &Handler) -> usize {
        let kind = kind.as_ref();
        let Some(handlers) = self.subscriptions.get_mut(kind) else {
            return 0;
        };

        let before = handlers.len();
        handlers.retain(|registered| !Arc::ptr_eq(registered, handler));
        let removed = before - handlers.len();

        if handlers.is_empty() {
            self.subscriptions.remove(kind);
        }
        removed
    }

    /// Number of handlers registered for `kind`.
    pub fn subscriber_count(&self, kind: impl AsRef<str>) -> usize {
        self.subscriptions
            .get(kind.as_ref())
            .map_or(0, |handlers| handlers.len())
    }

    /// Number of registrations across all types.
    pub fn total_subscriptions(&self) -> usize {
        self.subscriptions.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    /// Format an outbound event.
    pub fn envelope<P>(kind: impl AsRef<str>, payload: &P) -> Result<Envelope, ProtocolError>
    where
        P: Serialize + ?Sized,
    {
        Envelope::from_payload(kind.as_ref(), payload)
    }

    /// Route one raw inbound message.
    ///
    /// Malformed messages are logged and discarded. Returns the number of handlers
    /// that were invoked.
    pub fn dispatch(&self, raw: &str) -> usize {
        let mut envelope = match Envelope::parse(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, len = raw.len(), "Discarding malformed message");
                return 0;
            }
        };

        if EventType::from_wire(envelope.kind()).is_none() {
            tracing::debug!(event = envelope.kind(), "Unrecognized event type");
        }

        let renamed = envelope.normalize();
        if renamed > 0 {
            tracing::trace!(
                event = envelope.kind(),
                renamed,
                "Normalized aliased fields"
            );
        }

        self.dispatch_envelope(&envelope)
    }

    /// Invoke every handler of the envelope's type in registration order.
    ///
    /// A failing or panicking handler is logged and does not stop the others.
    pub fn dispatch_envelope(&self, envelope: &Envelope) -> usize {
        let Some(handlers) = self.subscriptions.get(envelope.kind()) else {
            tracing::trace!(event = envelope.kind(), "No subscribers");
            return 0;
        };

        for (index, handler) in handlers.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(envelope))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(
                        event = envelope.kind(),
                        subscriber = index,
                        error = %format!("{e:#}"),
                        "Subscriber failed"
                    );
                }
                Err(payload) => {
                    tracing::error!(
                        event = envelope.kind(),
                        subscriber = index,
                        panic = %panic_message(payload.as_ref()),
                        "Subscriber panicked"
                    );
                }
            }
        }

        handlers.len()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> Handler {
        let log = Arc::clone(log);
        handler(move |envelope| {
            log.lock().unwrap().push(format!("{tag}:{}", envelope.kind()));
            Ok(())
        })
    }

    #[test]
    fn test_dispatch_invokes_handlers_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = EventRouter::new();
        router.subscribe("guess", recorder(&log, "first"));
        router.subscribe("guess", recorder(&log, "second"));
        router.subscribe("timer", recorder(&log, "other"));

        let invoked = router.dispatch(r#"{"type":"guess","guess":"APFEL","user":"bob"}"#);

        assert_eq!(invoked, 2);
        assert_eq!(*log.lock().unwrap(), vec!["first:guess", "second:guess"]);
    }

    #[test]
    fn test_handler_receives_payload_and_metadata() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        let mut router = EventRouter::new();
        router.subscribe(
            "timer",
            handler(move |envelope| {
                *seen_clone.lock().unwrap() = Some((
                    envelope.field("secondsLeft").and_then(|v| v.as_u64()),
                    envelope.timestamp(),
                ));
                Ok(())
            }),
        );

        router.dispatch(r#"{"type":"timer","secondsLeft":42,"timestamp":1000}"#);

        assert_eq!(*seen.lock().unwrap(), Some((Some(42), Some(1000))));
    }

    #[test]
    fn test_dispatch_normalizes_aliases_before_handlers_run() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        let mut router = EventRouter::new();
        router.subscribe(
            "timer",
            handler(move |envelope| {
                *seen_clone.lock().unwrap() = Some(envelope.fields().clone());
                Ok(())
            }),
        );

        router.dispatch(r#"{"type":"timer","timeRemaining":9}"#);

        let fields = seen.lock().unwrap().clone().unwrap();
        assert_eq!(fields.get("secondsLeft"), Some(&serde_json::json!(9)));
        assert!(!fields.contains_key("timeRemaining"));
    }

    #[test]
    fn test_unsubscribe_removes_every_registration_of_that_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let twice = recorder(&log, "twice");
        let kept = recorder(&log, "kept");
        let mut router = EventRouter::new();
        router.subscribe("guess", Arc::clone(&twice));
        router.subscribe("guess", Arc::clone(&kept));
        router.subscribe("guess", Arc::clone(&twice));
        router.subscribe("timer", Arc::clone(&twice));

        assert_eq!(router.unsubscribe("guess", &twice), 2);
        router.dispatch(r#"{"type":"guess"}"#);

        assert_eq!(*log.lock().unwrap(), vec!["kept:guess"]);
        assert_eq!(router.subscriber_count("timer"), 1);
    }

    #[test]
    fn test_unsubscribe_unknown_is_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registered = recorder(&log, "a");
        let stranger = recorder(&log, "b");
        let mut router = EventRouter::new();
        router.subscribe("guess", Arc::clone(&registered));

        assert_eq!(router.unsubscribe("nothing", &registered), 0);
        assert_eq!(router.unsubscribe("guess", &stranger), 0);
        assert_eq!(router.subscriber_count("guess"), 1);
    }

    #[test]
    fn test_malformed_messages_invoke_nobody() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = EventRouter::new();
        router.subscribe("guess", recorder(&log, "a"));

        assert_eq!(router.dispatch("{not json"), 0);
        assert_eq!(router.dispatch(r#"{"guess":"APFEL"}"#), 0);
        assert_eq!(router.dispatch(r#"{"type":""}"#), 0);
        assert_eq!(router.dispatch(r#"["guess"]"#), 0);

        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failing_and_panicking_handlers_are_isolated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = EventRouter::new();
        router.subscribe("guess", handler(|_| anyhow::bail!("boom")));
        router.subscribe("guess", handler(|_| panic!("subscriber bug")));
        router.subscribe("guess", recorder(&log, "after"));
        router.subscribe("timer", recorder(&log, "timer"));

        assert_eq!(router.dispatch(r#"{"type":"guess"}"#), 3);
        router.dispatch(r#"{"type":"timer"}"#);
        router.dispatch(r#"{"type":"guess"}"#);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["after:guess", "timer:timer", "after:guess"]
        );
    }

    #[test]
    fn test_clear_drops_everything() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = EventRouter::new();
        router.subscribe("guess", recorder(&log, "a"));
        router.subscribe("timer", recorder(&log, "b"));
        assert_eq!(router.total_subscriptions(), 2);

        router.clear();

        assert_eq!(router.total_subscriptions(), 0);
        assert_eq!(router.dispatch(r#"{"type":"guess"}"#), 0);
    }

    #[test]
    fn test_envelope_formats_outbound_events() {
        let envelope = EventRouter::envelope(
            "guess",
            &serde_json::json!({"guess": "APFEL", "user": "alice"}),
        )
        .unwrap();
        assert_eq!(envelope.kind(), "guess");
        assert!(envelope.timestamp().is_some());
    }
}
