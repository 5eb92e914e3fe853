//! # Wire messages: built once per event, shared across delivery tasks.
//!
//! [`Message`] is the serialized form of an [`Event`] ready for transport.
//! The bus builds it exactly once per event (stage 1) and every delivery task
//! for that event shares the same backing allocation; cloning a `Message` is a
//! refcount bump, never a copy of the body.
//!
//! [`MessageFactory`] is the collaborator seam for payload construction.
//! [`JsonFactory`] is the bundled implementation producing a flat JSON
//! envelope.
//!
//! ## Rules
//! - A `Message` is never mutated after construction (lock-free sharing).
//! - Factory failures abort that event's fan-out; they are logged by the bus
//!   and never reach the producer.

use std::sync::Arc;

use serde_json::json;

use crate::error::BuildError;
use crate::events::{Event, EventKind};

/// Immutable wire form of an event.
///
/// Internally an `Arc<str>`; `clone()` shares the same body.
#[derive(Debug, Clone)]
pub struct Message {
    body: Arc<str>,
}

impl Message {
    /// Wraps an already-serialized body.
    pub fn new(body: impl Into<Arc<str>>) -> Self {
        Self { body: body.into() }
    }

    /// The serialized body.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.body
    }

    /// Byte length of the body.
    #[must_use]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// True when the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// True when `self` and `other` share the same backing allocation.
    ///
    /// Used by tests to assert the built-once invariant.
    #[must_use]
    pub fn shares_body(&self, other: &Message) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::new(s)
    }
}

/// Collaborator contract: builds the wire [`Message`] for an event.
///
/// Must be a pure function of the event. Called once per event on a stage-1
/// worker.
pub trait MessageFactory: Send + Sync + 'static {
    /// Builds the wire message for `event`.
    fn build(&self, event: &Event) -> Result<Message, BuildError>;
}

/// Default JSON factory.
///
/// Produces a flat envelope:
/// ```json
/// { "action": "notification/insert", "id": 42, "device": 7, "payload": { ... } }
/// ```
/// with actions `command/insert`, `command/update` and `notification/insert`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFactory;

impl JsonFactory {
    fn action(kind: EventKind) -> &'static str {
        match kind {
            EventKind::CommandCreated => "command/insert",
            EventKind::CommandUpdated => "command/update",
            EventKind::NotificationCreated => "notification/insert",
        }
    }
}

impl MessageFactory for JsonFactory {
    fn build(&self, event: &Event) -> Result<Message, BuildError> {
        let frame = json!({
            "action": Self::action(event.kind),
            "id": event.id.0,
            "device": event.device.0,
            "payload": event.payload,
        });
        let body = serde_json::to_string(&frame)?;
        Ok(Message::from(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{DeviceId, EventId, NetworkId};

    #[test]
    fn clone_shares_body() {
        let m1 = Message::new("hello");
        let m2 = m1.clone();
        assert!(m1.shares_body(&m2));
        assert_eq!(m1.as_str(), m2.as_str());
    }

    #[test]
    fn json_factory_builds_envelope() {
        let ev = Event::notification_created(
            EventId(42),
            DeviceId(7),
            NetworkId(1),
            serde_json::json!({ "temperature": 21.5 }),
        );
        let msg = JsonFactory.build(&ev).unwrap();
        let frame: serde_json::Value = serde_json::from_str(msg.as_str()).unwrap();
        assert_eq!(frame["action"], "notification/insert");
        assert_eq!(frame["id"], 42);
        assert_eq!(frame["device"], 7);
        assert_eq!(frame["payload"]["temperature"], 21.5);
    }

    #[test]
    fn json_factory_action_per_kind() {
        assert_eq!(JsonFactory::action(EventKind::CommandCreated), "command/insert");
        assert_eq!(JsonFactory::action(EventKind::CommandUpdated), "command/update");
        assert_eq!(
            JsonFactory::action(EventKind::NotificationCreated),
            "notification/insert"
        );
    }
}
