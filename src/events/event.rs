//! # Device-originated events accepted by the bus.
//!
//! The [`EventKind`] enum classifies the three event types the bus fans out:
//! command creation, command acknowledgement (update), and notification.
//! The [`Event`] struct carries the identifiers and domain payload; it is
//! immutable once submitted.
//!
//! ## Routing
//! Each event resolves its subscriber set through a [`FilterKey`]:
//! - `CommandCreated` and `NotificationCreated` route by the source device id;
//! - `CommandUpdated` routes by the command id (the event id names the command
//!   being acknowledged);
//! - notifications additionally resolve the [`FilterKey::AllDevices`] wildcard
//!   set at fan-out time.
//!
//! ## Example
//! ```rust
//! use eventfan::{DeviceId, Event, EventId, EventKind, FilterKey, NetworkId};
//!
//! let ev = Event::notification_created(
//!     EventId(42),
//!     DeviceId(7),
//!     NetworkId(1),
//!     serde_json::json!({ "temperature": 21.5 }),
//! );
//!
//! assert_eq!(ev.kind, EventKind::NotificationCreated);
//! assert_eq!(ev.routing_key(), FilterKey::Device(DeviceId(7)));
//! ```

use std::fmt;

use serde_json::Value;

use crate::subscriptions::FilterKey;

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(v: u64) -> Self {
                Self(v)
            }
        }
    };
}

id_newtype! {
    /// Identifier of a source device.
    DeviceId
}
id_newtype! {
    /// Identifier of a device command.
    CommandId
}
id_newtype! {
    /// Identifier of a single event (command id or notification id).
    EventId
}
id_newtype! {
    /// Identifier of the network a device belongs to (access-policy scope).
    NetworkId
}
id_newtype! {
    /// Identifier of a subscription owner (the identity access decisions use).
    OwnerId
}

/// Classification of device events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A new command was issued to a device.
    CommandCreated,
    /// A device acknowledged or updated a previously issued command.
    CommandUpdated,
    /// A device emitted a notification.
    NotificationCreated,
}

impl EventKind {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::CommandCreated => "command_created",
            EventKind::CommandUpdated => "command_updated",
            EventKind::NotificationCreated => "notification_created",
        }
    }
}

/// A device-originated event, immutable once submitted.
///
/// Carries the source device, the event's own identifier, the network scope
/// used for access decisions, and the domain payload.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event classification.
    pub kind: EventKind,
    /// Identifier of this event (for `CommandUpdated` this is the command id).
    pub id: EventId,
    /// Source device.
    pub device: DeviceId,
    /// Network the source device belongs to.
    pub network: NetworkId,
    /// Domain payload, passed through to the wire message untouched.
    pub payload: Value,
}

impl Event {
    /// Creates a command-creation event.
    pub fn command_created(id: EventId, device: DeviceId, network: NetworkId, payload: Value) -> Self {
        Self {
            kind: EventKind::CommandCreated,
            id,
            device,
            network,
            payload,
        }
    }

    /// Creates a command-acknowledgement event. `id` is the id of the command
    /// being updated.
    pub fn command_updated(id: EventId, device: DeviceId, network: NetworkId, payload: Value) -> Self {
        Self {
            kind: EventKind::CommandUpdated,
            id,
            device,
            network,
            payload,
        }
    }

    /// Creates a notification event.
    pub fn notification_created(
        id: EventId,
        device: DeviceId,
        network: NetworkId,
        payload: Value,
    ) -> Self {
        Self {
            kind: EventKind::NotificationCreated,
            id,
            device,
            network,
            payload,
        }
    }

    /// Key used to resolve this event's primary subscriber set.
    ///
    /// Notifications additionally resolve [`FilterKey::AllDevices`]; that
    /// second lookup happens at fan-out time, not here.
    #[must_use]
    pub fn routing_key(&self) -> FilterKey {
        match self.kind {
            EventKind::CommandCreated | EventKind::NotificationCreated => {
                FilterKey::Device(self.device)
            }
            EventKind::CommandUpdated => FilterKey::Command(CommandId(self.id.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_and_notifications_route_by_device() {
        let cmd = Event::command_created(EventId(1), DeviceId(7), NetworkId(1), Value::Null);
        let notif = Event::notification_created(EventId(2), DeviceId(7), NetworkId(1), Value::Null);
        assert_eq!(cmd.routing_key(), FilterKey::Device(DeviceId(7)));
        assert_eq!(notif.routing_key(), FilterKey::Device(DeviceId(7)));
    }

    #[test]
    fn command_updates_route_by_command_id() {
        let upd = Event::command_updated(EventId(99), DeviceId(7), NetworkId(1), Value::Null);
        assert_eq!(upd.routing_key(), FilterKey::Command(CommandId(99)));
    }

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(EventKind::CommandCreated.as_label(), "command_created");
        assert_eq!(EventKind::CommandUpdated.as_label(), "command_updated");
        assert_eq!(EventKind::NotificationCreated.as_label(), "notification_created");
    }
}
