//! Device events and their wire form.
//!
//! This module groups the event **data model** and the **wire message** the
//! bus builds once per event and shares across all delivery tasks.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] — event classification, identifiers, payload
//! - [`Message`] — immutable serialized form (`Arc`-shared)
//! - [`MessageFactory`], [`JsonFactory`] — payload construction seam + default
//! - Id newtypes: [`DeviceId`], [`CommandId`], [`EventId`], [`NetworkId`], [`OwnerId`]

mod event;
mod message;

pub use event::{CommandId, DeviceId, Event, EventId, EventKind, NetworkId, OwnerId};
pub use message::{JsonFactory, Message, MessageFactory};
