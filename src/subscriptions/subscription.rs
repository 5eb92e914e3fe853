//! # Subscription value types.
//!
//! A [`Subscription`] binds a subscriber session, an owner identity (used for
//! access decisions), and a [`FilterKey`] — either a specific device/command
//! id or the [`FilterKey::AllDevices`] wildcard. Subscriptions are created by
//! the embedding layer and only *read* by the fan-out core.
//!
//! ## Completion hooks
//! A subscription may carry an [`CompletionHook`] fired exactly once per
//! delivery attempt for that subscription, success or failure. The hook is
//! caller-owned bookkeeping (for example decrementing an in-flight counter);
//! the core guarantees the firing, never interprets it.

use std::fmt;
use std::sync::Arc;

use crate::events::{CommandId, DeviceId, OwnerId};
use crate::session::SessionRef;

/// Caller-supplied callback fired exactly once after each delivery attempt.
pub type CompletionHook = Arc<dyn Fn() + Send + Sync>;

/// Key a subscription is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    /// Events originating from one specific device.
    Device(DeviceId),
    /// Acknowledgements of one specific command.
    Command(CommandId),
    /// Wildcard: notifications from every device.
    AllDevices,
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKey::Device(id) => write!(f, "device:{id}"),
            FilterKey::Command(id) => write!(f, "command:{id}"),
            FilterKey::AllDevices => write!(f, "all-devices"),
        }
    }
}

/// Role of a subscription owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerRole {
    /// Administrative owners bypass the network-access check.
    Admin,
    /// Regular owners are authorized per event via the access policy.
    Client,
}

/// Identity a subscription's access decisions are made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    /// Owner identifier, passed to the access policy.
    pub id: OwnerId,
    /// Owner role.
    pub role: OwnerRole,
}

impl Owner {
    /// Creates an administrative owner.
    pub fn admin(id: OwnerId) -> Self {
        Self {
            id,
            role: OwnerRole::Admin,
        }
    }

    /// Creates a regular owner.
    pub fn client(id: OwnerId) -> Self {
        Self {
            id,
            role: OwnerRole::Client,
        }
    }

    /// True for administrative owners.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self.role, OwnerRole::Admin)
    }
}

/// A registered interest of one session in a class of events.
#[derive(Clone)]
pub struct Subscription {
    /// Subscriber session the deliveries target.
    pub session: SessionRef,
    /// Identity used for access decisions.
    pub owner: Owner,
    /// Key this subscription is registered under.
    pub key: FilterKey,
    /// Optional per-delivery completion hook.
    pub on_delivered: Option<CompletionHook>,
}

impl Subscription {
    /// Creates a subscription without a completion hook.
    pub fn new(session: SessionRef, owner: Owner, key: FilterKey) -> Self {
        Self {
            session,
            owner,
            key,
            on_delivered: None,
        }
    }

    /// Attaches a completion hook fired once per delivery attempt.
    #[must_use]
    pub fn with_hook(mut self, hook: CompletionHook) -> Self {
        self.on_delivered = Some(hook);
        self
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("session", &self.session.id())
            .field("owner", &self.owner)
            .field("key", &self.key)
            .field("has_hook", &self.on_delivered.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    #[test]
    fn owner_roles() {
        assert!(Owner::admin(OwnerId(1)).is_admin());
        assert!(!Owner::client(OwnerId(1)).is_admin());
    }

    #[test]
    fn filter_key_display() {
        assert_eq!(FilterKey::Device(DeviceId(7)).to_string(), "device:7");
        assert_eq!(FilterKey::Command(CommandId(9)).to_string(), "command:9");
        assert_eq!(FilterKey::AllDevices.to_string(), "all-devices");
    }

    #[test]
    fn with_hook_attaches_hook() {
        let session = Session::new("s1");
        let sub = Subscription::new(session, Owner::client(OwnerId(1)), FilterKey::AllDevices)
            .with_hook(Arc::new(|| {}));
        assert!(sub.on_delivered.is_some());
    }
}
