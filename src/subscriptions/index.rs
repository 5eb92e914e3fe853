//! # Subscription lookup: trait seam and bundled in-memory index.
//!
//! [`SubscriptionIndex`] is the collaborator contract the bus resolves
//! subscriber sets through. The bus only reads; registration and removal
//! belong to the embedding layer.
//!
//! [`MemoryIndex`] is the bundled implementation: a map from [`FilterKey`]
//! to registered subscriptions under a `std::sync::RwLock`. Critical sections
//! never await, so the lock is held only for map access; poisoning is
//! recovered rather than propagated (a lookup must not fail because an
//! unrelated registration panicked).
//!
//! ## Rules
//! - `by_key` returns a snapshot; later add/remove calls do not affect an
//!   in-flight fan-out.
//! - Removing a session drops *all* of its subscriptions, wildcard included.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::IndexError;
use crate::session::SessionRef;
use crate::subscriptions::{FilterKey, Subscription};

/// Handle returned by [`MemoryIndex::add`], used to remove one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Collaborator contract: resolves the subscriptions registered under a key.
///
/// Called on stage-1 workers; implementations must not block for long and must
/// tolerate concurrent lookups.
pub trait SubscriptionIndex: Send + Sync + 'static {
    /// Returns a snapshot of the subscriptions registered under `key`.
    ///
    /// An empty result is not an error. A failed lookup aborts the fan-out of
    /// the event being resolved.
    fn by_key(&self, key: &FilterKey) -> Result<Vec<Arc<Subscription>>, IndexError>;
}

/// In-memory [`SubscriptionIndex`] with registration and removal.
#[derive(Default)]
pub struct MemoryIndex {
    entries: RwLock<HashMap<FilterKey, Vec<(SubscriptionId, Arc<Subscription>)>>>,
    next_id: AtomicU64,
}

impl MemoryIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscription and returns its removal handle.
    pub fn add(&self, subscription: Subscription) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let key = subscription.key;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(key)
            .or_default()
            .push((id, Arc::new(subscription)));
        id
    }

    /// Removes one subscription by handle. Unknown handles are a no-op.
    pub fn remove(&self, id: SubscriptionId) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for subs in entries.values_mut() {
            subs.retain(|(sid, _)| *sid != id);
        }
        entries.retain(|_, subs| !subs.is_empty());
    }

    /// Removes every subscription bound to `session` (disconnect cleanup).
    pub fn remove_session(&self, session: &SessionRef) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for subs in entries.values_mut() {
            subs.retain(|(_, sub)| !Arc::ptr_eq(&sub.session, session));
        }
        entries.retain(|_, subs| !subs.is_empty());
    }

    /// Total number of registered subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.values().map(Vec::len).sum()
    }

    /// True when no subscriptions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SubscriptionIndex for MemoryIndex {
    fn by_key(&self, key: &FilterKey) -> Result<Vec<Arc<Subscription>>, IndexError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .get(key)
            .map(|subs| subs.iter().map(|(_, sub)| Arc::clone(sub)).collect())
            .unwrap_or_default())
    }
}
