//! Subscriptions: who receives what.
//!
//! ## Contents
//! - [`Subscription`], [`FilterKey`], [`Owner`], [`OwnerRole`] — value types
//! - [`CompletionHook`] — per-delivery bookkeeping callback
//! - [`SubscriptionIndex`] — lookup seam consumed by the bus
//! - [`MemoryIndex`], [`SubscriptionId`] — bundled in-memory implementation
//!
//! The fan-out core only *reads* subscriptions; registration and removal are
//! owned by the embedding layer (typically on connect/disconnect).

mod index;
mod subscription;

pub use index::{MemoryIndex, SubscriptionId, SubscriptionIndex};
pub use subscription::{CompletionHook, FilterKey, Owner, OwnerRole, Subscription};
