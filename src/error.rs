//! Error types used by the fan-out bus and its collaborators.
//!
//! This module defines two crate-owned error enums:
//!
//! - [`ResolveError`] — stage-1 failures (wire message build, subscriber lookup).
//! - [`RuntimeError`] — failures of the bus lifecycle itself (shutdown grace).
//!
//! Collaborator traits ([`SubscriptionIndex`](crate::subscriptions::SubscriptionIndex),
//! [`AccessPolicy`](crate::access::AccessPolicy), [`MessageFactory`](crate::events::MessageFactory),
//! [`Transport`](crate::session::Transport)) return boxed error aliases so
//! external implementations stay opaque to the core.
//!
//! Both enums provide helper methods (`as_label`, `as_message`) for logging.

use std::time::Duration;

use thiserror::Error;

/// Opaque error produced by a [`SubscriptionIndex`](crate::subscriptions::SubscriptionIndex) implementation.
pub type IndexError = Box<dyn std::error::Error + Send + Sync>;

/// Opaque error produced by an [`AccessPolicy`](crate::access::AccessPolicy) implementation.
pub type PolicyError = Box<dyn std::error::Error + Send + Sync>;

/// Opaque error produced by a [`MessageFactory`](crate::events::MessageFactory) implementation.
pub type BuildError = Box<dyn std::error::Error + Send + Sync>;

/// Opaque error produced by a [`Transport`](crate::session::Transport) implementation.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// # Stage-1 resolution failures.
///
/// Raised while preparing an event's fan-out: building the wire message or
/// resolving the subscriber set. Either variant aborts that event's fan-out
/// (no partial deliveries are attempted) and is logged; nothing propagates
/// back to the producer.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The wire message could not be built from the event.
    #[error("failed to build wire message: {0}")]
    Build(#[source] BuildError),

    /// The subscription index lookup failed.
    #[error("subscription lookup failed: {0}")]
    Lookup(#[source] IndexError),
}

impl ResolveError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ResolveError::Build(_) => "resolve_build",
            ResolveError::Lookup(_) => "resolve_lookup",
        }
    }
}

/// # Errors produced by the bus lifecycle.
///
/// These represent failures of the service object itself, not of any single
/// event's fan-out.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some pool workers were still running.
    #[error("shutdown grace {grace:?} exceeded; {stuck} worker(s) still running")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Number of pool workers that did not finish in time.
        stuck: usize,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use eventfan::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: 2 };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck workers={stuck}")
            }
        }
    }
}
