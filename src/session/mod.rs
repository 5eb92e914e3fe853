//! # Session handles and the outbound transport seam.
//!
//! A [`Session`] is an opaque reference to one connected subscriber. It owns
//! the two pieces of state the fan-out core relies on:
//!
//! - a **liveness flag** with a one-way `OPEN → CLOSED` transition, flipped by
//!   the embedding layer on disconnect and observed by delivery tasks at any
//!   point, including mid-dispatch;
//! - the **outbound queue** guarded by the session's serialization primitive
//!   (a `tokio::sync::Mutex` owned by the handle itself). The mutex is held
//!   only for the append or the drain, never across a transport call.
//!
//! [`Transport`] is the collaborator seam for the actual send: given a session
//! it flushes whatever is queued. It may block or fail; the dispatcher logs
//! failures and isolates them per delivery.
//!
//! ## Rules
//! - `close()` never transitions back; a session closing between the liveness
//!   check and the enqueue is a tolerated race (the message may be silently
//!   lost).
//! - The queue is mutated only while holding the session mutex.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::TransportError;
use crate::events::Message;

/// Shared handle to a connected subscriber session.
pub type SessionRef = Arc<Session>;

/// One connected subscriber: liveness flag plus serialized outbound queue.
pub struct Session {
    id: Arc<str>,
    open: AtomicBool,
    outbound: Mutex<VecDeque<Message>>,
}

impl Session {
    /// Creates an open session with the given identifier.
    pub fn new(id: impl Into<Arc<str>>) -> SessionRef {
        Arc::new(Self {
            id: id.into(),
            open: AtomicBool::new(true),
            outbound: Mutex::new(VecDeque::new()),
        })
    }

    /// Session identifier (for logs).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// True while the session has not been closed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Marks the session closed. One-way; repeated calls are a no-op.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Appends a message to the outbound queue.
    ///
    /// Holds the session mutex only for the push.
    pub async fn append(&self, message: Message) {
        let mut queue = self.outbound.lock().await;
        queue.push_back(message);
    }

    /// Takes every queued message, leaving the queue empty.
    ///
    /// Transports call this from [`Transport::flush`]; the mutex is held only
    /// for the take.
    pub async fn drain(&self) -> Vec<Message> {
        let mut queue = self.outbound.lock().await;
        queue.drain(..).collect()
    }

    /// Number of queued messages.
    pub async fn queued(&self) -> usize {
        self.outbound.lock().await.len()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

/// Collaborator contract: flushes a session's outbound queue to the wire.
///
/// Called outside the session mutex. May block or fail; a failure affects
/// only the delivery that triggered the flush.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Flushes queued messages for `session`.
    async fn flush(&self, session: &SessionRef) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn close_is_one_way() {
        let session = Session::new("s1");
        assert!(session.is_open());
        session.close();
        assert!(!session.is_open());
        session.close();
        assert!(!session.is_open());
    }

    #[tokio::test]
    async fn append_then_drain_preserves_order() {
        let session = Session::new("s1");
        session.append(Message::new("a")).await;
        session.append(Message::new("b")).await;
        assert_eq!(session.queued().await, 2);

        let drained = session.drain().await;
        let bodies: Vec<&str> = drained.iter().map(Message::as_str).collect();
        assert_eq!(bodies, ["a", "b"]);
        assert_eq!(session.queued().await, 0);
    }

    #[tokio::test]
    async fn concurrent_appends_lose_nothing() {
        let session = Session::new("s1");
        let mut joins = Vec::new();
        for i in 0..32 {
            let s = Arc::clone(&session);
            joins.push(tokio::spawn(async move {
                s.append(Message::new(format!("m{i}"))).await;
            }));
        }
        for j in joins {
            j.await.unwrap();
        }
        assert_eq!(session.queued().await, 32);
    }
}
