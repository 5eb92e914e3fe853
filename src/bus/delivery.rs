//! # Stage-2 delivery tasks and the worker loop that runs them.
//!
//! [`DeliveryTask`] is the explicit value type scheduled once per eligible
//! subscriber: exactly the data one delivery needs (session handle, shared
//! wire message, optional completion hook), no captured ambient state.
//!
//! Stage-2 workers share one bounded queue; each worker takes the next task
//! and runs [`SessionDispatcher::deliver`] under `catch_unwind`, so a
//! panicking transport is reported and the worker keeps serving the pool.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::dispatch::SessionDispatcher;
use crate::events::Message;
use crate::session::SessionRef;
use crate::subscriptions::CompletionHook;

/// One scheduled delivery: session, shared message, optional hook.
pub(crate) struct DeliveryTask {
    pub session: SessionRef,
    pub message: Message,
    pub on_complete: Option<CompletionHook>,
}

/// Receiver end of a stage queue, shared by that stage's worker pool.
///
/// A worker holds the lock only while awaiting the next item; processing
/// happens after release, so the pool drains the queue concurrently.
pub(crate) type SharedReceiver<T> = Arc<Mutex<mpsc::Receiver<T>>>;

/// Awaits the next queue item, or `None` once the token is cancelled.
pub(crate) async fn next_item<T>(rx: &SharedReceiver<T>, token: &CancellationToken) -> Option<T> {
    let mut rx = rx.lock().await;
    tokio::select! {
        _ = token.cancelled() => None,
        item = rx.recv() => item,
    }
}

/// Stage-2 worker loop: runs queued deliveries until cancellation.
pub(crate) async fn delivery_worker(
    rx: SharedReceiver<DeliveryTask>,
    dispatcher: SessionDispatcher,
    token: CancellationToken,
) {
    while let Some(task) = next_item(&rx, &token).await {
        let DeliveryTask {
            session,
            message,
            on_complete,
        } = task;

        let fut = dispatcher.deliver(&session, message, on_complete);
        if let Err(payload) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
            let info = panic_message(payload.as_ref());
            warn!(session = session.id(), panic = %info, "delivery panicked; worker continues");
        }
    }
}

/// Best-effort extraction of a panic payload for logging.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::error::TransportError;
    use crate::session::{Session, Transport};

    struct CountingTransport {
        flushes: AtomicUsize,
        panic_first: AtomicUsize,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn flush(&self, _session: &SessionRef) -> Result<(), TransportError> {
            if self.panic_first.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                n.checked_sub(1)
            }).is_ok()
            {
                panic!("flush blew up");
            }
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn worker_survives_panicking_delivery() {
        let transport = Arc::new(CountingTransport {
            flushes: AtomicUsize::new(0),
            panic_first: AtomicUsize::new(1),
        });
        let dispatcher = SessionDispatcher::new(Arc::clone(&transport) as Arc<dyn Transport>);
        let (tx, rx) = mpsc::channel(8);
        let rx = Arc::new(Mutex::new(rx));
        let token = CancellationToken::new();

        let worker = tokio::spawn(delivery_worker(rx, dispatcher, token.clone()));

        let session = Session::new("s1");
        for _ in 0..3 {
            tx.send(DeliveryTask {
                session: Arc::clone(&session),
                message: Message::new("m"),
                on_complete: None,
            })
            .await
            .unwrap();
        }

        // First delivery panics, the remaining two still flush.
        tokio::time::timeout(std::time::Duration::from_secs(2), async {
            while transport.flushes.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("worker died after panic");

        token.cancel();
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn cancellation_stops_the_worker() {
        let transport = Arc::new(CountingTransport {
            flushes: AtomicUsize::new(0),
            panic_first: AtomicUsize::new(0),
        });
        let dispatcher = SessionDispatcher::new(transport as Arc<dyn Transport>);
        let (_tx, rx) = mpsc::channel::<DeliveryTask>(8);
        let rx = Arc::new(Mutex::new(rx));
        let token = CancellationToken::new();

        let worker = tokio::spawn(delivery_worker(rx, dispatcher, token.clone()));
        token.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), worker)
            .await
            .expect("worker ignored cancellation")
            .unwrap();
    }
}
