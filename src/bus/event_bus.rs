//! # EventBus: intake, resolution, filtering, and fan-out scheduling.
//!
//! [`EventBus`] is the entry point of the pipeline. Producers hand it events
//! through the three `submit_*` methods (fire-and-forget, never failing back);
//! two bounded worker pools do the rest.
//!
//! ## Pipeline
//! ```text
//! submit_*(event) ── try_send ──► [intake queue] ──► stage-1 workers
//!                    (reject on full)                  │
//!                                       build Message once
//!                                       resolve subscribers (+ wildcard for
//!                                       notifications), AccessFilter each
//!                                                      │ send (blocks on full)
//!                                                      ▼
//!                                            [delivery queue] ──► stage-2 workers
//!                                                                   │
//!                                                      SessionDispatcher::deliver
//! ```
//!
//! ## Lifecycle
//! The bus is an explicit service object: [`EventBus::new`] wires queues but
//! spawns nothing, [`EventBus::start`] brings up both pools (idempotent), and
//! [`EventBus::stop`] cancels them and joins within [`BusConfig::grace`],
//! force-aborting stragglers and reporting them via
//! [`RuntimeError::GraceExceeded`].
//!
//! ## Rules
//! - Stage-1 failures (message build, subscriber lookup) abort only that
//!   event's fan-out, before any delivery is scheduled.
//! - Unauthorized subscriptions never produce a delivery task.
//! - Notifications resolve the wildcard set in addition to the device set; a
//!   session holding both subscriptions receives the notification twice.
//! - No ordering across events or sessions; only each session's enqueues are
//!   serialized (by the session mutex, held for the append only).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::access::AccessFilter;
use crate::bus::config::BusConfig;
use crate::bus::delivery::{DeliveryTask, SharedReceiver, delivery_worker, next_item};
use crate::dispatch::SessionDispatcher;
use crate::error::{ResolveError, RuntimeError};
use crate::events::{Event, EventKind, MessageFactory};
use crate::subscriptions::{FilterKey, Subscription, SubscriptionIndex};

/// Everything a stage-1 worker needs; cloned once per worker.
#[derive(Clone)]
struct IntakeCtx {
    index: Arc<dyn SubscriptionIndex>,
    filter: AccessFilter,
    factory: Arc<dyn MessageFactory>,
    delivery_tx: mpsc::Sender<DeliveryTask>,
    token: CancellationToken,
}

/// Fan-out service: accepts events and schedules per-subscriber deliveries.
pub struct EventBus {
    cfg: BusConfig,
    intake_tx: mpsc::Sender<Event>,
    intake_rx: SharedReceiver<Event>,
    delivery_rx: SharedReceiver<DeliveryTask>,
    ctx: IntakeCtx,
    dispatcher: SessionDispatcher,
    workers: Mutex<JoinSet<()>>,
    started: AtomicBool,
}

impl EventBus {
    /// Wires the bounded stage queues without spawning any workers.
    pub fn new(
        cfg: BusConfig,
        index: Arc<dyn SubscriptionIndex>,
        filter: AccessFilter,
        factory: Arc<dyn MessageFactory>,
        dispatcher: SessionDispatcher,
    ) -> Self {
        let (intake_tx, intake_rx) = mpsc::channel(cfg.intake_capacity_clamped());
        let (delivery_tx, delivery_rx) = mpsc::channel(cfg.delivery_capacity_clamped());
        let token = CancellationToken::new();

        Self {
            cfg,
            intake_tx,
            intake_rx: Arc::new(Mutex::new(intake_rx)),
            delivery_rx: Arc::new(Mutex::new(delivery_rx)),
            ctx: IntakeCtx {
                index,
                filter,
                factory,
                delivery_tx,
                token,
            },
            dispatcher,
            workers: Mutex::new(JoinSet::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Spawns the stage-1 and stage-2 worker pools. Idempotent.
    pub async fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut workers = self.workers.lock().await;
        for _ in 0..self.cfg.intake_workers_clamped() {
            let rx = Arc::clone(&self.intake_rx);
            let ctx = self.ctx.clone();
            workers.spawn(async move {
                while let Some(event) = next_item(&rx, &ctx.token).await {
                    process_intake(&ctx, event).await;
                }
            });
        }
        for _ in 0..self.cfg.delivery_workers_clamped() {
            workers.spawn(delivery_worker(
                Arc::clone(&self.delivery_rx),
                self.dispatcher.clone(),
                self.ctx.token.clone(),
            ));
        }
        debug!(
            intake_workers = self.cfg.intake_workers_clamped(),
            delivery_workers = self.cfg.delivery_workers_clamped(),
            "event bus started"
        );
    }

    /// Cancels both pools and joins them within the configured grace.
    ///
    /// Queued-but-unprocessed items are dropped deterministically. Workers
    /// still running when the grace expires are force-aborted and reported in
    /// [`RuntimeError::GraceExceeded`].
    pub async fn stop(&self) -> Result<(), RuntimeError> {
        self.ctx.token.cancel();
        let mut workers = self.workers.lock().await;

        let grace = self.cfg.grace;
        let done = async {
            while workers.join_next().await.is_some() {}
        };
        if tokio::time::timeout(grace, done).await.is_err() {
            let stuck = workers.len();
            workers.abort_all();
            while workers.join_next().await.is_some() {}
            warn!(stuck, grace = ?grace, "shutdown grace exceeded; workers aborted");
            return Err(RuntimeError::GraceExceeded { grace, stuck });
        }
        debug!("event bus stopped");
        Ok(())
    }

    /// Submits a command-creation event. Fire-and-forget.
    pub fn submit_command_created(&self, event: Event) {
        self.enqueue(event);
    }

    /// Submits a command-acknowledgement event. Fire-and-forget.
    pub fn submit_command_updated(&self, event: Event) {
        self.enqueue(event);
    }

    /// Submits a notification event. Fire-and-forget.
    pub fn submit_notification_created(&self, event: Event) {
        self.enqueue(event);
    }

    /// Reject-on-full intake. Nothing propagates back to the producer.
    fn enqueue(&self, event: Event) {
        if self.ctx.token.is_cancelled() {
            debug!(kind = event.kind.as_label(), id = %event.id, "bus stopped; event dropped");
            return;
        }
        match self.intake_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(ev)) => {
                warn!(kind = ev.kind.as_label(), id = %ev.id, "intake queue full; event dropped");
            }
            Err(mpsc::error::TrySendError::Closed(ev)) => {
                debug!(kind = ev.kind.as_label(), id = %ev.id, "bus stopped; event dropped");
            }
        }
    }
}

/// Stage-1 work for one event: build the message once, resolve and filter
/// subscribers, schedule one delivery task per eligible subscription.
async fn process_intake(ctx: &IntakeCtx, event: Event) {
    debug!(kind = event.kind.as_label(), id = %event.id, device = %event.device, "event submitted");

    let (message, subs) = match resolve(ctx, &event) {
        Ok(prepared) => prepared,
        Err(err) => {
            warn!(
                kind = event.kind.as_label(),
                id = %event.id,
                label = err.as_label(),
                error = %err,
                "fan-out aborted"
            );
            return;
        }
    };

    for sub in subs {
        if !ctx.filter.is_authorized(&sub, &event).await {
            debug!(
                id = %event.id,
                owner = %sub.owner.id,
                session = sub.session.id(),
                "subscriber not authorized; skipped"
            );
            continue;
        }
        let task = DeliveryTask {
            session: Arc::clone(&sub.session),
            message: message.clone(),
            on_complete: sub.on_delivered.clone(),
        };
        // Blocking send: a full delivery queue slows intake instead of
        // dropping accepted work. Cancellation aborts the remainder.
        tokio::select! {
            _ = ctx.token.cancelled() => return,
            sent = ctx.delivery_tx.send(task) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

/// Builds the wire message and resolves the complete subscriber set.
///
/// Both lookups finish before any delivery is scheduled, so a failure here
/// means zero partial deliveries for this event.
fn resolve(
    ctx: &IntakeCtx,
    event: &Event,
) -> Result<(crate::events::Message, Vec<Arc<Subscription>>), ResolveError> {
    let message = ctx.factory.build(event).map_err(ResolveError::Build)?;

    let mut subs = ctx
        .index
        .by_key(&event.routing_key())
        .map_err(ResolveError::Lookup)?;

    if event.kind == EventKind::NotificationCreated {
        let wildcard = ctx
            .index
            .by_key(&FilterKey::AllDevices)
            .map_err(ResolveError::Lookup)?;
        subs.extend(wildcard);
    }

    Ok((message, subs))
}
