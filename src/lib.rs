//! # eventfan
//!
//! **Eventfan** is an asynchronous fan-out bus for device-originated events.
//!
//! It delivers commands, command acknowledgements, and notifications to a
//! dynamic set of subscribed client sessions, guaranteeing that messages
//! destined for the same session are never interleaved or corrupted by
//! concurrent delivery attempts. The crate is a building block: subscription
//! storage, access policy, payload rendering, and the raw transport are
//! pluggable collaborator traits.
//!
//! ## Architecture
//! ```text
//! Producers (many):
//!   submit_command_created / submit_command_updated / submit_notification_created
//!        │  fire-and-forget, try_send (reject on full)
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  EventBus (service object: start()/stop() with shutdown grace)    │
//! │                                                                   │
//! │  [intake queue] ──► stage-1 workers                               │
//! │      - MessageFactory::build (once per event, Arc-shared)         │
//! │      - SubscriptionIndex::by_key (+ wildcard for notifications)   │
//! │      - AccessFilter (admin bypass, fail-closed on policy error)   │
//! │              │ one DeliveryTask per eligible subscription         │
//! │              ▼                                                    │
//! │  [delivery queue] ──► stage-2 workers                             │
//! └──────────────│────────────────────────────────────────────────────┘
//!                ▼
//!       SessionDispatcher::deliver(session, message, hook)
//!           - closed session → silent drop
//!           - append under the session mutex (enqueue only)
//!           - Transport::flush outside the mutex
//!           - completion hook fires exactly once, success or failure
//! ```
//!
//! ## Ordering model
//! No ordering is guaranteed across events or across sessions. Within one
//! session, concurrent deliveries serialize their enqueues through the
//! session's own mutex; the transport flush runs outside it, so flush order
//! may differ from enqueue order (transports that drain the whole queue per
//! flush observe queue order regardless).
//!
//! ## Features
//! | Area            | Description                                                   | Key types / traits                       |
//! |-----------------|---------------------------------------------------------------|------------------------------------------|
//! | **Intake**      | Fire-and-forget submission, bounded two-stage pipeline.       | [`EventBus`], [`BusConfig`]              |
//! | **Routing**     | Device/command keys plus the all-devices wildcard.            | [`FilterKey`], [`SubscriptionIndex`]     |
//! | **Access**      | Admin bypass, per-event network checks, fail-closed errors.   | [`AccessFilter`], [`AccessPolicy`]       |
//! | **Delivery**    | Per-session serialized enqueue, hooked completion.            | [`SessionDispatcher`], [`CompletionHook`]|
//! | **Sessions**    | Opaque handles with one-way liveness and a serialized queue.  | [`Session`], [`Transport`]               |
//! | **Errors**      | Typed resolution/lifecycle errors, opaque collaborator errors.| [`ResolveError`], [`RuntimeError`]       |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventfan::{
//!     AccessFilter, AccessPolicy, BusConfig, DeviceId, Event, EventBus, EventId, FilterKey,
//!     JsonFactory, MemoryIndex, NetworkId, Owner, OwnerId, PolicyError, Session,
//!     SessionDispatcher, SessionRef, Subscription, SubscriptionIndex, Transport, TransportError,
//! };
//!
//! struct AllowAll;
//!
//! #[async_trait::async_trait]
//! impl AccessPolicy for AllowAll {
//!     async fn has_network_access(
//!         &self,
//!         _owner: &Owner,
//!         _network: NetworkId,
//!     ) -> Result<bool, PolicyError> {
//!         Ok(true)
//!     }
//! }
//!
//! struct PrintTransport;
//!
//! #[async_trait::async_trait]
//! impl Transport for PrintTransport {
//!     async fn flush(&self, session: &SessionRef) -> Result<(), TransportError> {
//!         for message in session.drain().await {
//!             println!("{} <- {}", session.id(), message.as_str());
//!         }
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let index = Arc::new(MemoryIndex::new());
//!     let bus = EventBus::new(
//!         BusConfig::default(),
//!         Arc::clone(&index) as Arc<dyn SubscriptionIndex>,
//!         AccessFilter::new(Arc::new(AllowAll)),
//!         Arc::new(JsonFactory),
//!         SessionDispatcher::new(Arc::new(PrintTransport)),
//!     );
//!
//!     let session = Session::new("client-1");
//!     index.add(Subscription::new(
//!         Arc::clone(&session),
//!         Owner::client(OwnerId(1)),
//!         FilterKey::Device(DeviceId(7)),
//!     ));
//!
//!     bus.start().await;
//!     bus.submit_notification_created(Event::notification_created(
//!         EventId(1),
//!         DeviceId(7),
//!         NetworkId(1),
//!         serde_json::json!({ "temperature": 21.5 }),
//!     ));
//!     bus.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Delivery guarantees (and non-guarantees)
//! - **Fire-and-forget**: no failure ever propagates to a producer.
//! - **Isolation**: one subscriber's slow, failing, or panicking delivery
//!   never affects sibling deliveries for the same event.
//! - **No persistence**: events are lost on overflow, on closed sessions, and
//!   across restarts.

mod access;
mod bus;
mod dispatch;
mod error;
mod events;
mod session;
mod subscriptions;

// ---- Public re-exports ----

pub use access::{AccessFilter, AccessPolicy};
pub use bus::{BusConfig, EventBus};
pub use dispatch::SessionDispatcher;
pub use error::{
    BuildError, IndexError, PolicyError, ResolveError, RuntimeError, TransportError,
};
pub use events::{
    CommandId, DeviceId, Event, EventId, EventKind, JsonFactory, Message, MessageFactory,
    NetworkId, OwnerId,
};
pub use session::{Session, SessionRef, Transport};
pub use subscriptions::{
    CompletionHook, FilterKey, MemoryIndex, Owner, OwnerRole, Subscription, SubscriptionId,
    SubscriptionIndex,
};
