//! The fan-out pipeline: intake, resolution, scheduling.
//!
//! ## Contents
//! - [`EventBus`] — the service object (`submit_*`, `start`, `stop`)
//! - [`BusConfig`] — pool/queue sizing and shutdown grace
//!
//! Internal modules:
//! - `delivery`: the stage-2 task type and worker loop;
//! - `event_bus`: stage-1 resolution and the service lifecycle.
//!
//! See `lib.rs` for the system-level wiring diagram.

mod config;
mod delivery;
mod event_bus;

pub use config::BusConfig;
pub use event_bus::EventBus;
