//! # Bus configuration.
//!
//! Provides [`BusConfig`] — bounded pool and queue sizing plus the shutdown
//! grace period for the [`EventBus`](crate::bus::EventBus) service.
//!
//! ## Backpressure
//! Both stages are bounded. The producer edge (`submit_*`) uses a **reject**
//! policy: a full intake queue drops the event with a warn, because submission
//! is fire-and-forget and must never block a producer. Between stages the
//! policy is **block**: a full delivery queue slows stage-1 workers instead of
//! dropping already-accepted work.

use std::time::Duration;

/// Sizing and shutdown settings for the fan-out bus.
///
/// ## Field semantics
/// - `intake_capacity` / `delivery_capacity`: bounded queue sizes (min 1, clamped)
/// - `intake_workers` / `delivery_workers`: fixed pool sizes (min 1, clamped)
/// - `grace`: maximum wait for pool workers to finish during `stop()`
///
/// All fields are public; prefer the clamped accessors over reading fields
/// directly so minimums apply in one place.
#[derive(Clone, Debug)]
pub struct BusConfig {
    /// Capacity of the bounded intake queue (stage 1).
    ///
    /// When full, newly submitted events are dropped with a warn.
    pub intake_capacity: usize,

    /// Number of stage-1 workers (payload build, subscriber resolution, filtering).
    pub intake_workers: usize,

    /// Capacity of the bounded delivery queue (stage 2).
    ///
    /// When full, stage-1 workers block until space frees up.
    pub delivery_capacity: usize,

    /// Number of stage-2 workers (per-subscriber delivery).
    pub delivery_workers: usize,

    /// Maximum time `stop()` waits for workers before force-aborting them.
    pub grace: Duration,
}

impl BusConfig {
    /// Intake queue capacity, clamped to at least 1.
    #[must_use]
    pub fn intake_capacity_clamped(&self) -> usize {
        self.intake_capacity.max(1)
    }

    /// Stage-1 pool size, clamped to at least 1.
    #[must_use]
    pub fn intake_workers_clamped(&self) -> usize {
        self.intake_workers.max(1)
    }

    /// Delivery queue capacity, clamped to at least 1.
    #[must_use]
    pub fn delivery_capacity_clamped(&self) -> usize {
        self.delivery_capacity.max(1)
    }

    /// Stage-2 pool size, clamped to at least 1.
    #[must_use]
    pub fn delivery_workers_clamped(&self) -> usize {
        self.delivery_workers.max(1)
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            intake_capacity: 256,
            intake_workers: 2,
            delivery_capacity: 1024,
            delivery_workers: 8,
            grace: Duration::from_secs(5),
        }
    }
}
