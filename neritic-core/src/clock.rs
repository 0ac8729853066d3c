//! Injected time sources.
//!
//! The buffer never consults a process-global clock. Every
//! [`SubBuffer`](crate::SubBuffer) and [`DynamicBuffer`](crate::DynamicBuffer)
//! reads time through a [`Clock`], so deployments run on the real monotonic
//! clock while tests drive a manual one, and simulated-time runs scale
//! priority growth through the warp factor without touching stored
//! timestamps.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A monotonic time source with an optional time-warp factor.
///
/// Implementations must be cheap to clone; clones of the simulation-aware
/// clocks share their underlying state.
pub trait Clock: Clone + fmt::Debug {
    /// Current instant on the monotonic timeline.
    fn now(&self) -> Instant;

    /// Multiplier applied to elapsed quantities inside priority
    /// computation. Real-time clocks return 1.0.
    fn warp_factor(&self) -> f64 {
        1.0
    }
}

/// The default clock: `Instant::now()`, no warp.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Simulation settings shared by every clone of a [`SimClock`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimSettings {
    /// Whether simulated time is active
    pub using_sim_time: bool,
    /// Elapsed-time multiplier applied while simulated time is active
    pub warp_factor: f64,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self { using_sim_time: false, warp_factor: 1.0 }
    }
}

/// A real-time clock whose warp factor can be changed while buffers are
/// live.
///
/// `now()` is the real monotonic clock; only priority computation sees the
/// warp. Clones share settings, so the host can hand one clone to the
/// buffer and keep another to flip simulation on and off.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    settings: Arc<RwLock<SimSettings>>,
}

impl SimClock {
    /// Create a clock with simulation off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn simulated time on with the given warp factor.
    pub fn enable_warp(&self, warp_factor: f64) {
        let mut settings = self.settings.write();
        settings.using_sim_time = true;
        settings.warp_factor = warp_factor;
    }

    /// Turn simulated time off; the warp factor reverts to 1.0.
    pub fn disable_warp(&self) {
        let mut settings = self.settings.write();
        settings.using_sim_time = false;
        settings.warp_factor = 1.0;
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> SimSettings {
        *self.settings.read()
    }
}

impl Clock for SimClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn warp_factor(&self) -> f64 {
        let settings = self.settings.read();
        if settings.using_sim_time { settings.warp_factor } else { 1.0 }
    }
}

/// A manually advanced clock for deterministic timelines.
///
/// Starts at the real instant of construction and only moves when
/// [`advance`](Self::advance) is called. Clones share the same timeline.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<Instant>>,
}

impl ManualClock {
    /// Create a clock frozen at the current real instant.
    pub fn new() -> Self {
        Self { now: Arc::new(RwLock::new(Instant::now())) }
    }

    /// Move the clock forward by `step`.
    pub fn advance(&self, step: Duration) {
        *self.now.write() += step;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.read()
    }
}
