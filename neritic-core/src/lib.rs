//! # Neritic Core
//!
//! Outbound message buffering for the Neritic acoustic-link middleware.
//!
//! Modem drivers feeding a constrained, lossy, low-bandwidth link need to
//! decide *which* message to send *next*. This crate provides the data
//! structure that makes that call: a collection of independently
//! configured, named sub-buffers whose priorities grow with the time since
//! each was last served, normalized by their time-to-live.
//!
//! Key behaviors:
//! - Per-channel configuration (capacity, ordering, TTL, blackout,
//!   priority weight), with field-wise merging when several subscribers
//!   request the same channel
//! - Continuous, clock-driven priorities recomputed on every selection
//! - Bounded capacity with eviction, caller-driven TTL expiry
//! - Fair, last-access-aware arbitration so a persistently high-valued
//!   channel cannot starve its neighbours
//!
//! The buffer is a synchronous, single-threaded, in-memory structure: it
//! performs no I/O, runs no background tasks, and treats TTL as a data
//! property rather than a wait primitive.
//!
//! ## Example
//!
//! ```rust
//! use neritic_core::{BufferConfig, DynamicBuffer};
//! use std::time::Duration;
//!
//! let mut buffer: DynamicBuffer<&str> = DynamicBuffer::new();
//!
//! let cfg = BufferConfig {
//!     ttl: Duration::from_secs(60),
//!     value_base: 10.0,
//!     max_queue: 8,
//!     ..BufferConfig::default()
//! };
//! buffer.create("telemetry", cfg)?;
//! buffer.push("telemetry", "fix 42.36N 71.05W")?;
//!
//! let top = buffer.top()?;
//! assert_eq!(top.channel, "telemetry");
//! assert_eq!(*top.data, "fix 42.36N 71.05W");
//! # Ok::<(), neritic_core::BufferError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod buffer;
pub mod clock;
pub mod config;
pub mod error;
pub mod prelude;

pub use buffer::{BufferMetrics, ChannelEntry, DynamicBuffer, Entry, SubBuffer, TopEntry};
pub use clock::{Clock, ManualClock, MonotonicClock, SimClock};
pub use config::BufferConfig;
pub use error::{BufferError, Result};
