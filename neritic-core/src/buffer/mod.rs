//! Priority-arbitrated outbound buffering.
//!
//! Two composed pieces: [`SubBuffer`] holds one logical channel's entries
//! under one effective configuration, and [`DynamicBuffer`] arbitrates
//! across named sub-buffers to decide which entry a constrained link
//! should carry next.

pub mod dynamic;
pub mod sub;

pub use dynamic::{BufferMetrics, ChannelEntry, DynamicBuffer, TopEntry};
pub use sub::{Entry, Evicted, SubBuffer};
