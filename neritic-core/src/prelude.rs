//! Re-exports of the types most callers need.

pub use crate::buffer::{ChannelEntry, DynamicBuffer, Entry, SubBuffer, TopEntry};
pub use crate::clock::{Clock, ManualClock, MonotonicClock, SimClock};
pub use crate::config::BufferConfig;
pub use crate::error::{BufferError, Result};
