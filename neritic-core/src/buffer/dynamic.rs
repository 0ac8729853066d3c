//! The outbound store: named sub-buffers plus arbitration.

use crate::buffer::sub::{Entry, SubBuffer};
use crate::clock::{Clock, MonotonicClock};
use crate::config::BufferConfig;
use crate::error::{BufferError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, trace};

/// Priorities closer together than this are treated as tied and resolved
/// by last-access age, then by name.
const VALUE_EPSILON: f64 = 1e-9;

/// An entry that has left the buffer, tagged with the channel it came
/// from. Returned by eviction, expiry, and channel removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEntry<T> {
    /// Name of the sub-buffer the entry lived in
    pub channel: String,
    /// Monotonic instant at which the payload entered the buffer
    pub pushed_at: Instant,
    /// The payload itself
    pub data: T,
}

/// Borrowed view of the entry selected by [`DynamicBuffer::top`].
///
/// The payload stays in the buffer; callers transmit from the borrow and
/// call [`erase`](DynamicBuffer::erase) with the same coordinates once the
/// link acknowledges (or immediately, for best-effort channels).
#[derive(Debug, Clone, Copy)]
pub struct TopEntry<'a, T> {
    /// Name of the selected sub-buffer
    pub channel: &'a str,
    /// Monotonic instant at which the payload entered the buffer
    pub pushed_at: Instant,
    /// The payload to transmit next
    pub data: &'a T,
}

/// Running operation counters for one buffer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferMetrics {
    /// Entries accepted by `push`
    pub pushed: u64,
    /// Entries handed out by `top`
    pub dispatched: u64,
    /// Entries forced out by capacity
    pub evicted: u64,
    /// Entries drained by `expire`
    pub expired: u64,
    /// Entries removed by `erase`
    pub erased: u64,
}

/// A named collection of [`SubBuffer`]s with priority arbitration.
///
/// Producers push into named channels; the link driver repeatedly asks
/// [`top`](Self::top) which entry the link should carry next. Selection
/// takes the channel with the highest current priority, skipping empty
/// channels and channels inside their blackout interval. Ties go to the
/// channel served least recently, then to the lexicographically smaller
/// name, which yields a deterministic round-robin between channels with
/// identical configurations.
///
/// The structure is single-threaded and synchronous; callers sharing one
/// across threads must serialize access externally.
#[derive(Debug)]
pub struct DynamicBuffer<T, C: Clock = MonotonicClock> {
    subs: HashMap<String, SubBuffer<T, C>>,
    /// Channel names in creation order; drives expire ordering.
    order: Vec<String>,
    clock: C,
    metrics: BufferMetrics,
}

impl<T> DynamicBuffer<T, MonotonicClock> {
    /// Create an empty buffer on the real monotonic clock.
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock)
    }
}

impl<T> Default for DynamicBuffer<T, MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C: Clock> DynamicBuffer<T, C> {
    /// Create an empty buffer on an explicit clock.
    pub fn with_clock(clock: C) -> Self {
        Self { subs: HashMap::new(), order: Vec::new(), clock, metrics: BufferMetrics::default() }
    }

    /// Create a sub-buffer, or fold another requested configuration into
    /// an existing one.
    ///
    /// On a repeated name the stored configuration becomes the merge of
    /// everything ever supplied for it (see [`BufferConfig::merged`]);
    /// resident entries survive, and any beyond the recomputed capacity
    /// come back evicted.
    ///
    /// # Errors
    /// Returns [`BufferError::InvalidConfig`] when the configuration fails
    /// validation; an existing sub-buffer is left untouched.
    pub fn create(
        &mut self,
        channel: impl Into<String>,
        cfg: BufferConfig,
    ) -> Result<Vec<ChannelEntry<T>>> {
        self.create_merged(channel, vec![cfg])
    }

    /// [`create`](Self::create) with several requested configurations at
    /// once.
    ///
    /// # Errors
    /// Returns [`BufferError::InvalidConfig`] when `cfgs` is empty or any
    /// member fails validation.
    pub fn create_merged(
        &mut self,
        channel: impl Into<String>,
        cfgs: Vec<BufferConfig>,
    ) -> Result<Vec<ChannelEntry<T>>> {
        let channel = channel.into();

        if let Some(sub) = self.subs.get_mut(&channel) {
            let evicted = sub.merge_cfgs(cfgs)?;
            self.metrics.evicted += evicted.len() as u64;
            debug!(channel = %channel, cfg = ?sub.cfg(), "merged sub-buffer configuration");
            return Ok(tag_entries(&channel, evicted));
        }

        let sub = SubBuffer::with_clock(cfgs, self.clock.clone())?;
        debug!(channel = %channel, cfg = ?sub.cfg(), "created sub-buffer");
        self.subs.insert(channel.clone(), sub);
        self.order.push(channel);
        Ok(Vec::new())
    }

    /// Push a payload into a named channel, stamped with the current
    /// instant.
    ///
    /// # Errors
    /// Returns [`BufferError::UnknownSubBuffer`] when the channel was never
    /// created.
    pub fn push(&mut self, channel: &str, data: T) -> Result<Vec<ChannelEntry<T>>> {
        let now = self.clock.now();
        self.push_at(channel, now, data)
    }

    /// Push a payload with an explicit enqueue instant.
    ///
    /// Returns the entries the push evicted, tagged with the channel name.
    ///
    /// # Errors
    /// Returns [`BufferError::UnknownSubBuffer`] when the channel was never
    /// created.
    pub fn push_at(
        &mut self,
        channel: &str,
        pushed_at: Instant,
        data: T,
    ) -> Result<Vec<ChannelEntry<T>>> {
        let sub = self
            .subs
            .get_mut(channel)
            .ok_or_else(|| BufferError::UnknownSubBuffer { name: channel.to_string() })?;

        let evicted = sub.push_at(pushed_at, data);
        self.metrics.pushed += 1;
        self.metrics.evicted += evicted.len() as u64;
        trace!(channel, evicted = evicted.len(), "pushed entry");
        Ok(tag_entries(channel, evicted))
    }

    /// Select the entry the link should carry next.
    ///
    /// Scans every sub-buffer once (the population is small), skipping
    /// empty channels and channels whose blackout interval has not yet
    /// elapsed, and takes the highest [`top_value`](SubBuffer::top_value).
    /// Priorities are a continuous function of the clock, so they are
    /// recomputed here on every call rather than cached. The winning
    /// channel's `last_access` is reset, which restarts its priority
    /// growth.
    ///
    /// # Errors
    /// Returns [`BufferError::NothingAvailable`] when every sub-buffer is
    /// empty or blacked out.
    pub fn top(&mut self) -> Result<TopEntry<'_, T>> {
        let now = self.clock.now();
        let mut best: Option<(usize, f64, Instant)> = None;

        for (index, name) in self.order.iter().enumerate() {
            let Some(sub) = self.subs.get(name) else { continue };
            if sub.is_empty() {
                continue;
            }
            if now.duration_since(sub.last_access()) < sub.cfg().blackout_time {
                continue;
            }

            let value = sub.value_at(now);
            let wins = match best {
                None => true,
                Some((best_index, best_value, best_access)) => {
                    if value > best_value + VALUE_EPSILON {
                        true
                    } else if value < best_value - VALUE_EPSILON {
                        false
                    } else if sub.last_access() != best_access {
                        sub.last_access() < best_access
                    } else {
                        name.as_str() < self.order[best_index].as_str()
                    }
                }
            };

            if wins {
                best = Some((index, value, sub.last_access()));
            }
        }

        let (index, value, _) = best.ok_or(BufferError::NothingAvailable)?;
        let channel = self.order[index].as_str();
        let sub = self
            .subs
            .get_mut(channel)
            .ok_or_else(|| BufferError::UnknownSubBuffer { name: channel.to_string() })?;

        let (pushed_at, data) = sub.top()?;
        self.metrics.dispatched += 1;
        trace!(channel, value, "selected entry for transmission");
        Ok(TopEntry { channel, pushed_at, data })
    }

    /// Remove the first entry in the named channel equal to
    /// `(pushed_at, data)`. Returns whether one was removed.
    ///
    /// # Errors
    /// Returns [`BufferError::UnknownSubBuffer`] when the channel was never
    /// created.
    pub fn erase(&mut self, channel: &str, pushed_at: Instant, data: &T) -> Result<bool>
    where
        T: PartialEq,
    {
        let sub = self
            .subs
            .get_mut(channel)
            .ok_or_else(|| BufferError::UnknownSubBuffer { name: channel.to_string() })?;

        let removed = sub.erase(pushed_at, data);
        if removed {
            self.metrics.erased += 1;
            trace!(channel, "erased entry");
        }
        Ok(removed)
    }

    /// Drain every TTL-exceeded entry across all channels.
    ///
    /// Channels are visited in creation order; within one channel the
    /// returned entries keep their storage order.
    pub fn expire(&mut self) -> Vec<ChannelEntry<T>> {
        let now = self.clock.now();
        let mut expired = Vec::new();

        for name in &self.order {
            let Some(sub) = self.subs.get_mut(name) else { continue };
            for entry in sub.expire_at(now) {
                expired.push(ChannelEntry {
                    channel: name.clone(),
                    pushed_at: entry.pushed_at,
                    data: entry.data,
                });
            }
        }

        self.metrics.expired += expired.len() as u64;
        expired
    }

    /// Drop a whole sub-buffer, returning its resident entries, or `None`
    /// if the name is unknown.
    pub fn remove(&mut self, channel: &str) -> Option<Vec<ChannelEntry<T>>> {
        let sub = self.subs.remove(channel)?;
        self.order.retain(|name| name != channel);
        debug!(channel, "removed sub-buffer");
        Some(tag_entries(channel, sub.into_entries()))
    }

    /// Total number of entries across all channels.
    pub fn len(&self) -> usize {
        self.subs.values().map(SubBuffer::len).sum()
    }

    /// Whether every channel is empty.
    pub fn is_empty(&self) -> bool {
        self.subs.values().all(SubBuffer::is_empty)
    }

    /// Whether the named channel exists.
    pub fn contains(&self, channel: &str) -> bool {
        self.subs.contains_key(channel)
    }

    /// Channel names in creation order.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Read-only access to a channel, e.g. to consult
    /// `cfg().ack_required` before deciding when to erase.
    pub fn sub_buffer(&self, channel: &str) -> Option<&SubBuffer<T, C>> {
        self.subs.get(channel)
    }

    /// Running operation counters.
    pub fn metrics(&self) -> &BufferMetrics {
        &self.metrics
    }
}

fn tag_entries<T>(
    channel: &str,
    entries: impl IntoIterator<Item = Entry<T>>,
) -> Vec<ChannelEntry<T>> {
    entries
        .into_iter()
        .map(|entry| ChannelEntry {
            channel: channel.to_string(),
            pushed_at: entry.pushed_at,
            data: entry.data,
        })
        .collect()
}
