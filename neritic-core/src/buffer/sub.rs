//! A single logical channel: ordered entries under one effective
//! configuration.

use crate::clock::{Clock, MonotonicClock};
use crate::config::BufferConfig;
use crate::error::{BufferError, Result};
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::time::Instant;
use tracing::trace;

/// One buffered payload with its enqueue instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<T> {
    /// Monotonic instant at which the payload entered the buffer
    pub pushed_at: Instant,
    /// The payload itself
    pub data: T,
}

/// Entries forced out by a capacity overrun. A single push evicts at most
/// one entry, so this stays on the stack.
pub type Evicted<T> = SmallVec<[Entry<T>; 1]>;

/// One named channel's queue inside a
/// [`DynamicBuffer`](crate::DynamicBuffer).
///
/// Entries live in a deque whose *front* is always the serving end: the
/// newest entry when `newest_first`, the oldest otherwise. Capacity
/// eviction therefore always pops from the back, which is the oldest entry
/// under `newest_first` and the just-pushed entry under oldest-first (an
/// oldest-first queue prefers the data it already holds).
///
/// The sub-buffer's priority grows linearly with the time since it was
/// last served, normalized by its TTL so a channel whose entries are about
/// to age out becomes urgent, and scaled by `value_base`.
#[derive(Debug, Clone)]
pub struct SubBuffer<T, C: Clock = MonotonicClock> {
    cfg: BufferConfig,
    sources: Vec<BufferConfig>,
    entries: VecDeque<Entry<T>>,
    last_access: Instant,
    created: Instant,
    clock: C,
}

impl<T> SubBuffer<T, MonotonicClock> {
    /// Create a channel from a single configuration on the real clock.
    ///
    /// # Errors
    /// Returns [`BufferError::InvalidConfig`] when the configuration fails
    /// validation.
    pub fn new(cfg: BufferConfig) -> Result<Self> {
        Self::with_clock(vec![cfg], MonotonicClock)
    }

    /// Create a channel from several requested configurations, storing
    /// their merge, on the real clock.
    ///
    /// # Errors
    /// Returns [`BufferError::InvalidConfig`] when `cfgs` is empty or any
    /// member fails validation.
    pub fn merged(cfgs: Vec<BufferConfig>) -> Result<Self> {
        Self::with_clock(cfgs, MonotonicClock)
    }
}

impl<T> Default for SubBuffer<T, MonotonicClock> {
    fn default() -> Self {
        let clock = MonotonicClock;
        let now = clock.now();
        Self {
            cfg: BufferConfig::default(),
            sources: vec![BufferConfig::default()],
            entries: VecDeque::new(),
            last_access: now,
            created: now,
            clock,
        }
    }
}

impl<T, C: Clock> SubBuffer<T, C> {
    /// Create a channel on an explicit clock.
    ///
    /// `last_access` starts at the creation instant, so a freshly created
    /// channel carries zero accumulated urgency and cannot jump ahead of
    /// long-established peers.
    ///
    /// # Errors
    /// Returns [`BufferError::InvalidConfig`] when `cfgs` is empty or any
    /// member fails validation.
    pub fn with_clock(cfgs: Vec<BufferConfig>, clock: C) -> Result<Self> {
        let cfg = BufferConfig::merged(&cfgs)?;
        let now = clock.now();
        Ok(Self { cfg, sources: cfgs, entries: VecDeque::new(), last_access: now, created: now, clock })
    }

    /// Fold additional requested configurations into the effective one.
    ///
    /// Every configuration ever supplied for this channel is retained, and
    /// the effective configuration is recomputed over the whole set, so the
    /// averaged fields come out the same however the requests were grouped.
    /// Entries beyond the recomputed capacity are evicted from the back.
    ///
    /// # Errors
    /// Returns [`BufferError::InvalidConfig`] when any new configuration
    /// fails validation; in that case nothing is merged.
    pub fn merge_cfgs(&mut self, cfgs: Vec<BufferConfig>) -> Result<Evicted<T>> {
        for cfg in &cfgs {
            cfg.validate()?;
        }

        self.sources.extend(cfgs);
        self.cfg = BufferConfig::merged(&self.sources)?;
        Ok(self.shrink_to_capacity())
    }

    /// Insert a payload stamped with the current instant.
    pub fn push(&mut self, data: T) -> Evicted<T> {
        let now = self.clock.now();
        self.push_at(now, data)
    }

    /// Insert a payload with an explicit enqueue instant.
    ///
    /// Used by callers replaying a recorded timeline; the entry behaves
    /// exactly as if it had been pushed at `pushed_at`.
    pub fn push_at(&mut self, pushed_at: Instant, data: T) -> Evicted<T> {
        let entry = Entry { pushed_at, data };
        if self.cfg.newest_first {
            self.entries.push_front(entry);
        } else {
            self.entries.push_back(entry);
        }
        self.shrink_to_capacity()
    }

    /// The entry the channel would serve next, without removing it.
    ///
    /// Resets `last_access` to the current instant, which restarts priority
    /// growth from zero. [`top_value`](Self::top_value) deliberately does
    /// not do this, so polling the priority is free of side effects.
    ///
    /// # Errors
    /// Returns [`BufferError::EmptyBuffer`] when no entries are queued.
    pub fn top(&mut self) -> Result<(Instant, &T)> {
        let now = self.clock.now();
        let entry = self.entries.front().ok_or(BufferError::EmptyBuffer)?;
        self.last_access = now;
        Ok((entry.pushed_at, &entry.data))
    }

    /// Current priority of this channel.
    ///
    /// `value_base × warp × (now − last_access) / ttl`, or negative
    /// infinity when the channel is empty. Does not touch `last_access`.
    pub fn top_value(&self) -> f64 {
        self.value_at(self.clock.now())
    }

    pub(crate) fn value_at(&self, now: Instant) -> f64 {
        if self.entries.is_empty() {
            return f64::NEG_INFINITY;
        }

        let elapsed = now.duration_since(self.last_access).as_secs_f64();
        self.cfg.value_base * self.clock.warp_factor() * elapsed / self.cfg.ttl.as_secs_f64()
    }

    /// Remove and return the entry [`top`](Self::top) would serve.
    ///
    /// # Errors
    /// Returns [`BufferError::EmptyBuffer`] when no entries are queued.
    pub fn pop(&mut self) -> Result<Entry<T>> {
        self.entries.pop_front().ok_or(BufferError::EmptyBuffer)
    }

    /// Remove the first entry equal to `(pushed_at, data)` in storage
    /// order. Returns whether one was removed.
    pub fn erase(&mut self, pushed_at: Instant, data: &T) -> bool
    where
        T: PartialEq,
    {
        match self.entries.iter().position(|e| e.pushed_at == pushed_at && e.data == *data) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove and return every entry older than the TTL.
    ///
    /// Survivors keep their storage order, as do the returned entries.
    pub fn expire(&mut self) -> Vec<Entry<T>> {
        let now = self.clock.now();
        self.expire_at(now)
    }

    pub(crate) fn expire_at(&mut self, now: Instant) -> Vec<Entry<T>> {
        // Entries pushed with explicit instants may sit out of time order,
        // so the whole deque is scanned rather than just the old end.
        let ttl = self.cfg.ttl;
        let mut expired = Vec::new();
        let mut kept = VecDeque::with_capacity(self.entries.len());

        for entry in self.entries.drain(..) {
            if now.duration_since(entry.pushed_at) > ttl {
                expired.push(entry);
            } else {
                kept.push_back(entry);
            }
        }

        self.entries = kept;
        if !expired.is_empty() {
            trace!(count = expired.len(), "entries aged out");
        }
        expired
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the channel holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The effective (merged) configuration.
    pub fn cfg(&self) -> &BufferConfig {
        &self.cfg
    }

    /// Instant of the most recent [`top`](Self::top), or the creation
    /// instant if the channel has never been served.
    pub fn last_access(&self) -> Instant {
        self.last_access
    }

    /// The channel's creation instant.
    pub fn created(&self) -> Instant {
        self.created
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = Entry<T>> {
        self.entries.into_iter()
    }

    fn shrink_to_capacity(&mut self) -> Evicted<T> {
        let mut evicted = Evicted::new();
        while self.entries.len() > self.cfg.max_queue {
            if let Some(entry) = self.entries.pop_back() {
                evicted.push(entry);
            }
        }
        evicted
    }
}
