//! Sub-buffer configuration: options, validation, and merge.
//!
//! Every logical channel in a [`DynamicBuffer`](crate::DynamicBuffer) is
//! governed by one *effective* [`BufferConfig`]. When several subscribers
//! request the same channel, the effective configuration is the field-wise
//! merge of everything they supplied; see [`BufferConfig::merged`].

use crate::error::{BufferError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default entry lifetime: 30 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(1800);

/// Configuration for one sub-buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Whether the transport must acknowledge an entry before it is erased
    pub ack_required: bool,

    /// Minimum wall interval between successive selections of this
    /// sub-buffer
    #[serde(with = "duration_ms")]
    pub blackout_time: Duration,

    /// Capacity; pushing past it evicts
    pub max_queue: usize,

    /// Storage order and eviction direction: `true` serves the newest
    /// entry first and evicts the oldest, `false` serves the oldest first
    /// and evicts the entry just pushed
    pub newest_first: bool,

    /// Entry lifetime, measured from enqueue
    #[serde(with = "duration_ms")]
    pub ttl: Duration,

    /// Priority scale constant
    pub value_base: f64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            ack_required: false,
            blackout_time: Duration::ZERO,
            max_queue: 1,
            newest_first: true,
            ttl: DEFAULT_TTL,
            value_base: 1.0,
        }
    }
}

impl BufferConfig {
    /// Validate this configuration.
    ///
    /// # Errors
    /// Returns [`BufferError::InvalidConfig`] when `ttl` is zero,
    /// `max_queue` is zero, or `value_base` is not a positive finite
    /// number. `blackout_time` is unsigned and needs no check.
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(BufferError::InvalidConfig { reason: "ttl must be positive".to_string() });
        }

        if self.max_queue == 0 {
            return Err(BufferError::InvalidConfig {
                reason: "max_queue must be at least 1".to_string(),
            });
        }

        if !self.value_base.is_finite() || self.value_base <= 0.0 {
            return Err(BufferError::InvalidConfig {
                reason: format!("value_base must be positive and finite, got {}", self.value_base),
            });
        }

        Ok(())
    }

    /// Compute the effective configuration over every configuration
    /// supplied for one channel.
    ///
    /// Field-wise rules:
    /// - `ack_required`: logical OR (any requester needing acks wins)
    /// - `newest_first`: logical AND (any requester needing oldest-first
    ///   forces it)
    /// - `blackout_time`: minimum
    /// - `max_queue`: maximum
    /// - `ttl`, `value_base`: arithmetic mean
    ///
    /// The OR/AND/min/max fields are order- and multiplicity-independent;
    /// the averaged fields depend on how many configurations were supplied
    /// but not on their order. Merging a configuration with itself yields
    /// the same configuration.
    ///
    /// # Errors
    /// Returns [`BufferError::InvalidConfig`] when `cfgs` is empty or any
    /// member fails [`validate`](Self::validate).
    pub fn merged(cfgs: &[Self]) -> Result<Self> {
        let Some(first) = cfgs.first() else {
            return Err(BufferError::InvalidConfig {
                reason: "at least one configuration is required".to_string(),
            });
        };

        for cfg in cfgs {
            cfg.validate()?;
        }

        let mut merged = first.clone();
        let mut ttl_total = first.ttl.as_nanos();
        let mut value_base_total = first.value_base;

        for cfg in &cfgs[1..] {
            merged.ack_required |= cfg.ack_required;
            merged.newest_first &= cfg.newest_first;
            merged.blackout_time = merged.blackout_time.min(cfg.blackout_time);
            merged.max_queue = merged.max_queue.max(cfg.max_queue);
            ttl_total += cfg.ttl.as_nanos();
            value_base_total += cfg.value_base;
        }

        let n = cfgs.len();
        merged.ttl = nanos_to_duration(ttl_total / n as u128);
        merged.value_base = value_base_total / n as f64;
        Ok(merged)
    }
}

fn nanos_to_duration(nanos: u128) -> Duration {
    // u64 nanos covers ~584 years of TTL; anything past that saturates.
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Helper module for Duration serialization as milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
