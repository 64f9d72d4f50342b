//! Beacon application configuration
//!
//! One explicit, validated struct passed at construction. Defaults match the
//! classic vehicular beacon profile: 100 ms interval, a one-time startup
//! jitter drawn from [50 µs, 200 µs), 1000-byte payloads, control channel at
//! highest priority and maximum power.

use crate::frame::TxParams;
use serde::Deserialize;
use std::time::Duration;

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("broadcast interval must be non-zero")]
    ZeroInterval,
    #[error("jitter range is inverted: min {min:?} exceeds max {max:?}")]
    InvertedJitter { min: Duration, max: Duration },
    #[error("packet size must be non-zero")]
    ZeroPacketSize,
}

/// Half-open window `[min, max)` the one-time startup offset is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct JitterRange {
    pub min: Duration,
    pub max: Duration,
}

impl JitterRange {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Draw a uniform offset from `[min, max)`. A degenerate window
    /// (`min == max`) yields `min`.
    pub fn sample(&self, rng: &mut impl rand::Rng) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let micros = rng.gen_range(self.min.as_micros() as u64..self.max.as_micros() as u64);
        Duration::from_micros(micros)
    }
}

/// Beacon application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BeaconConfig {
    /// Nominal period between broadcasts.
    pub interval: Duration,
    /// One-time randomization window added to the first interval, to
    /// desynchronize co-located senders at startup.
    pub jitter: JitterRange,
    /// Fixed payload byte count for every beacon.
    pub packet_size: usize,
    /// Fixed transmit parameters for every beacon.
    pub tx: TxParams,
    /// Seed for the jitter random source, for reproducible runs.
    pub seed: u64,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            jitter: JitterRange::new(Duration::from_micros(50), Duration::from_micros(200)),
            packet_size: 1000,
            tx: TxParams::default(),
            seed: 42,
        }
    }
}

impl BeaconConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_jitter(mut self, min: Duration, max: Duration) -> Self {
        self.jitter = JitterRange::new(min, max);
        self
    }

    pub fn with_packet_size(mut self, packet_size: usize) -> Self {
        self.packet_size = packet_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check the configuration invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.jitter.min > self.jitter.max {
            return Err(ConfigError::InvertedJitter {
                min: self.jitter.min,
                max: self.jitter.max,
            });
        }
        if self.packet_size == 0 {
            return Err(ConfigError::ZeroPacketSize);
        }
        Ok(())
    }
}
