//! Bus transport configuration types
//!
//! Timing parameters for the bit-banged and TWI transports.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use thundervolt_hal::i2c::Mode;

/// Nanoseconds per second
const NS_PER_SECOND: u64 = 1_000_000_000;

/// Default number of SCL samples taken when probing the drive discipline
pub const DEFAULT_PROBE_SAMPLES: u16 = 100;

/// Bit-banged transport configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BitBangConfig {
    /// Tick counter frequency in Hz
    pub tick_hz: u32,
    /// Ticks subtracted from every delay (call overhead, rise time)
    pub overhead_ticks: u32,
    /// Maximum ticks to wait for a stretched clock, `None` waits forever
    pub stretch_timeout_ticks: Option<u32>,
    /// SCL samples taken when probing for open-drain operation
    pub probe_samples: u16,
}

impl BitBangConfig {
    /// Create a config for a timebase running at `tick_hz`
    pub const fn new(tick_hz: u32) -> Self {
        Self {
            tick_hz,
            overhead_ticks: 18,
            stretch_timeout_ticks: None,
            probe_samples: DEFAULT_PROBE_SAMPLES,
        }
    }

    /// Set the per-delay overhead compensation
    pub const fn with_overhead(mut self, ticks: u32) -> Self {
        self.overhead_ticks = ticks;
        self
    }

    /// Bound clock-stretch waits
    pub const fn with_stretch_timeout(mut self, ticks: u32) -> Self {
        self.stretch_timeout_ticks = Some(ticks);
        self
    }

    /// Set the number of drive-discipline probe samples
    pub const fn with_probe_samples(mut self, samples: u16) -> Self {
        self.probe_samples = samples;
        self
    }

    /// Convert nanoseconds to ticks, minus the overhead
    pub const fn ns_to_ticks(&self, ns: u32) -> u32 {
        let ticks = (ns as u64 * self.tick_hz as u64) / NS_PER_SECOND;
        let ticks = if ticks > u32::MAX as u64 {
            u32::MAX
        } else {
            ticks as u32
        };
        ticks.saturating_sub(self.overhead_ticks)
    }

    /// Derive bit timing for a bus mode
    pub const fn timing(&self, mode: Mode) -> BitTiming {
        BitTiming {
            half_ticks: self.ns_to_ticks(mode.half_period_ns()),
            quarter_ticks: self.ns_to_ticks(mode.quarter_period_ns()),
        }
    }
}

impl Default for BitBangConfig {
    /// 60.75 MHz timebase
    fn default() -> Self {
        Self::new(60_750_000)
    }
}

/// Calibrated bit-banged delays, in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitTiming {
    /// Half SCL period (clock high time)
    pub half_ticks: u32,
    /// Quarter SCL period (setup and hold around clock edges)
    pub quarter_ticks: u32,
}

/// TWI peripheral transport configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TwiConfig {
    /// Peripheral clock in Hz
    pub cpu_hz: u32,
    /// Delay after enabling the peripheral, in milliseconds
    pub settle_ms: u32,
    /// Maximum status polls per wait, `None` polls forever
    pub poll_limit: Option<u32>,
}

impl TwiConfig {
    /// Create a config for a peripheral clocked at `cpu_hz`
    pub const fn new(cpu_hz: u32) -> Self {
        Self {
            cpu_hz,
            settle_ms: 5,
            poll_limit: None,
        }
    }

    /// Bound every status poll
    pub const fn with_poll_limit(mut self, polls: u32) -> Self {
        self.poll_limit = Some(polls);
        self
    }

    /// Set the post-enable settle delay
    pub const fn with_settle_ms(mut self, ms: u32) -> Self {
        self.settle_ms = ms;
        self
    }

    /// Baud register value for a bus mode
    ///
    /// `((cpu_hz / f) - 10) / 2`, clamped to the register range. Rise time
    /// is not accounted for.
    pub const fn baud(&self, mode: Mode) -> u8 {
        let baud = ((self.cpu_hz / mode.frequency()) as i64 - 10) / 2;
        if baud < 0 {
            0
        } else if baud > u8::MAX as i64 {
            u8::MAX
        } else {
            baud as u8
        }
    }
}

impl Default for TwiConfig {
    /// 20 MHz peripheral clock, 5 ms settle, unbounded polls
    fn default() -> Self {
        Self::new(20_000_000)
    }
}
