//! TPS63810/TPS63811 programmable buck-boost regulator
//!
//! Output voltage is set in 25 mV steps from a base that depends on the
//! RANGE bit of CONTROL, so every VOUT access reads CONTROL first.

use core::ops::RangeInclusive;

use thundervolt_core::i2c::{I2cBus, RegisterAccess};

use crate::error::DriverError;

/// TPS6381x register addresses
pub mod reg {
    pub const CONTROL: u8 = 0x01;
    pub const STATUS: u8 = 0x02;
    pub const DEVID: u8 = 0x03;
    /// Output voltage with VSEL low
    pub const VOUT1: u8 = 0x04;
    /// Output voltage with VSEL high
    pub const VOUT2: u8 = 0x05;
}

/// CONTROL register bits
pub mod control {
    pub const RANGE: u8 = 1 << 6;
    pub const ENABLE: u8 = 1 << 5;
    pub const FPWM: u8 = 1 << 3;
    pub const RPWM: u8 = 1 << 2;
    pub const SLEW_MASK: u8 = 0x03;
}

/// STATUS register bits
pub mod status {
    /// Thermal shutdown
    pub const TSD: u8 = 1 << 1;
    /// Power good
    pub const PG: u8 = 1 << 0;
}

/// Fixed bus address
pub const ADDRESS: u8 = 0x75;

/// Value of the DEVID register
pub const DEVICE_ID: u8 = 0x04;

const VOUT_STEP_MV: u16 = 25;

/// Output voltage range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Range {
    /// 1.800 V to 4.975 V
    #[default]
    Low,
    /// 2.025 V to 5.200 V
    High,
}

impl Range {
    /// Settable output window in mV
    pub const fn window_mv(self) -> RangeInclusive<u16> {
        match self {
            Range::Low => 1800..=4975,
            Range::High => 2025..=5200,
        }
    }

    const fn bits(self) -> u8 {
        match self {
            Range::Low => 0,
            Range::High => control::RANGE,
        }
    }

    fn from_control(value: u8) -> Self {
        if value & control::RANGE != 0 {
            Range::High
        } else {
            Range::Low
        }
    }

    /// Millivolts encoded by a VOUT register value
    pub fn decode_mv(self, vout: u8) -> u16 {
        *self.window_mv().start() + u16::from(vout) * VOUT_STEP_MV
    }

    /// VOUT register value for `mv`, rounded down to the 25 mV grid
    pub fn encode_mv(self, mv: u16) -> Result<u8, DriverError> {
        let window = self.window_mv();
        if !window.contains(&mv) {
            return Err(DriverError::InvalidVoltage);
        }
        // The window spans 127 steps, so this fits
        Ok(((mv - window.start()) / VOUT_STEP_MV) as u8)
    }
}

/// Output slew rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlewRate {
    /// 1 V/ms
    #[default]
    V1 = 0,
    /// 2.5 V/ms
    V2_5 = 1,
    /// 5 V/ms
    V5 = 2,
    /// 10 V/ms
    V10 = 3,
}

/// Decoded STATUS register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    pub thermal_shutdown: bool,
    pub power_good: bool,
}

impl Status {
    /// Decode a STATUS register value
    pub fn from_register(value: u8) -> Self {
        Self {
            thermal_shutdown: value & status::TSD != 0,
            power_good: value & status::PG != 0,
        }
    }
}

/// TPS6381x regulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tps6381x {
    address: u8,
}

impl Default for Tps6381x {
    fn default() -> Self {
        Self::new(ADDRESS)
    }
}

impl Tps6381x {
    /// Regulator at `address`
    pub const fn new(address: u8) -> Self {
        Self { address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Check the device ID; any bus failure reads as absent
    pub fn is_present<B: I2cBus>(&self, bus: &mut B) -> bool {
        matches!(bus.read_byte(self.address, reg::DEVID), Ok(DEVICE_ID))
    }

    /// Turn the output on or off
    pub fn enable<B: I2cBus>(&self, bus: &mut B, enabled: bool) -> Result<(), DriverError> {
        let value = if enabled { control::ENABLE } else { 0 };
        bus.update_byte(self.address, reg::CONTROL, control::ENABLE, value)?;
        Ok(())
    }

    /// Set the output slew rate
    pub fn set_slew_rate<B: I2cBus>(&self, bus: &mut B, rate: SlewRate) -> Result<(), DriverError> {
        bus.update_byte(self.address, reg::CONTROL, control::SLEW_MASK, rate as u8)?;
        Ok(())
    }

    /// Output range selected in CONTROL
    pub fn range<B: I2cBus>(&self, bus: &mut B) -> Result<Range, DriverError> {
        let value = bus.read_byte(self.address, reg::CONTROL)?;
        Ok(Range::from_control(value))
    }

    /// Select the output range; VOUT registers keep their raw value
    pub fn set_range<B: I2cBus>(&self, bus: &mut B, range: Range) -> Result<(), DriverError> {
        bus.update_byte(self.address, reg::CONTROL, control::RANGE, range.bits())?;
        Ok(())
    }

    /// Read and decode STATUS
    pub fn status<B: I2cBus>(&self, bus: &mut B) -> Result<Status, DriverError> {
        let value = bus.read_byte(self.address, reg::STATUS)?;
        Ok(Status::from_register(value))
    }

    /// Output voltage in mV with VSEL low
    pub fn vout1<B: I2cBus>(&self, bus: &mut B) -> Result<u16, DriverError> {
        self.vout(bus, reg::VOUT1)
    }

    /// Output voltage in mV with VSEL high
    pub fn vout2<B: I2cBus>(&self, bus: &mut B) -> Result<u16, DriverError> {
        self.vout(bus, reg::VOUT2)
    }

    /// Set the VSEL-low output voltage within the current range
    pub fn set_vout1<B: I2cBus>(&self, bus: &mut B, mv: u16) -> Result<(), DriverError> {
        self.set_vout(bus, reg::VOUT1, mv)
    }

    /// Set the VSEL-high output voltage within the current range
    pub fn set_vout2<B: I2cBus>(&self, bus: &mut B, mv: u16) -> Result<(), DriverError> {
        self.set_vout(bus, reg::VOUT2, mv)
    }

    fn vout<B: I2cBus>(&self, bus: &mut B, reg: u8) -> Result<u16, DriverError> {
        let range = self.range(bus)?;
        let value = bus.read_byte(self.address, reg)?;
        Ok(range.decode_mv(value))
    }

    fn set_vout<B: I2cBus>(&self, bus: &mut B, reg: u8, mv: u16) -> Result<(), DriverError> {
        let range = self.range(bus)?;
        let value = range.encode_mv(mv)?;
        bus.write_byte(self.address, reg, value)?;
        Ok(())
    }
}
