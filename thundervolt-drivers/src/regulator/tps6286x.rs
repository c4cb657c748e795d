//! TPS62868/TPS62869 programmable buck regulator
//!
//! Two output voltage registers selected by the VSET pin, 5 mV steps from
//! 400 mV before the chip option's output scaling. The chip has no ID
//! register, so presence is a bus probe.

use core::ops::RangeInclusive;

use thundervolt_core::i2c::{I2cBus, RegisterAccess};

use crate::error::DriverError;

/// TPS6286x register addresses
pub mod reg {
    /// Output voltage with VSET low
    pub const VOUT1: u8 = 0x01;
    /// Output voltage with VSET high
    pub const VOUT2: u8 = 0x02;
    pub const CONTROL: u8 = 0x03;
    pub const STATUS: u8 = 0x05;
}

/// CONTROL register bits
pub mod control {
    pub const RESET: u8 = 1 << 7;
    pub const FORCE_FPWM: u8 = 1 << 6;
    pub const ENABLE: u8 = 1 << 5;
    pub const FPWM: u8 = 1 << 4;
    pub const DISCHARGE: u8 = 1 << 3;
    pub const HICCUP_EN: u8 = 1 << 2;
    pub const SLEW_MASK: u8 = 0x03;
}

/// STATUS register bits
pub mod status {
    pub const THERM: u8 = 1 << 4;
    pub const HICCUP: u8 = 1 << 3;
    pub const UVLO: u8 = 1 << 0;
}

/// Address range of the family
pub const ADDRESSES: RangeInclusive<u8> = 0x40..=0x4F;

/// Factory-fixed address of parts without the address strap
pub const FIXED_ADDRESS: u8 = 0x42;

const VOUT_STEP_MV: u32 = 5;
const VOUT_BASE_MV: u32 = 400;

/// Chip option, which sets the output voltage scaling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipType {
    /// Output scaled by 0.5
    X0A = 0,
    /// Unscaled output
    X1A = 1,
    /// Output scaled by 2
    X2A = 2,
}

impl ChipType {
    /// Output scale as (numerator, denominator)
    pub const fn scale(self) -> (u32, u32) {
        match self {
            ChipType::X0A => (1, 2),
            ChipType::X1A => (1, 1),
            ChipType::X2A => (2, 1),
        }
    }

    /// Millivolts encoded by a VOUT register value
    pub const fn decode_mv(self, vout: u8) -> u16 {
        let (num, den) = self.scale();
        ((vout as u32 * VOUT_STEP_MV + VOUT_BASE_MV) * num / den) as u16
    }

    /// VOUT register value for `mv`, rounded down to the 5 mV grid
    pub fn encode_mv(self, mv: u16) -> Result<u8, DriverError> {
        let (num, den) = self.scale();
        let base = u32::from(mv) * den / num;
        if base < VOUT_BASE_MV {
            return Err(DriverError::InvalidVoltage);
        }
        u8::try_from((base - VOUT_BASE_MV) / VOUT_STEP_MV).map_err(|_| DriverError::InvalidVoltage)
    }
}

impl TryFrom<u8> for ChipType {
    type Error = DriverError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ChipType::X0A),
            1 => Ok(ChipType::X1A),
            2 => Ok(ChipType::X2A),
            _ => Err(DriverError::InvalidScale),
        }
    }
}

/// Output slew rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlewRate {
    /// 20 mV/µs
    V20 = 0,
    /// 10 mV/µs
    V10 = 1,
    /// 5 mV/µs
    V5 = 2,
    /// 1 mV/µs
    #[default]
    V1 = 3,
}

/// Decoded STATUS register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    /// Thermal warning
    pub thermal: bool,
    /// Hiccup short-circuit protection triggered
    pub hiccup: bool,
    /// Input undervoltage lockout
    pub uvlo: bool,
}

impl Status {
    /// Decode a STATUS register value
    pub fn from_register(value: u8) -> Self {
        Self {
            thermal: value & status::THERM != 0,
            hiccup: value & status::HICCUP != 0,
            uvlo: value & status::UVLO != 0,
        }
    }
}

/// TPS6286x at a bus address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tps6286x {
    address: u8,
    chip: ChipType,
}

impl Tps6286x {
    /// Regulator of option `chip` at `address`
    pub const fn new(address: u8, chip: ChipType) -> Self {
        Self { address, chip }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Chip option, which sets the VOUT scale
    pub fn chip(&self) -> ChipType {
        self.chip
    }

    /// Probe the bus; the part has no ID register
    pub fn is_present<B: I2cBus>(&self, bus: &mut B) -> bool {
        bus.detect(self.address)
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

    /// Output voltage in mV with VSET low
    pub fn vout1<B: I2cBus>(&self, bus: &mut B) -> Result<u16, DriverError> {
        self.vout(bus, reg::VOUT1)
    }

    /// Output voltage in mV with VSET high
    pub fn vout2<B: I2cBus>(&self, bus: &mut B) -> Result<u16, DriverError> {
        self.vout(bus, reg::VOUT2)
    }

    /// Set the VSEL-low output voltage, rounded down to the grid
    pub fn set_vout1<B: I2cBus>(&self, bus: &mut B, mv: u16) -> Result<(), DriverError> {
        self.set_vout(bus, reg::VOUT1, mv)
    }

    /// Set the VSEL-high output voltage, rounded down to the grid
    pub fn set_vout2<B: I2cBus>(&self, bus: &mut B, mv: u16) -> Result<(), DriverError> {
        self.set_vout(bus, reg::VOUT2, mv)
    }

    /// Read and decode STATUS
    pub fn status<B: I2cBus>(&self, bus: &mut B) -> Result<Status, DriverError> {
        let value = bus.read_byte(self.address, reg::STATUS)?;
        Ok(Status::from_register(value))
    }

    fn vout<B: I2cBus>(&self, bus: &mut B, reg: u8) -> Result<u16, DriverError> {
        let value = bus.read_byte(self.address, reg)?;
        Ok(self.chip.decode_mv(value))
    }

    fn set_vout<B: I2cBus>(&self, bus: &mut B, reg: u8, mv: u16) -> Result<(), DriverError> {
        let value = self.chip.encode_mv(mv)?;
        bus.write_byte(self.address, reg, value)?;
        Ok(())
    }
}
