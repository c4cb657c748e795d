//! INA700 digital power monitor
//!
//! 40 V, 5 A power monitor with an integrated shunt. Registers are
//! big-endian; POWER is 24 bits wide, the rest 16. The board fits one per
//! rail at 0x44..=0x47.

use core::ops::RangeInclusive;

use thundervolt_core::i2c::{I2cBus, RegisterAccess};

use crate::error::DriverError;

/// INA700 register addresses
pub mod reg {
    pub const CONFIG: u8 = 0x00;
    pub const ADC_CONFIG: u8 = 0x01;
    /// Bus voltage, 3.125 mV/LSB
    pub const VBUS: u8 = 0x05;
    /// Die temperature, 125 m°C/LSB
    pub const DIETEMP: u8 = 0x06;
    /// Current, 480 µA/LSB
    pub const CURRENT: u8 = 0x07;
    /// Power, 24 bits, 96 µW/LSB
    pub const POWER: u8 = 0x08;
    pub const ENERGY: u8 = 0x09;
    pub const CHARGE: u8 = 0x0A;
    pub const ALERT_DIAG: u8 = 0x0B;
    pub const COL: u8 = 0x0C;
    pub const CUL: u8 = 0x0D;
    pub const BOVL: u8 = 0x0E;
    pub const BUVL: u8 = 0x0F;
    pub const TEMP_LIMIT: u8 = 0x10;
    pub const PWR_LIMIT: u8 = 0x11;
    pub const MANUFACTURER_ID: u8 = 0x3E;
}

/// Value of the manufacturer ID register ("TI")
pub const MANUFACTURER_ID: u16 = 0x5449;

/// Strap-selectable addresses
pub const ADDRESSES: RangeInclusive<u8> = 0x44..=0x47;

const BUS_VOLTAGE_LSB_UV: u32 = 3125;
const DIE_TEMP_LSB_MC: u32 = 125;
const CURRENT_LSB_UA: u32 = 480;
const POWER_LSB_UW: u32 = 96;

/// INA700 at a bus address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ina700 {
    address: u8,
}

impl Ina700 {
    /// Monitor at `address`
    pub const fn new(address: u8) -> Self {
        Self { address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Check the manufacturer ID; any bus failure reads as absent
    pub fn is_present<B: I2cBus>(&self, bus: &mut B) -> bool {
        matches!(
            bus.read_word_be(self.address, reg::MANUFACTURER_ID),
            Ok(MANUFACTURER_ID)
        )
    }

    /// Bus voltage in mV
    pub fn bus_voltage_mv<B: I2cBus>(&self, bus: &mut B) -> Result<u32, DriverError> {
        let raw = bus.read_word_be(self.address, reg::VBUS)?;
        Ok(u32::from(raw) * BUS_VOLTAGE_LSB_UV / 1000)
    }

    /// Die temperature in m°C
    pub fn die_temperature_mc<B: I2cBus>(&self, bus: &mut B) -> Result<u32, DriverError> {
        let raw = bus.read_word_be(self.address, reg::DIETEMP)?;
        Ok(u32::from(raw) * DIE_TEMP_LSB_MC)
    }

    /// Current in mA
    pub fn current_ma<B: I2cBus>(&self, bus: &mut B) -> Result<u32, DriverError> {
        let raw = bus.read_word_be(self.address, reg::CURRENT)?;
        Ok(u32::from(raw) * CURRENT_LSB_UA / 1000)
    }

    /// Power in µW
    pub fn power_uw<B: I2cBus>(&self, bus: &mut B) -> Result<u32, DriverError> {
        let raw = bus.read_u24_be(self.address, reg::POWER)?;
        Ok(raw * POWER_LSB_UW)
    }
}
