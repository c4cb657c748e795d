//! Thundervolt power-control board
//!
//! The board answers at 0x48 with a small register file of its own and
//! carries four regulated rails, a temperature sensor and (on HW2) one
//! power monitor per rail on the same bus. [`Thundervolt`] owns the bus and
//! routes each request to the right chip for the hardware revision.

use core::ops::RangeInclusive;

use thundervolt_core::i2c::{I2cBus, RegisterAccess};

use crate::error::DriverError;
use crate::monitor::Ina700;
use crate::regulator::tps6286x::{ChipType, Tps6286x};
use crate::regulator::tps6381x::{self, Tps6381x};
use crate::sensor::Tmp1075;

/// Target-mode address of the board controller
pub const ADDRESS: u8 = 0x48;

/// Board controller registers
pub mod reg {
    /// Configuration (RW)
    pub const CONFIG: u8 = 0x00;
    /// Status (R)
    pub const STATUS: u8 = 0x01;
    /// Persisted rail voltages, little-endian words (RW)
    pub const VPERS_1V0_L: u8 = 0x02;
    pub const VPERS_1V0_H: u8 = 0x03;
    pub const VPERS_1V15_L: u8 = 0x04;
    pub const VPERS_1V15_H: u8 = 0x05;
    pub const VPERS_1V8_L: u8 = 0x06;
    pub const VPERS_1V8_H: u8 = 0x07;
    pub const VPERS_3V3_L: u8 = 0x08;
    pub const VPERS_3V3_H: u8 = 0x09;
    /// Over-temperature shutdown limit in °C (RW)
    pub const OTSD_TEMP: u8 = 0x0A;
    /// Hardware revision (R)
    pub const HWREV: u8 = 0x0B;
    /// Software revision (R)
    pub const SWREV: u8 = 0x0C;
}

/// Number of board controller registers
pub const NUM_REGISTERS: usize = 13;

/// CONFIG register bits
pub mod config {
    /// Onboard LED enabled
    pub const LED: u8 = 1 << 2;
    /// Over-temperature shutdown enabled
    pub const OTSD: u8 = 1 << 1;
    /// Restore persisted defaults (write only)
    pub const CLEAR: u8 = 1 << 0;
}

/// STATUS register bits
pub mod status {
    /// Safe-mode jumper fitted, stock voltages in use
    pub const SAFEMODE: u8 = 1 << 0;
}

/// Over-temperature limit used until one is persisted, in °C
pub const DEFAULT_OTSD_LIMIT: i8 = 70;

/// Gap between the alert and release thresholds, in °C
const OTSD_HYSTERESIS: f32 = 5.0;

/// Child device addresses
mod addr {
    pub const REG_1V0_HW1: u8 = 0x43;
    pub const REG_1V15_HW1: u8 = 0x46;
    pub const REG_1V0_HW2: u8 = 0x42;
    pub const REG_1V15_HW2: u8 = 0x43;
    pub const REG_1V8: u8 = 0x41;
    pub const TMP: u8 = 0x49;
}

/// Board hardware revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HardwareRevision {
    Hw1 = 1,
    /// Adds per-rail power monitoring
    Hw2 = 2,
    Lite = 3,
}

impl TryFrom<u8> for HardwareRevision {
    type Error = DriverError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(HardwareRevision::Hw1),
            2 => Ok(HardwareRevision::Hw2),
            3 => Ok(HardwareRevision::Lite),
            _ => Err(DriverError::UnknownRevision),
        }
    }
}

/// Regulated supply rail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rail {
    V1_0 = 0,
    V1_15 = 1,
    V1_8 = 2,
    V3_3 = 3,
}

impl Rail {
    /// Every rail, in power-on order
    pub const ALL: [Rail; 4] = [Rail::V1_0, Rail::V1_15, Rail::V1_8, Rail::V3_3];

    /// Lowest allowed voltage in mV
    pub const fn min_mv(self) -> u16 {
        match self {
            Rail::V1_0 => 750,
            Rail::V1_15 => 850,
            Rail::V1_8 => 1300,
            Rail::V3_3 => 2950,
        }
    }

    /// Stock voltage in mV, also the highest allowed
    pub const fn stock_mv(self) -> u16 {
        match self {
            Rail::V1_0 => 1000,
            Rail::V1_15 => 1150,
            Rail::V1_8 => 1800,
            Rail::V3_3 => 3300,
        }
    }

    /// Settable voltage window in mV
    pub const fn allowed_mv(self) -> RangeInclusive<u16> {
        self.min_mv()..=self.stock_mv()
    }

    /// Low byte of the rail's persisted-voltage register pair
    pub const fn vpers_register(self) -> u8 {
        match self {
            Rail::V1_0 => reg::VPERS_1V0_L,
            Rail::V1_15 => reg::VPERS_1V15_L,
            Rail::V1_8 => reg::VPERS_1V8_L,
            Rail::V3_3 => reg::VPERS_3V3_L,
        }
    }

    /// Address of the rail's INA700 (HW2 only)
    pub const fn monitor_address(self) -> u8 {
        0x44 + self as u8
    }

    fn check_voltage(self, mv: u16) -> Result<(), DriverError> {
        if self.allowed_mv().contains(&mv) {
            Ok(())
        } else {
            Err(DriverError::InvalidVoltage)
        }
    }
}

impl TryFrom<u8> for Rail {
    type Error = DriverError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rail::ALL
            .get(value as usize)
            .copied()
            .ok_or(DriverError::InvalidRail)
    }
}

/// Regulator chip feeding a rail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RailRegulator {
    Buck(Tps6286x),
    BuckBoost(Tps6381x),
}

/// Thundervolt board driver
///
/// Owns the bus. The hardware revision is read from the board controller
/// on first use and kept; boards that know their own revision supply it
/// up front with [`Thundervolt::with_revision`].
pub struct Thundervolt<B> {
    bus: B,
    hw_rev: Option<HardwareRevision>,
}

impl<B: I2cBus> Thundervolt<B> {
    /// Board on `bus`; the revision is read on first use
    pub fn new(bus: B) -> Self {
        Self { bus, hw_rev: None }
    }

    /// Board on `bus` with a known revision
    pub fn with_revision(bus: B, hw_rev: HardwareRevision) -> Self {
        Self {
            bus,
            hw_rev: Some(hw_rev),
        }
    }

    /// Underlying bus
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Release the bus
    pub fn release(self) -> B {
        self.bus
    }

    /// Hardware revision, read once from the board controller
    pub fn hardware_revision(&mut self) -> Result<HardwareRevision, DriverError> {
        if let Some(rev) = self.hw_rev {
            return Ok(rev);
        }
        let raw = self.bus.read_byte(ADDRESS, reg::HWREV)?;
        let rev = HardwareRevision::try_from(raw)?;
        debug!("thundervolt: hardware revision {}", rev);
        self.hw_rev = Some(rev);
        Ok(rev)
    }

    /// Only HW2 carries power monitors
    pub fn has_power_monitoring(&mut self) -> bool {
        matches!(self.hardware_revision(), Ok(HardwareRevision::Hw2))
    }

    /// Regulator chip for `rail` on this revision
    pub fn regulator(&mut self, rail: Rail) -> Result<RailRegulator, DriverError> {
        let regulator = match rail {
            Rail::V1_0 | Rail::V1_15 => {
                let address = match (rail, self.hardware_revision()?) {
                    (Rail::V1_0, HardwareRevision::Hw2) => addr::REG_1V0_HW2,
                    (Rail::V1_0, _) => addr::REG_1V0_HW1,
                    (_, HardwareRevision::Hw2) => addr::REG_1V15_HW2,
                    (_, _) => addr::REG_1V15_HW1,
                };
                RailRegulator::Buck(Tps6286x::new(address, ChipType::X1A))
            }
            Rail::V1_8 => RailRegulator::Buck(Tps6286x::new(addr::REG_1V8, ChipType::X2A)),
            Rail::V3_3 => RailRegulator::BuckBoost(Tps6381x::new(tps6381x::ADDRESS)),
        };
        Ok(regulator)
    }

    /// Bus address of the regulator for `rail`
    pub fn regulator_address(&mut self, rail: Rail) -> Result<u8, DriverError> {
        Ok(match self.regulator(rail)? {
            RailRegulator::Buck(chip) => chip.address(),
            RailRegulator::BuckBoost(chip) => chip.address(),
        })
    }

    /// Check that every regulator and the temperature sensor answer
    pub fn scan(&mut self) -> bool {
        for rail in Rail::ALL {
            let present = match self.regulator(rail) {
                Ok(RailRegulator::Buck(chip)) => chip.is_present(&mut self.bus),
                Ok(RailRegulator::BuckBoost(chip)) => chip.is_present(&mut self.bus),
                Err(_) => false,
            };
            if !present {
                warn!("thundervolt: regulator for {} missing", rail);
                return false;
            }
        }
        self.sensor().is_present(&mut self.bus)
    }

    /// Output voltage of `rail` in mV
    pub fn voltage(&mut self, rail: Rail) -> Result<u16, DriverError> {
        match self.regulator(rail)? {
            RailRegulator::Buck(chip) => chip.vout1(&mut self.bus),
            RailRegulator::BuckBoost(chip) => chip.vout1(&mut self.bus),
        }
    }

    /// Set the output voltage of `rail`, between its minimum and stock values
    pub fn set_voltage(&mut self, rail: Rail, mv: u16) -> Result<(), DriverError> {
        rail.check_voltage(mv)?;
        match self.regulator(rail)? {
            RailRegulator::Buck(chip) => chip.set_vout1(&mut self.bus, mv),
            RailRegulator::BuckBoost(chip) => chip.set_vout1(&mut self.bus, mv),
        }
    }

    /// Current drawn from `rail` in mA (HW2 only)
    pub fn current(&mut self, rail: Rail) -> Result<u32, DriverError> {
        self.monitor(rail)?.current_ma(&mut self.bus)
    }

    /// Power drawn from `rail` in µW (HW2 only)
    pub fn power(&mut self, rail: Rail) -> Result<u32, DriverError> {
        self.monitor(rail)?.power_uw(&mut self.bus)
    }

    /// Board temperature in °C
    pub fn temperature(&mut self) -> Result<f32, DriverError> {
        self.sensor().temperature(&mut self.bus)
    }

    /// Active over-temperature limit in °C
    pub fn otsd_limit(&mut self) -> Result<i8, DriverError> {
        Ok(self.sensor().high_limit(&mut self.bus)? as i8)
    }

    /// Program the sensor's alert threshold, releasing 5 °C below it
    pub fn set_otsd_limit(&mut self, celsius: i8) -> Result<(), DriverError> {
        let sensor = self.sensor();
        let limit = f32::from(celsius);
        sensor.set_high_limit(&mut self.bus, limit)?;
        sensor.set_low_limit(&mut self.bus, limit - OTSD_HYSTERESIS)
    }

    /// Probe the board controller
    pub fn is_present(&mut self) -> bool {
        self.bus.detect(ADDRESS)
    }

    /// Check if the board booted with stock voltages
    pub fn safe_mode_enabled(&mut self) -> Result<bool, DriverError> {
        let value = self.bus.read_byte(ADDRESS, reg::STATUS)?;
        Ok(value & status::SAFEMODE != 0)
    }

    /// Voltage the board applies to `rail` at power-on, in mV
    pub fn persisted_voltage(&mut self, rail: Rail) -> Result<u16, DriverError> {
        Ok(self.bus.read_word_le(ADDRESS, rail.vpers_register())?)
    }

    /// Set the power-on voltage of `rail`, between its minimum and stock values
    pub fn set_persisted_voltage(&mut self, rail: Rail, mv: u16) -> Result<(), DriverError> {
        rail.check_voltage(mv)?;
        self.bus.write_word_le(ADDRESS, rail.vpers_register(), mv)?;
        Ok(())
    }

    /// Restore stock voltages and the default limit on the board
    pub fn clear_persisted_values(&mut self) -> Result<(), DriverError> {
        self.update_config(config::CLEAR, true)
    }

    /// Check if over-temperature shutdown is enabled
    pub fn otsd_enabled(&mut self) -> Result<bool, DriverError> {
        self.config_bit(config::OTSD)
    }

    /// Enable or disable over-temperature shutdown
    pub fn set_otsd_enabled(&mut self, enabled: bool) -> Result<(), DriverError> {
        self.update_config(config::OTSD, enabled)
    }

    /// Over-temperature limit the board applies at power-on, in °C
    pub fn persisted_otsd_limit(&mut self) -> Result<i8, DriverError> {
        Ok(self.bus.read_byte(ADDRESS, reg::OTSD_TEMP)? as i8)
    }

    /// Set the over-temperature limit applied at power-on
    pub fn set_persisted_otsd_limit(&mut self, celsius: i8) -> Result<(), DriverError> {
        self.bus.write_byte(ADDRESS, reg::OTSD_TEMP, celsius as u8)?;
        Ok(())
    }

    /// Board firmware revision
    pub fn software_revision(&mut self) -> Result<u8, DriverError> {
        Ok(self.bus.read_byte(ADDRESS, reg::SWREV)?)
    }

    /// Check if the onboard LED is enabled
    pub fn led_enabled(&mut self) -> Result<bool, DriverError> {
        self.config_bit(config::LED)
    }

    /// Turn the onboard LED on or off
    pub fn set_led_enabled(&mut self, enabled: bool) -> Result<(), DriverError> {
        self.update_config(config::LED, enabled)
    }

    fn sensor(&self) -> Tmp1075 {
        Tmp1075::new(addr::TMP)
    }

    fn monitor(&mut self, rail: Rail) -> Result<Ina700, DriverError> {
        if !self.has_power_monitoring() {
            return Err(DriverError::NotSupported);
        }
        Ok(Ina700::new(rail.monitor_address()))
    }

    fn config_bit(&mut self, bit: u8) -> Result<bool, DriverError> {
        let value = self.bus.read_byte(ADDRESS, reg::CONFIG)?;
        Ok(value & bit != 0)
    }

    fn update_config(&mut self, bit: u8, set: bool) -> Result<(), DriverError> {
        let value = if set { bit } else { 0 };
        self.bus.update_byte(ADDRESS, reg::CONFIG, bit, value)?;
        Ok(())
    }
}
