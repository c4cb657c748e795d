//! TMP1075 temperature sensor
//!
//! 12-bit temperature in the upper bits of a big-endian word, 0.0625 °C per
//! LSB. Configuration lives in the 16-bit CFGR register; all field updates
//! are read-modify-write of the whole word, which always writes so a
//! one-shot request is never skipped.

use thundervolt_core::i2c::{I2cBus, RegisterAccess};

use crate::error::DriverError;

/// TMP1075 register addresses
pub mod reg {
    pub const TEMP: u8 = 0x00;
    pub const CFGR: u8 = 0x01;
    pub const LLIM: u8 = 0x02;
    pub const HLIM: u8 = 0x03;
    /// Die ID, TMP1075 only (not TMP1075N)
    pub const DIEID: u8 = 0x0F;
}

/// CFGR register fields
pub mod cfgr {
    /// One-shot conversion
    pub const OS: u16 = 1 << 15;
    /// Conversion rate
    pub const R: u16 = (1 << 14) | (1 << 13);
    /// Fault count
    pub const F: u16 = (1 << 12) | (1 << 11);
    /// Alert polarity
    pub const POL: u16 = 1 << 10;
    /// Alert mode
    pub const TM: u16 = 1 << 9;
    /// Shutdown
    pub const SD: u16 = 1 << 8;
}

/// Degrees per LSB of the 12-bit reading
const RESOLUTION: f32 = 0.0625;

/// Conversion period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConversionRate {
    /// 27.5 ms
    #[default]
    Ms27_5,
    /// 55 ms
    Ms55,
    /// 110 ms
    Ms110,
    /// 220 ms (35 ms on TMP1075N)
    Ms220,
}

impl ConversionRate {
    const fn bits(self) -> u16 {
        match self {
            ConversionRate::Ms27_5 => 0x0000,
            ConversionRate::Ms55 => 0x2000,
            ConversionRate::Ms110 => 0x4000,
            ConversionRate::Ms220 => 0x6000,
        }
    }
}

/// Consecutive faults before the alert asserts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultCount {
    #[default]
    One,
    Two,
    /// Four on TMP1075N
    Three,
    /// Six on TMP1075N
    Four,
}

impl FaultCount {
    const fn bits(self) -> u16 {
        match self {
            FaultCount::One => 0x0000,
            FaultCount::Two => 0x0800,
            FaultCount::Three => 0x1000,
            FaultCount::Four => 0x1800,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlertMode {
    #[default]
    Comparator,
    Interrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerMode {
    #[default]
    Continuous,
    Shutdown,
}

/// Convert a temperature register to °C
pub fn decode_temp(raw: u16) -> f32 {
    ((raw as i16) >> 4) as f32 * RESOLUTION
}

/// Convert °C to a temperature register, truncating toward zero
///
/// Values outside the sensor range saturate.
pub fn encode_temp(celsius: f32) -> u16 {
    let steps = (celsius / RESOLUTION).clamp(-2048.0, 2047.0) as i16;
    (steps as u16) << 4
}

/// TMP1075 at a bus address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tmp1075 {
    address: u8,
}

impl Tmp1075 {
    /// Sensor at `address`
    pub const fn new(address: u8) -> Self {
        Self { address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Probe the bus; TMP1075N has no die ID to check
    pub fn is_present<B: I2cBus>(&self, bus: &mut B) -> bool {
        bus.detect(self.address)
    }

    /// Temperature of the last conversion in °C
    pub fn temperature<B: I2cBus>(&self, bus: &mut B) -> Result<f32, DriverError> {
        self.read_temp(bus, reg::TEMP)
    }

    /// Request a one-shot conversion
    pub fn start_conversion<B: I2cBus>(&self, bus: &mut B) -> Result<(), DriverError> {
        self.update_cfgr(bus, cfgr::OS, cfgr::OS)
    }

    /// Set the continuous conversion period
    pub fn set_conversion_rate<B: I2cBus>(
        &self,
        bus: &mut B,
        rate: ConversionRate,
    ) -> Result<(), DriverError> {
        self.update_cfgr(bus, cfgr::R, rate.bits())
    }

    /// Set how many out-of-limit readings assert the alert
    pub fn set_fault_count<B: I2cBus>(
        &self,
        bus: &mut B,
        count: FaultCount,
    ) -> Result<(), DriverError> {
        self.update_cfgr(bus, cfgr::F, count.bits())
    }

    /// Set the alert pin polarity, `true` for active high
    pub fn set_alert_polarity<B: I2cBus>(
        &self,
        bus: &mut B,
        active_high: bool,
    ) -> Result<(), DriverError> {
        self.update_cfgr(bus, cfgr::POL, if active_high { cfgr::POL } else { 0 })
    }

    /// Select comparator or interrupt alert behaviour
    pub fn set_alert_mode<B: I2cBus>(
        &self,
        bus: &mut B,
        mode: AlertMode,
    ) -> Result<(), DriverError> {
        let bits = match mode {
            AlertMode::Comparator => 0,
            AlertMode::Interrupt => cfgr::TM,
        };
        self.update_cfgr(bus, cfgr::TM, bits)
    }

    /// Run continuously or shut down between one-shot conversions
    pub fn set_power_mode<B: I2cBus>(
        &self,
        bus: &mut B,
        mode: PowerMode,
    ) -> Result<(), DriverError> {
        let bits = match mode {
            PowerMode::Continuous => 0,
            PowerMode::Shutdown => cfgr::SD,
        };
        self.update_cfgr(bus, cfgr::SD, bits)
    }

    /// Alert release threshold in °C
    pub fn low_limit<B: I2cBus>(&self, bus: &mut B) -> Result<f32, DriverError> {
        self.read_temp(bus, reg::LLIM)
    }

    /// Set the alert release threshold in °C
    pub fn set_low_limit<B: I2cBus>(&self, bus: &mut B, celsius: f32) -> Result<(), DriverError> {
        self.write_temp(bus, reg::LLIM, celsius)
    }

    /// Alert threshold in °C
    pub fn high_limit<B: I2cBus>(&self, bus: &mut B) -> Result<f32, DriverError> {
        self.read_temp(bus, reg::HLIM)
    }

    /// Set the alert threshold in °C
    pub fn set_high_limit<B: I2cBus>(&self, bus: &mut B, celsius: f32) -> Result<(), DriverError> {
        self.write_temp(bus, reg::HLIM, celsius)
    }

    fn read_temp<B: I2cBus>(&self, bus: &mut B, reg: u8) -> Result<f32, DriverError> {
        let raw = bus.read_word_be(self.address, reg)?;
        Ok(decode_temp(raw))
    }

    fn write_temp<B: I2cBus>(&self, bus: &mut B, reg: u8, celsius: f32) -> Result<(), DriverError> {
        bus.write_word_be(self.address, reg, encode_temp(celsius))?;
        Ok(())
    }

    fn update_cfgr<B: I2cBus>(
        &self,
        bus: &mut B,
        mask: u16,
        value: u16,
    ) -> Result<(), DriverError> {
        bus.modify_word_be(self.address, reg::CFGR, mask, value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::sim::presets;
    use crate::bus::{Reg16BeDevice, SimBus};
    use proptest::prelude::*;
    use thundervolt_core::i2c::{Controller, Mode};

    const ADDRESS: u8 = 0x49;

    fn with_bus<R>(
        dev: &mut Reg16BeDevice<4>,
        f: impl FnOnce(&mut Controller<SimBus<'_>>) -> R,
    ) -> R {
        let mut sim = SimBus::new();
        sim.attach(ADDRESS, dev).unwrap();
        let mut bus = Controller::new(sim);
        bus.configure(Mode::Standard).unwrap();
        f(&mut bus)
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode_temp(0x3000), 48.0);
        assert_eq!(decode_temp(0x4600), 70.0);
        assert_eq!(decode_temp(0xFFF0), -0.0625);
        assert_eq!(decode_temp(0xE700), -25.0);
    }

    #[test]
    fn test_encode_exact() {
        assert_eq!(encode_temp(25.5), 0x1980);
        assert_eq!(decode_temp(encode_temp(25.5)), 25.5);
        assert_eq!(encode_temp(-25.0), 0xE700);
    }

    #[test]
    fn test_encode_truncates_toward_zero() {
        assert_eq!(decode_temp(encode_temp(25.53)), 25.5);
        assert_eq!(decode_temp(encode_temp(-0.1)), -0.0625);
    }

    #[test]
    fn test_encode_saturates() {
        assert_eq!(encode_temp(500.0), 0x7FF0);
        assert_eq!(encode_temp(-500.0), 0x8000);
    }

    #[test]
    fn test_temperature_and_limits() {
        let mut dev = presets::tmp1075();
        let sensor = Tmp1075::new(ADDRESS);
        with_bus(&mut dev, |bus| {
            assert!(sensor.is_present(bus));
            assert_eq!(sensor.temperature(bus).unwrap(), 48.0);
            assert_eq!(sensor.low_limit(bus).unwrap(), 65.0);
            assert_eq!(sensor.high_limit(bus).unwrap(), 70.0);

            sensor.set_high_limit(bus, 85.0).unwrap();
            sensor.set_low_limit(bus, 80.0).unwrap();
            assert_eq!(sensor.high_limit(bus).unwrap(), 85.0);
        });
        assert_eq!(dev.regs()[reg::HLIM as usize], 0x5500);
        assert_eq!(dev.regs()[reg::LLIM as usize], 0x5000);
    }

    #[test]
    fn test_cfgr_fields() {
        let mut dev = presets::tmp1075();
        let sensor = Tmp1075::new(ADDRESS);
        with_bus(&mut dev, |bus| {
            sensor.set_conversion_rate(bus, ConversionRate::Ms110).unwrap();
            sensor.set_fault_count(bus, FaultCount::Four).unwrap();
            sensor.set_alert_polarity(bus, true).unwrap();
            sensor.set_alert_mode(bus, AlertMode::Interrupt).unwrap();
            sensor.set_power_mode(bus, PowerMode::Shutdown).unwrap();
        });
        // Low byte of the preset is untouched
        assert_eq!(
            dev.regs()[reg::CFGR as usize],
            0x4000 | 0x1800 | cfgr::POL | cfgr::TM | cfgr::SD | 0x00FF
        );
    }

    #[test]
    fn test_one_shot_always_written() {
        let mut dev = presets::tmp1075();
        dev.regs_mut()[reg::CFGR as usize] = cfgr::OS;
        let sensor = Tmp1075::new(ADDRESS);
        let writes = with_bus(&mut dev, |bus| {
            sensor.start_conversion(bus).unwrap();
            bus.transport().write_messages()
        });
        // Pointer write of the read plus the CFGR write
        assert_eq!(writes, 2);
    }

    proptest! {
        #[test]
        fn test_register_roundtrip(steps in -2048i16..=2047) {
            let raw = (steps as u16) << 4;
            prop_assert_eq!(encode_temp(decode_temp(raw)), raw);
        }

        #[test]
        fn test_encode_never_rounds_away(celsius in -127.0f32..127.0) {
            let decoded = decode_temp(encode_temp(celsius));
            prop_assert!(decoded.abs() <= celsius.abs());
            prop_assert!((celsius - decoded).abs() < RESOLUTION);
        }
    }
}
